//! Budget reconciliation.
//!
//! Groups a project's budget items, expenses and committed purchase orders by
//! category and derives, for every category, how much of the revised budget
//! is already spent or committed.

use std::collections::HashMap;

use common::{BudgetReport, BudgetReportRow, BudgetReportTotals, BudgetStatus, usage_percentage};
use model::entities::{budget_item, expense, project, purchase_order};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::{debug, info, instrument};

use crate::error::{ComputeError, Result, convert};

/// Returns true when a purchase order is charged to `category`.
///
/// An explicit category on the order wins. Orders without one fall back to a
/// case-insensitive search for the category name in their description.
pub fn purchase_order_matches(order: &purchase_order::Model, category: &str) -> bool {
    match order.category.as_deref() {
        Some(explicit) => explicit == category,
        None => order
            .description
            .to_lowercase()
            .contains(&category.to_lowercase()),
    }
}

/// Sums values per key, keeping keys in first-seen order.
#[derive(Debug, Default)]
struct OrderedSums {
    order: Vec<String>,
    sums: HashMap<String, Decimal>,
}

impl OrderedSums {
    fn add(&mut self, key: &str, value: Decimal) {
        match self.sums.get_mut(key) {
            Some(sum) => *sum += value,
            None => {
                self.order.push(key.to_string());
                self.sums.insert(key.to_string(), value);
            }
        }
    }

    fn get(&self, key: &str) -> Decimal {
        self.sums.get(key).copied().unwrap_or(Decimal::ZERO)
    }

    fn contains(&self, key: &str) -> bool {
        self.sums.contains_key(key)
    }

    fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        self.order.iter().map(|key| (key.as_str(), self.get(key)))
    }
}

/// Computes [`BudgetReport`]s.
#[derive(Debug, Default)]
pub struct BudgetReconciler;

impl BudgetReconciler {
    /// Creates a new BudgetReconciler instance.
    pub fn new() -> Self {
        Self
    }

    /// Loads the project's budget items, expenses and committed purchase
    /// orders and reconciles them.
    #[instrument(skip(self, db))]
    pub async fn compute_for_project(
        &self,
        db: &DatabaseConnection,
        project_id: i32,
    ) -> Result<BudgetReport> {
        let project = project::Entity::find_by_id(project_id)
            .one(db)
            .await?
            .ok_or(ComputeError::ProjectNotFound(project_id))?;

        let budget_items = project.budget_items(db).await?;
        let expenses = project.expenses(db).await?;
        let purchase_orders = project.committed_purchase_orders(db).await?;

        debug!(
            "Loaded {} budget items, {} expenses and {} committed purchase orders for project {}",
            budget_items.len(),
            expenses.len(),
            purchase_orders.len(),
            project_id
        );

        self.reconcile(
            project.id,
            &project.currency,
            &budget_items,
            &expenses,
            &purchase_orders,
        )
    }

    /// Builds the reconciliation table from in-memory records.
    ///
    /// Rows follow the order in which categories first appear among the
    /// budget items, followed by one unbudgeted row per expense category
    /// that has no budget item.
    #[instrument(skip_all, fields(project_id, budget_items = budget_items.len(), expenses = expenses.len()))]
    pub fn reconcile(
        &self,
        project_id: i32,
        project_currency: &str,
        budget_items: &[budget_item::Model],
        expenses: &[expense::Model],
        purchase_orders: &[purchase_order::Model],
    ) -> Result<BudgetReport> {
        let mut budgets = OrderedSums::default();
        for item in budget_items {
            budgets.add(&item.category, item.total_price);
        }

        let mut spent = OrderedSums::default();
        for expense in expenses {
            spent.add(&expense.category, expense.amount);
        }

        let committed_orders: Vec<&purchase_order::Model> =
            purchase_orders.iter().filter(|po| po.is_committed).collect();

        let mut rows = Vec::with_capacity(budgets.order.len());

        for (category, initial_budget) in budgets.iter() {
            let budget_modifications = Decimal::ZERO;
            let revised_budget = initial_budget + budget_modifications;

            let mut committed_amount = Decimal::ZERO;
            for po in committed_orders
                .iter()
                .filter(|po| purchase_order_matches(po, category))
            {
                committed_amount += convert(
                    &format!("Purchase order {}", po.order_number),
                    po.amount,
                    &po.currency,
                    po.exchange_rate,
                    project_currency,
                )?;
            }

            let real_expenses = spent.get(category);
            let real_plus_committed = real_expenses + committed_amount;
            let usage = usage_percentage(real_plus_committed, revised_budget);

            rows.push(BudgetReportRow {
                category: category.to_string(),
                initial_budget,
                budget_modifications,
                revised_budget,
                committed_amount,
                real_expenses,
                real_plus_committed,
                budget_balance: revised_budget - real_expenses,
                available_balance: revised_budget - real_plus_committed,
                usage_percentage: usage.map(|u| u.round_dp(2)),
                status: BudgetStatus::from_usage(usage, real_plus_committed),
                is_unbudgeted: false,
            });
        }

        // Spending in categories nobody planned for
        for (category, real_expenses) in spent.iter() {
            if budgets.contains(category) {
                continue;
            }
            rows.push(BudgetReportRow {
                category: category.to_string(),
                initial_budget: Decimal::ZERO,
                budget_modifications: Decimal::ZERO,
                revised_budget: Decimal::ZERO,
                committed_amount: Decimal::ZERO,
                real_expenses,
                real_plus_committed: real_expenses,
                budget_balance: -real_expenses,
                available_balance: -real_expenses,
                usage_percentage: None,
                status: BudgetStatus::Danger,
                is_unbudgeted: true,
            });
        }

        let totals = BudgetReportTotals::from_rows(&rows);
        info!(
            "Reconciled {} categories for project {} ({} unbudgeted)",
            rows.len(),
            project_id,
            rows.iter().filter(|r| r.is_unbudgeted).count()
        );

        Ok(BudgetReport {
            project_id,
            currency: project_currency.to_string(),
            rows,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{budget_item, expense, purchase_order, setup_db, seed_project};

    fn d(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn row<'a>(report: &'a BudgetReport, category: &str) -> &'a BudgetReportRow {
        report
            .rows
            .iter()
            .find(|r| r.category == category)
            .expect("category row missing")
    }

    #[test]
    fn test_warning_example() {
        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[budget_item("Materiales", 100, 850)],
            &[expense("Materiales", 70000)],
            &[],
        )
        .expect("reconciliation failed");

        let materials = row(&report, "Materiales");
        assert_eq!(materials.initial_budget, d(85000));
        assert_eq!(materials.revised_budget, d(85000));
        assert_eq!(materials.real_expenses, d(70000));
        assert_eq!(materials.budget_balance, d(15000));
        assert_eq!(materials.usage_percentage, Some(Decimal::new(8235, 2)));
        assert_eq!(materials.status, BudgetStatus::Warning);
    }

    #[test]
    fn test_danger_example() {
        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[budget_item("Materiales", 100, 850)],
            &[expense("Materiales", 90000)],
            &[],
        )
        .expect("reconciliation failed");

        let materials = row(&report, "Materiales");
        assert_eq!(materials.usage_percentage, Some(Decimal::new(10588, 2)));
        assert_eq!(materials.status, BudgetStatus::Danger);
        assert_eq!(materials.available_balance, d(-5000));
    }

    #[test]
    fn test_untouched_budget_is_normal() {
        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[
                budget_item("Materiales", 100, 850),
                budget_item("Mano de Obra", 10, 1200),
            ],
            &[],
            &[],
        )
        .expect("reconciliation failed");

        assert_eq!(report.rows.len(), 2);
        for r in &report.rows {
            assert_eq!(r.budget_balance, r.revised_budget);
            assert_eq!(r.available_balance, r.revised_budget);
            assert_eq!(r.status, BudgetStatus::Normal);
            assert!(!r.is_unbudgeted);
        }
    }

    #[test]
    fn test_rows_keep_budget_item_order_and_sum_duplicates() {
        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[
                budget_item("Equipos", 1, 500),
                budget_item("Materiales", 10, 100),
                budget_item("Equipos", 2, 250),
            ],
            &[],
            &[],
        )
        .expect("reconciliation failed");

        let categories: Vec<&str> = report.rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Equipos", "Materiales"]);
        assert_eq!(row(&report, "Equipos").initial_budget, d(1000));
    }

    #[test]
    fn test_committed_orders_by_description_and_category() {
        let mut by_description = purchase_order("Compra de MATERIALES de acabado", 2000, true);
        by_description.category = None;
        let mut explicit = purchase_order("Alquiler de grúa", 3000, true);
        explicit.category = Some("Equipos".to_string());
        // Explicit category wins over a description mentioning another one
        let mut misleading = purchase_order("Equipos para materiales", 400, true);
        misleading.category = Some("Materiales".to_string());
        let uncommitted = purchase_order("Materiales varios", 9999, false);

        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[budget_item("Materiales", 100, 850), budget_item("Equipos", 1, 10000)],
            &[expense("Materiales", 1000)],
            &[by_description, explicit, misleading, uncommitted],
        )
        .expect("reconciliation failed");

        let materials = row(&report, "Materiales");
        assert_eq!(materials.committed_amount, d(2400));
        assert_eq!(materials.real_plus_committed, d(3400));
        assert_eq!(materials.budget_balance, d(84000));
        assert_eq!(materials.available_balance, d(81600));

        let equipment = row(&report, "Equipos");
        assert_eq!(equipment.committed_amount, d(3000));
        assert_eq!(equipment.real_expenses, Decimal::ZERO);
    }

    #[test]
    fn test_foreign_currency_orders_are_converted() {
        let mut order = purchase_order("Materiales importados", 100, true);
        order.currency = "USD".to_string();
        order.exchange_rate = Decimal::new(245, 1);

        let report = BudgetReconciler::new().reconcile(
            1,
            "HNL",
            &[budget_item("Materiales", 100, 850)],
            &[],
            &[order],
        )
        .expect("reconciliation failed");

        assert_eq!(row(&report, "Materiales").committed_amount, d(2450));
        assert_eq!(report.currency, "HNL");
    }

    #[test]
    fn test_unbudgeted_expense_categories() {
        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[budget_item("Materiales", 1, 1000)],
            &[
                expense("Catering", 300),
                expense("Materiales", 100),
                expense("Catering", 200),
                expense("Multas", 50),
            ],
            &[],
        )
        .expect("reconciliation failed");

        let categories: Vec<&str> = report.rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Materiales", "Catering", "Multas"]);

        let catering = row(&report, "Catering");
        assert!(catering.is_unbudgeted);
        assert_eq!(catering.status, BudgetStatus::Danger);
        assert_eq!(catering.revised_budget, Decimal::ZERO);
        assert_eq!(catering.real_expenses, d(500));
        assert_eq!(catering.budget_balance, d(-500));
        assert_eq!(catering.available_balance, d(-500));
        assert_eq!(catering.usage_percentage, None);
    }

    #[test]
    fn test_zero_budget_item_does_not_divide_by_zero() {
        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[budget_item("Permisos", 0, 500), budget_item("Otros", 1, 0)],
            &[expense("Permisos", 10)],
            &[],
        )
        .expect("reconciliation failed");

        let permits = row(&report, "Permisos");
        assert_eq!(permits.usage_percentage, None);
        assert_eq!(permits.status, BudgetStatus::Danger);

        let other = row(&report, "Otros");
        assert_eq!(other.usage_percentage, None);
        assert_eq!(other.status, BudgetStatus::Normal);
    }

    #[test]
    fn test_row_identities_and_totals() {
        let mut order = purchase_order("Subcontratos eléctricos", 1500, true);
        order.category = Some("Subcontratos".to_string());

        let report = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[
                budget_item("Materiales", 100, 850),
                budget_item("Subcontratos", 1, 20000),
            ],
            &[
                expense("Materiales", 30000),
                expense("Subcontratos", 19000),
                expense("Transporte", 700),
            ],
            &[order],
        )
        .expect("reconciliation failed");

        for r in &report.rows {
            assert_eq!(r.real_plus_committed, r.real_expenses + r.committed_amount);
            assert_eq!(r.available_balance, r.revised_budget - r.real_plus_committed);
            assert_eq!(r.budget_balance, r.revised_budget - r.real_expenses);
        }

        let totals = &report.totals;
        assert_eq!(totals.revised_budget, d(105000));
        assert_eq!(totals.real_expenses, d(49700));
        assert_eq!(totals.committed_amount, d(1500));
        assert_eq!(totals.real_plus_committed, d(51200));
        assert_eq!(totals.budget_balance, d(55300));
        assert_eq!(totals.available_balance, d(53800));
        assert_eq!(totals.status, BudgetStatus::Normal);
        assert_eq!(row(&report, "Subcontratos").status, BudgetStatus::Danger);
    }

    #[test]
    fn test_conversion_overflow_fails_the_report() {
        let mut order = purchase_order("Materiales importados", 1, true);
        order.amount = Decimal::MAX;
        order.currency = "EUR".to_string();
        order.exchange_rate = Decimal::new(2, 0);

        let result = BudgetReconciler::new().reconcile(
            1,
            "USD",
            &[budget_item("Materiales", 100, 850)],
            &[],
            &[order],
        );
        assert!(matches!(result, Err(ComputeError::AmountOverflow(_))));
    }

    #[tokio::test]
    async fn test_compute_for_project_reads_database() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        let report = BudgetReconciler::new()
            .compute_for_project(&db, project_id)
            .await
            .expect("reconciliation failed");

        assert_eq!(report.project_id, project_id);
        let materials = row(&report, "Materiales");
        assert_eq!(materials.initial_budget, d(85000));
        assert_eq!(materials.real_expenses, d(70000));
        assert_eq!(materials.committed_amount, d(5000));
        assert_eq!(materials.status, BudgetStatus::Warning);
    }

    #[tokio::test]
    async fn test_compute_for_missing_project() {
        let db = setup_db().await;
        let result = BudgetReconciler::new().compute_for_project(&db, 4242).await;
        assert!(matches!(result, Err(ComputeError::ProjectNotFound(4242))));
    }
}
