//! The per-project dashboard overview.

use chrono::NaiveDate;
use common::{InvoiceStatusBreakdown, ProjectSummary, TaskStatusCount};
use model::entities::{
    budget_item, expense, invoice, material, project, project_material, purchase_order, task,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveEnum, DatabaseConnection, EntityTrait, Iterable, ModelTrait};
use tracing::{debug, instrument};

use crate::error::{ComputeError, Result, convert};
use crate::inventory::low_stock;

/// Everything a summary is computed from.
#[derive(Debug, Default)]
pub struct SummaryInputs {
    pub budget_items: Vec<budget_item::Model>,
    pub expenses: Vec<expense::Model>,
    pub committed_purchase_orders: Vec<purchase_order::Model>,
    pub invoices: Vec<invoice::Model>,
    pub tasks: Vec<task::Model>,
    pub stock: Vec<(project_material::Model, Option<material::Model>)>,
}

#[derive(Debug, Default)]
pub struct ProjectSummaryComputer;

impl ProjectSummaryComputer {
    pub fn new() -> Self {
        Self
    }

    /// Loads all of the project's records and summarizes them as of `today`.
    #[instrument(skip(self, db))]
    pub async fn compute(
        &self,
        db: &DatabaseConnection,
        project_id: i32,
        today: NaiveDate,
    ) -> Result<ProjectSummary> {
        let project = project::Entity::find_by_id(project_id)
            .one(db)
            .await?
            .ok_or(ComputeError::ProjectNotFound(project_id))?;

        let inputs = SummaryInputs {
            budget_items: project.budget_items(db).await?,
            expenses: project.expenses(db).await?,
            committed_purchase_orders: project.committed_purchase_orders(db).await?,
            invoices: project.find_related(invoice::Entity).all(db).await?,
            tasks: project.find_related(task::Entity).all(db).await?,
            stock: project
                .find_related(project_material::Entity)
                .find_also_related(material::Entity)
                .all(db)
                .await?,
        };

        self.summarize(&project, &inputs, today)
    }

    pub fn summarize(
        &self,
        project: &project::Model,
        inputs: &SummaryInputs,
        today: NaiveDate,
    ) -> Result<ProjectSummary> {
        let total_budgeted: Decimal = inputs.budget_items.iter().map(|i| i.total_price).sum();
        let total_expenses: Decimal = inputs.expenses.iter().map(|e| e.amount).sum();
        let mut committed_amount = Decimal::ZERO;
        for po in inputs.committed_purchase_orders.iter().filter(|po| po.is_committed) {
            committed_amount += convert(
                &format!("Purchase order {}", po.order_number),
                po.amount,
                &po.currency,
                po.exchange_rate,
                &project.currency,
            )?;
        }

        let mut invoices = Vec::new();
        for status in invoice::InvoiceStatus::iter() {
            let mut count = 0;
            let mut amount = Decimal::ZERO;
            for inv in inputs
                .invoices
                .iter()
                .filter(|inv| inv.effective_status(today) == status)
            {
                count += 1;
                amount += convert(
                    &format!("Invoice {}", inv.invoice_number),
                    inv.amount,
                    &inv.currency,
                    inv.exchange_rate,
                    &project.currency,
                )?;
            }
            invoices.push(InvoiceStatusBreakdown {
                status: status.to_value(),
                count,
                amount,
            });
        }

        let tasks = task::TaskStatus::iter()
            .map(|status| TaskStatusCount {
                status: status.to_value(),
                count: inputs.tasks.iter().filter(|t| t.status == status).count() as u64,
            })
            .collect();

        let low_stock_materials = low_stock(&inputs.stock).len() as u64;

        debug!(
            "Project {}: budgeted {}, spent {}, committed {}",
            project.id, total_budgeted, total_expenses, committed_amount
        );

        Ok(ProjectSummary {
            project_id: project.id,
            name: project.name.clone(),
            currency: project.currency.clone(),
            estimated_budget: project.estimated_budget,
            total_budgeted,
            total_expenses,
            committed_amount,
            remaining_budget: project.estimated_budget - total_expenses,
            invoices,
            tasks,
            low_stock_materials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, seed_project, setup_db};

    fn invoice_row<'a>(summary: &'a ProjectSummary, status: &str) -> &'a InvoiceStatusBreakdown {
        summary.invoices.iter().find(|i| i.status == status).unwrap()
    }

    fn task_count(summary: &ProjectSummary, status: &str) -> u64 {
        summary.tasks.iter().find(|t| t.status == status).unwrap().count
    }

    #[tokio::test]
    async fn test_summary_from_database() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        let summary = ProjectSummaryComputer::new()
            .compute(&db, project_id, date(2024, 6, 1))
            .await
            .unwrap();

        assert_eq!(summary.name, "Residencial Las Lomas");
        assert_eq!(summary.total_budgeted, Decimal::new(85000, 0));
        assert_eq!(summary.total_expenses, Decimal::new(71200, 0));
        assert_eq!(summary.committed_amount, Decimal::new(5000, 0));
        assert_eq!(summary.remaining_budget, Decimal::new(178800, 0));
        assert_eq!(summary.low_stock_materials, 1);

        // F-2 is pending but past due on June 1st
        assert_eq!(invoice_row(&summary, "PAID").count, 1);
        assert_eq!(invoice_row(&summary, "OVERDUE").count, 1);
        assert_eq!(invoice_row(&summary, "OVERDUE").amount, Decimal::new(2000, 0));
        assert_eq!(invoice_row(&summary, "PENDING").count, 1);
        assert_eq!(invoice_row(&summary, "PENDING").amount, Decimal::new(3000, 0));
        assert_eq!(invoice_row(&summary, "CANCELLED").count, 0);

        assert_eq!(task_count(&summary, "TODO"), 2);
        assert_eq!(task_count(&summary, "IN_PROGRESS"), 1);
        assert_eq!(task_count(&summary, "COMPLETED"), 1);
        assert_eq!(task_count(&summary, "CANCELLED"), 0);
    }

    #[tokio::test]
    async fn test_invoices_not_yet_due_stay_pending() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        let summary = ProjectSummaryComputer::new()
            .compute(&db, project_id, date(2024, 1, 31))
            .await
            .unwrap();

        assert_eq!(invoice_row(&summary, "PENDING").count, 2);
        assert_eq!(invoice_row(&summary, "OVERDUE").count, 0);
    }

    #[tokio::test]
    async fn test_missing_project() {
        let db = setup_db().await;
        let result = ProjectSummaryComputer::new().compute(&db, 7, date(2024, 1, 1)).await;
        assert!(matches!(result, Err(ComputeError::ProjectNotFound(7))));
    }
}
