use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Usage above this percentage of the revised budget is a warning.
const WARNING_THRESHOLD: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

/// Health of a budget category, derived from how much of it is spent or committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Normal,
    Warning,
    Danger,
}

impl BudgetStatus {
    /// Classifies a usage percentage.
    ///
    /// `usage` is `None` when the revised budget is zero; in that case any
    /// spending at all is a danger and no spending is normal.
    pub fn from_usage(usage: Option<Decimal>, real_plus_committed: Decimal) -> Self {
        match usage {
            Some(usage) if usage > Decimal::ONE_HUNDRED => BudgetStatus::Danger,
            Some(usage) if usage > WARNING_THRESHOLD => BudgetStatus::Warning,
            Some(_) => BudgetStatus::Normal,
            None if real_plus_committed > Decimal::ZERO => BudgetStatus::Danger,
            None => BudgetStatus::Normal,
        }
    }
}

/// Percentage of `revised_budget` consumed by `real_plus_committed`.
///
/// Returns `None` for a zero budget instead of dividing by zero.
pub fn usage_percentage(real_plus_committed: Decimal, revised_budget: Decimal) -> Option<Decimal> {
    if revised_budget.is_zero() {
        return None;
    }
    real_plus_committed
        .checked_mul(Decimal::ONE_HUNDRED)?
        .checked_div(revised_budget)
}

/// One category line of the budget reconciliation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BudgetReportRow {
    pub category: String,
    pub initial_budget: Decimal,
    pub budget_modifications: Decimal,
    pub revised_budget: Decimal,
    pub committed_amount: Decimal,
    pub real_expenses: Decimal,
    pub real_plus_committed: Decimal,
    pub budget_balance: Decimal,
    pub available_balance: Decimal,
    /// Rounded to two decimals; null when the revised budget is zero.
    pub usage_percentage: Option<Decimal>,
    pub status: BudgetStatus,
    /// True for rows synthesized from expense categories with no budget item.
    pub is_unbudgeted: bool,
}

/// Column-wise totals of a [`BudgetReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BudgetReportTotals {
    pub initial_budget: Decimal,
    pub budget_modifications: Decimal,
    pub revised_budget: Decimal,
    pub committed_amount: Decimal,
    pub real_expenses: Decimal,
    pub real_plus_committed: Decimal,
    pub budget_balance: Decimal,
    pub available_balance: Decimal,
    pub usage_percentage: Option<Decimal>,
    pub status: BudgetStatus,
}

impl BudgetReportTotals {
    /// Sums every row column by column.
    pub fn from_rows(rows: &[BudgetReportRow]) -> Self {
        let sum = |f: fn(&BudgetReportRow) -> Decimal| rows.iter().map(f).sum::<Decimal>();

        let revised_budget = sum(|r| r.revised_budget);
        let real_plus_committed = sum(|r| r.real_plus_committed);
        let usage = usage_percentage(real_plus_committed, revised_budget);

        Self {
            initial_budget: sum(|r| r.initial_budget),
            budget_modifications: sum(|r| r.budget_modifications),
            revised_budget,
            committed_amount: sum(|r| r.committed_amount),
            real_expenses: sum(|r| r.real_expenses),
            real_plus_committed,
            budget_balance: sum(|r| r.budget_balance),
            available_balance: sum(|r| r.available_balance),
            usage_percentage: usage.map(|u| u.round_dp(2)),
            status: BudgetStatus::from_usage(usage, real_plus_committed),
        }
    }
}

/// Budget reconciliation for a single project, in the project's currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BudgetReport {
    pub project_id: i32,
    pub currency: String,
    pub rows: Vec<BudgetReportRow>,
    pub totals: BudgetReportTotals,
}
