use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Invoices of a project grouped by their effective status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvoiceStatusBreakdown {
    /// PENDING, PAID, OVERDUE or CANCELLED
    pub status: String,
    pub count: u64,
    /// Sum of invoice amounts converted to the project currency
    pub amount: Decimal,
}

/// Number of tasks in a given status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskStatusCount {
    pub status: String,
    pub count: u64,
}

/// Dashboard overview of a single project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummary {
    pub project_id: i32,
    pub name: String,
    pub currency: String,
    pub estimated_budget: Decimal,
    /// Sum of the project's budget item totals
    pub total_budgeted: Decimal,
    pub total_expenses: Decimal,
    pub committed_amount: Decimal,
    /// `estimated_budget - total_expenses`
    pub remaining_budget: Decimal,
    pub invoices: Vec<InvoiceStatusBreakdown>,
    pub tasks: Vec<TaskStatusCount>,
    pub low_stock_materials: u64,
}

/// Expenses of one category summed over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyCategoryExpense {
    /// First day of the month
    pub month: NaiveDate,
    pub category: String,
    pub amount: Decimal,
    pub count: u32,
}

/// A project material whose stock is below its configured minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LowStockMaterial {
    pub project_material_id: i32,
    pub material_id: i32,
    pub material_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub minimum_stock: Decimal,
    pub shortfall: Decimal,
}
