//! Common transport-layer types shared between the compute crate and the API.
//! Report shapes live here so the compute layer can produce them without
//! depending on the web stack, and the API can document them with utoipa.

mod budget;
pub mod currency;
mod report;

pub use budget::{
    BudgetReport, BudgetReportRow, BudgetReportTotals, BudgetStatus, usage_percentage,
};
pub use report::{
    InvoiceStatusBreakdown, LowStockMaterial, MonthlyCategoryExpense, ProjectSummary,
    TaskStatusCount,
};

/// The fixed vocabulary of budget categories.
///
/// Budget items must use one of these; expenses and invoices keep free text so
/// that spending outside the plan still shows up in reconciliation.
pub const BUDGET_CATEGORIES: &[&str] = &[
    "Materiales",
    "Mano de Obra",
    "Equipos",
    "Subcontratos",
    "Transporte",
    "Permisos",
    "Administración",
    "Imprevistos",
    "Otros",
];

/// Returns true when `category` is part of [`BUDGET_CATEGORIES`].
pub fn is_budget_category(category: &str) -> bool {
    BUDGET_CATEGORIES.contains(&category)
}
