//! Derived values over a project's records: budget reconciliation, the
//! dashboard summary, monthly expense breakdowns and low-stock detection.

pub mod budget;
pub mod error;
pub mod expenses;
pub mod inventory;
pub mod summary;

pub use budget::BudgetReconciler;
pub use expenses::ExpenseBreakdownComputer;
pub use inventory::LowStockComputer;
pub use summary::ProjectSummaryComputer;

#[cfg(test)]
pub(crate) mod testing;
