use common::currency::to_currency;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The project the computation was asked for does not exist
    #[error("Project {0} not found")]
    ProjectNotFound(i32),

    /// An amount could not be converted into the project's currency
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Error from Polars DataFrame operations
    #[error("DataFrame error: {0}")]
    DataFrame(String),
}

impl From<polars::error::PolarsError> for ComputeError {
    fn from(error: polars::error::PolarsError) -> Self {
        let err = ComputeError::DataFrame(error.to_string());
        error!(?err, "DataFrame error");
        err
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;

/// Converts the amount of `what` into the project's currency.
pub(crate) fn convert(
    what: &str,
    amount: Decimal,
    currency: &str,
    exchange_rate: Decimal,
    target_currency: &str,
) -> Result<Decimal> {
    to_currency(amount, currency, exchange_rate, target_currency).ok_or_else(|| {
        ComputeError::AmountOverflow(format!(
            "{} of {} {} at rate {} does not fit in {}",
            what, amount, currency, exchange_rate, target_currency
        ))
    })
}
