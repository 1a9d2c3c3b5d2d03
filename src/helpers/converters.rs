use chrono::NaiveDate;
use common::MonthlyCategoryExpense;
use compute::expenses::{AMOUNT_COLUMN, CATEGORY_COLUMN, COUNT_COLUMN, MONTH_COLUMN};
use polars::prelude::{AnyValue, DataFrame};
use rust_decimal::Decimal;
use std::str::FromStr;

fn string_value(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => format!("{}", other),
    }
}

/// Converts the monthly breakdown frame into API rows.
pub fn convert_dataframe_to_monthly_expenses(
    df: &DataFrame,
) -> Result<Vec<MonthlyCategoryExpense>, String> {
    let month_col = df
        .column(MONTH_COLUMN)
        .map_err(|e| format!("Missing month column: {}", e))?;
    let category_col = df
        .column(CATEGORY_COLUMN)
        .map_err(|e| format!("Missing category column: {}", e))?;
    let amount_col = df
        .column(AMOUNT_COLUMN)
        .map_err(|e| format!("Missing amount column: {}", e))?;
    let count_col = df
        .column(COUNT_COLUMN)
        .map_err(|e| format!("Missing count column: {}", e))?;

    let mut rows = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let days = month_col
            .get(i)
            .map_err(|e| format!("Error getting month at row {}: {}", i, e))?
            .try_extract::<i32>()
            .map_err(|e| format!("Error extracting month at row {}: {}", i, e))?;
        let month = NaiveDate::from_num_days_from_ce_opt(days)
            .ok_or_else(|| format!("Invalid month value at row {}: {}", i, days))?;

        let category = string_value(
            category_col
                .get(i)
                .map_err(|e| format!("Error getting category at row {}: {}", i, e))?,
        );

        let amount_str = string_value(
            amount_col
                .get(i)
                .map_err(|e| format!("Error getting amount at row {}: {}", i, e))?,
        );
        let amount = Decimal::from_str(&amount_str)
            .map_err(|e| format!("Error parsing amount '{}' at row {}: {}", amount_str, i, e))?;

        let count = count_col
            .get(i)
            .map_err(|e| format!("Error getting count at row {}: {}", i, e))?
            .try_extract::<u32>()
            .map_err(|e| format!("Error extracting count at row {}: {}", i, e))?;

        rows.push(MonthlyCategoryExpense {
            month,
            category,
            amount,
            count,
        });
    }

    Ok(rows)
}
