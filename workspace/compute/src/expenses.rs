//! Monthly expense breakdown per category.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use model::entities::expense;
use polars::prelude::*;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument, trace};

use crate::error::Result;

/// Column holding the first day of the month, as days from the common era.
pub const MONTH_COLUMN: &str = "month";
pub const CATEGORY_COLUMN: &str = "category";
/// Decimal sums are kept as strings so no precision is lost in the frame.
pub const AMOUNT_COLUMN: &str = "amount";
pub const COUNT_COLUMN: &str = "count";

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Groups a project's expenses by calendar month and category.
#[derive(Debug, Default)]
pub struct ExpenseBreakdownComputer;

impl ExpenseBreakdownComputer {
    pub fn new() -> Self {
        Self
    }

    /// Loads the project's expenses dated within `[start_date, end_date]`
    /// (either bound may be open) and aggregates them.
    #[instrument(skip(self, db))]
    pub async fn compute(
        &self,
        db: &DatabaseConnection,
        project_id: i32,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<DataFrame> {
        let mut query = expense::Entity::find()
            .filter(expense::Column::ProjectId.eq(project_id))
            .order_by_asc(expense::Column::Date);
        if let Some(start) = start_date {
            query = query.filter(expense::Column::Date.gte(start));
        }
        if let Some(end) = end_date {
            query = query.filter(expense::Column::Date.lte(end));
        }

        let expenses = query.all(db).await?;
        debug!("Aggregating {} expenses for project {}", expenses.len(), project_id);

        self.aggregate(&expenses)
    }

    /// Builds a frame with one row per (month, category), sorted by month
    /// and then category.
    pub fn aggregate(&self, expenses: &[expense::Model]) -> Result<DataFrame> {
        let mut groups: BTreeMap<(NaiveDate, &str), (Decimal, u32)> = BTreeMap::new();
        for expense in expenses {
            let key = (month_start(expense.date), expense.category.as_str());
            let entry = groups.entry(key).or_insert((Decimal::ZERO, 0));
            entry.0 += expense.amount;
            entry.1 += 1;
        }

        let mut months = Vec::with_capacity(groups.len());
        let mut categories = Vec::with_capacity(groups.len());
        let mut amounts = Vec::with_capacity(groups.len());
        let mut counts = Vec::with_capacity(groups.len());

        for ((month, category), (amount, count)) in groups {
            trace!("{} {}: {} over {} expenses", month, category, amount, count);
            months.push(month.num_days_from_ce());
            categories.push(category.to_string());
            amounts.push(amount.to_string());
            counts.push(count);
        }

        let df = DataFrame::new(vec![
            Series::new(MONTH_COLUMN.into(), months).into(),
            Series::new(CATEGORY_COLUMN.into(), categories).into(),
            Series::new(AMOUNT_COLUMN.into(), amounts).into(),
            Series::new(COUNT_COLUMN.into(), counts).into(),
        ])?;

        Ok(df)
    }
}
