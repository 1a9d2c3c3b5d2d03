use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{budget_item, project};

/// Money actually spent on a project.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    /// Optional budget line this expense was charged against.
    pub budget_item_id: Option<i32>,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((16, 6)))")]
    pub exchange_rate: Decimal,
    /// Free text; matched exactly against budget categories in reconciliation.
    pub category: String,
    pub date: NaiveDate,
    pub invoice_number: Option<String>,
    pub supplier: Option<String>,
    /// Base64 image of the receipt, stored as received.
    #[sea_orm(column_type = "Text", nullable)]
    pub receipt_image: Option<String>,
    pub created_by_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "project::Entity",
        from = "Column::ProjectId",
        to = "project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
    #[sea_orm(
        belongs_to = "budget_item::Entity",
        from = "Column::BudgetItemId",
        to = "budget_item::Column::Id",
        on_delete = "SetNull"
    )]
    BudgetItem,
}

impl Related<project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<budget_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
