use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, QueryOrder};
use tracing::instrument;

use super::{budget_item, expense, invoice, project_material, purchase_order, task};

/// Lifecycle of a construction project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "PLANNING")]
    Planning,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "ON_HOLD")]
    OnHold,
}

/// A construction project. Every other collection hangs off a project.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Short internal code, e.g. "OBR-2024-01".
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: ProjectStatus,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub estimated_budget: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub actual_budget: Decimal,
    /// ISO 4217 code all reports of this project are expressed in.
    pub currency: String,
    /// Manually configured rate; reports never look up market rates.
    #[sea_orm(column_type = "Decimal(Some((16, 6)))")]
    pub exchange_rate: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_item::Entity")]
    BudgetItem,
    #[sea_orm(has_many = "super::expense::Entity")]
    Expense,
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoice,
    #[sea_orm(has_many = "super::task::Entity")]
    Task,
    #[sea_orm(has_many = "super::project_material::Entity")]
    ProjectMaterial,
    #[sea_orm(has_many = "super::purchase_order::Entity")]
    PurchaseOrder,
    #[sea_orm(has_many = "super::material_request::Entity")]
    MaterialRequest,
}

impl Related<budget_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetItem.def()
    }
}

impl Related<expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl Related<task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl Related<project_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectMaterial.def()
    }
}

impl Related<purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::material_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Budget items of this project, in insertion order.
    #[instrument(skip(self, db), fields(project_id = self.id))]
    pub async fn budget_items(&self, db: &DatabaseConnection) -> Result<Vec<budget_item::Model>, DbErr> {
        self.find_related(budget_item::Entity)
            .order_by_asc(budget_item::Column::Id)
            .all(db)
            .await
    }

    /// Expenses of this project, in insertion order.
    #[instrument(skip(self, db), fields(project_id = self.id))]
    pub async fn expenses(&self, db: &DatabaseConnection) -> Result<Vec<expense::Model>, DbErr> {
        self.find_related(expense::Entity)
            .order_by_asc(expense::Column::Id)
            .all(db)
            .await
    }

    /// Purchase orders of this project flagged as committed.
    #[instrument(skip(self, db), fields(project_id = self.id))]
    pub async fn committed_purchase_orders(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Vec<purchase_order::Model>, DbErr> {
        self.find_related(purchase_order::Entity)
            .filter(purchase_order::Column::IsCommitted.eq(true))
            .order_by_asc(purchase_order::Column::Id)
            .all(db)
            .await
    }
}
