use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// An entry of the material catalog, shared by all projects.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    /// Unit of measure, e.g. "saco", "m3", "varilla".
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub base_price: Decimal,
    pub currency: String,
    pub category: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project_material::Entity")]
    ProjectMaterial,
    #[sea_orm(has_many = "super::material_request::Entity")]
    MaterialRequest,
}

impl Related<super::project_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectMaterial.def()
    }
}

impl Related<super::material_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
