use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{material, project};

/// Stock of a catalog material held for a project.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "project_materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub material_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub minimum_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub unit_price: Decimal,
    pub currency: String,
    pub notes: Option<String>,
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
        belongs_to = "material::Entity",
        from = "Column::MaterialId",
        to = "material::Column::Id",
        on_delete = "Cascade"
    )]
    Material,
}

impl Related<project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// How much is missing to reach the minimum stock, if anything.
    pub fn shortfall(&self) -> Option<Decimal> {
        (self.quantity < self.minimum_stock).then(|| self.minimum_stock - self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(quantity: i64, minimum_stock: i64) -> Model {
        Model {
            id: 1,
            project_id: 1,
            material_id: 1,
            quantity: Decimal::new(quantity, 0),
            minimum_stock: Decimal::new(minimum_stock, 0),
            unit_price: Decimal::new(10, 0),
            currency: "USD".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_shortfall() {
        assert_eq!(stock(5, 20).shortfall(), Some(Decimal::new(15, 0)));
        assert_eq!(stock(20, 20).shortfall(), None);
        assert_eq!(stock(30, 20).shortfall(), None);
    }
}
