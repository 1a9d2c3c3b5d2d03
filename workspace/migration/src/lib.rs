pub use sea_orm_migration::prelude::*;

mod m20240115_000001_create_table;
mod m20240320_000001_add_material_requests;
mod m20240410_000001_add_purchase_order_category;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_table::Migration),
            Box::new(m20240320_000001_add_material_requests::Migration),
            Box::new(m20240410_000001_add_purchase_order_category::Migration),
        ]
    }
}
