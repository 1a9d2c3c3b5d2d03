use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Explicit budget category for purchase orders; null keeps the
        // description-based matching
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new("purchase_orders"))
                    .add_column(ColumnDef::new(Alias::new("category")).string().null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new("purchase_orders"))
                    .drop_column(Alias::new("category"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
