use sea_orm_migration::{prelude::*, schema::*};

use crate::m20240115_000001_create_table::{Materials, Projects, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MaterialRequests::Table)
                    .if_not_exists()
                    .col(pk_auto(MaterialRequests::Id))
                    .col(integer(MaterialRequests::ProjectId))
                    .col(integer(MaterialRequests::MaterialId))
                    .col(decimal(MaterialRequests::Quantity).decimal_len(16, 4))
                    .col(string_len(MaterialRequests::Status, 20))
                    .col(text_null(MaterialRequests::Notes))
                    .col(integer_null(MaterialRequests::RequestedById))
                    .col(date_time(MaterialRequests::CreatedAt))
                    .col(date_time(MaterialRequests::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_material_requests_project")
                            .from(MaterialRequests::Table, MaterialRequests::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_material_requests_material")
                            .from(MaterialRequests::Table, MaterialRequests::MaterialId)
                            .to(Materials::Table, Materials::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_material_requests_requested_by")
                            .from(MaterialRequests::Table, MaterialRequests::RequestedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MaterialRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MaterialRequests {
    Table,
    Id,
    ProjectId,
    MaterialId,
    Quantity,
    Status,
    Notes,
    RequestedById,
    CreatedAt,
    UpdatedAt,
}
