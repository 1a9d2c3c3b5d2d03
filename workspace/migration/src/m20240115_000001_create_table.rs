use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::FullName))
                    .col(string_null(Users::Email))
                    .col(string_len(Users::Role, 20))
                    .col(date_time(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create projects table
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(pk_auto(Projects::Id))
                    .col(string(Projects::Name))
                    .col(string(Projects::Code).unique_key())
                    .col(text_null(Projects::Description))
                    .col(string_null(Projects::Location))
                    .col(string_len(Projects::Status, 20))
                    .col(decimal(Projects::EstimatedBudget).decimal_len(16, 4))
                    .col(decimal(Projects::ActualBudget).decimal_len(16, 4))
                    .col(string_len(Projects::Currency, 3))
                    .col(decimal(Projects::ExchangeRate).decimal_len(16, 6))
                    .col(date_null(Projects::StartDate))
                    .col(date_null(Projects::EndDate))
                    .col(date_time(Projects::CreatedAt))
                    .col(date_time(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Create budget_items table
        manager
            .create_table(
                Table::create()
                    .table(BudgetItems::Table)
                    .if_not_exists()
                    .col(pk_auto(BudgetItems::Id))
                    .col(integer(BudgetItems::ProjectId))
                    .col(string(BudgetItems::Category))
                    .col(string(BudgetItems::Description))
                    .col(decimal(BudgetItems::Quantity).decimal_len(16, 4))
                    .col(decimal(BudgetItems::UnitPrice).decimal_len(16, 4))
                    .col(decimal(BudgetItems::TotalPrice).decimal_len(16, 4))
                    .col(string_len(BudgetItems::Currency, 3))
                    .col(integer_null(BudgetItems::CreatedById))
                    .col(date_time(BudgetItems::CreatedAt))
                    .col(date_time(BudgetItems::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_items_project")
                            .from(BudgetItems::Table, BudgetItems::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_items_created_by")
                            .from(BudgetItems::Table, BudgetItems::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create expenses table
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(pk_auto(Expenses::Id))
                    .col(integer(Expenses::ProjectId))
                    .col(integer_null(Expenses::BudgetItemId))
                    .col(string(Expenses::Description))
                    .col(decimal(Expenses::Amount).decimal_len(16, 4))
                    .col(string_len(Expenses::Currency, 3))
                    .col(decimal(Expenses::ExchangeRate).decimal_len(16, 6))
                    .col(string(Expenses::Category))
                    .col(date(Expenses::Date))
                    .col(string_null(Expenses::InvoiceNumber))
                    .col(string_null(Expenses::Supplier))
                    .col(text_null(Expenses::ReceiptImage))
                    .col(integer_null(Expenses::CreatedById))
                    .col(date_time(Expenses::CreatedAt))
                    .col(date_time(Expenses::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_project")
                            .from(Expenses::Table, Expenses::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_budget_item")
                            .from(Expenses::Table, Expenses::BudgetItemId)
                            .to(BudgetItems::Table, BudgetItems::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_created_by")
                            .from(Expenses::Table, Expenses::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_project_category")
                    .table(Expenses::Table)
                    .col(Expenses::ProjectId)
                    .col(Expenses::Category)
                    .to_owned(),
            )
            .await?;

        // Create invoices table
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(pk_auto(Invoices::Id))
                    .col(integer(Invoices::ProjectId))
                    .col(string(Invoices::InvoiceNumber))
                    .col(string(Invoices::Supplier))
                    .col(decimal(Invoices::Amount).decimal_len(16, 4))
                    .col(string_len(Invoices::Currency, 3))
                    .col(decimal(Invoices::ExchangeRate).decimal_len(16, 6))
                    .col(date(Invoices::IssueDate))
                    .col(date_null(Invoices::DueDate))
                    .col(string_len(Invoices::Status, 20))
                    .col(string(Invoices::Category))
                    .col(text_null(Invoices::Description))
                    .col(string_null(Invoices::FileUrl))
                    .col(integer_null(Invoices::CreatedById))
                    .col(date_time(Invoices::CreatedAt))
                    .col(date_time(Invoices::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_project")
                            .from(Invoices::Table, Invoices::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_created_by")
                            .from(Invoices::Table, Invoices::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create tasks table
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(pk_auto(Tasks::Id))
                    .col(integer(Tasks::ProjectId))
                    .col(string(Tasks::Title))
                    .col(text_null(Tasks::Description))
                    .col(string_len(Tasks::Status, 20))
                    .col(string_len(Tasks::Priority, 10))
                    .col(date_null(Tasks::DueDate))
                    .col(string_null(Tasks::AssignedTo))
                    .col(integer_null(Tasks::CreatedById))
                    .col(date_time(Tasks::CreatedAt))
                    .col(date_time(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project")
                            .from(Tasks::Table, Tasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_created_by")
                            .from(Tasks::Table, Tasks::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create materials table (catalog)
        manager
            .create_table(
                Table::create()
                    .table(Materials::Table)
                    .if_not_exists()
                    .col(pk_auto(Materials::Id))
                    .col(string(Materials::Name))
                    .col(string(Materials::Code).unique_key())
                    .col(text_null(Materials::Description))
                    .col(string(Materials::Unit))
                    .col(decimal(Materials::BasePrice).decimal_len(16, 4))
                    .col(string_len(Materials::Currency, 3))
                    .col(string(Materials::Category))
                    .to_owned(),
            )
            .await?;

        // Create project_materials table
        manager
            .create_table(
                Table::create()
                    .table(ProjectMaterials::Table)
                    .if_not_exists()
                    .col(pk_auto(ProjectMaterials::Id))
                    .col(integer(ProjectMaterials::ProjectId))
                    .col(integer(ProjectMaterials::MaterialId))
                    .col(decimal(ProjectMaterials::Quantity).decimal_len(16, 4))
                    .col(decimal(ProjectMaterials::MinimumStock).decimal_len(16, 4))
                    .col(decimal(ProjectMaterials::UnitPrice).decimal_len(16, 4))
                    .col(string_len(ProjectMaterials::Currency, 3))
                    .col(text_null(ProjectMaterials::Notes))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_materials_project")
                            .from(ProjectMaterials::Table, ProjectMaterials::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_materials_material")
                            .from(ProjectMaterials::Table, ProjectMaterials::MaterialId)
                            .to(Materials::Table, Materials::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One stock line per material and project
        manager
            .create_index(
                Index::create()
                    .name("idx_project_materials_project_material")
                    .table(ProjectMaterials::Table)
                    .col(ProjectMaterials::ProjectId)
                    .col(ProjectMaterials::MaterialId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create purchase_orders table
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(pk_auto(PurchaseOrders::Id))
                    .col(integer(PurchaseOrders::ProjectId))
                    .col(string(PurchaseOrders::OrderNumber))
                    .col(text(PurchaseOrders::Description))
                    .col(decimal(PurchaseOrders::Amount).decimal_len(16, 4))
                    .col(string_len(PurchaseOrders::Currency, 3))
                    .col(decimal(PurchaseOrders::ExchangeRate).decimal_len(16, 6))
                    .col(boolean(PurchaseOrders::IsCommitted).default(false))
                    .col(string_len(PurchaseOrders::Status, 20))
                    .col(integer_null(PurchaseOrders::CreatedById))
                    .col(date_time(PurchaseOrders::CreatedAt))
                    .col(date_time(PurchaseOrders::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_project")
                            .from(PurchaseOrders::Table, PurchaseOrders::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_created_by")
                            .from(PurchaseOrders::Table, PurchaseOrders::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create settings table
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(string(Settings::Key).primary_key())
                    .col(text(Settings::Value))
                    .col(string_null(Settings::Description))
                    .col(date_time(Settings::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order to respect foreign keys
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectMaterials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Materials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Username,
    FullName,
    Email,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Projects {
    Table,
    Id,
    Name,
    Code,
    Description,
    Location,
    Status,
    EstimatedBudget,
    ActualBudget,
    Currency,
    ExchangeRate,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BudgetItems {
    Table,
    Id,
    ProjectId,
    Category,
    Description,
    Quantity,
    UnitPrice,
    TotalPrice,
    Currency,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    ProjectId,
    BudgetItemId,
    Description,
    Amount,
    Currency,
    ExchangeRate,
    Category,
    Date,
    InvoiceNumber,
    Supplier,
    ReceiptImage,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    ProjectId,
    InvoiceNumber,
    Supplier,
    Amount,
    Currency,
    ExchangeRate,
    IssueDate,
    DueDate,
    Status,
    Category,
    Description,
    FileUrl,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    ProjectId,
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    AssignedTo,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Materials {
    Table,
    Id,
    Name,
    Code,
    Description,
    Unit,
    BasePrice,
    Currency,
    Category,
}

#[derive(DeriveIden)]
enum ProjectMaterials {
    Table,
    Id,
    ProjectId,
    MaterialId,
    Quantity,
    MinimumStock,
    UnitPrice,
    Currency,
    Notes,
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    Id,
    ProjectId,
    OrderNumber,
    Description,
    Amount,
    Currency,
    ExchangeRate,
    IsCommitted,
    Status,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Key,
    Value,
    Description,
    UpdatedAt,
}
