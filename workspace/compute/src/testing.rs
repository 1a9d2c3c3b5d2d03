//! Fixtures shared by the compute tests.

use chrono::{NaiveDate, NaiveDateTime};
use migration::{Migrator, MigratorTrait};
use model::entities::{
    budget_item, expense, invoice, material, project, project_material, purchase_order, task,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

pub(crate) fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn budget_item(category: &str, quantity: i64, unit_price: i64) -> budget_item::Model {
    let quantity = Decimal::new(quantity, 0);
    let unit_price = Decimal::new(unit_price, 0);
    budget_item::Model {
        id: 1,
        project_id: 1,
        category: category.to_string(),
        description: format!("{category} budget"),
        quantity,
        unit_price,
        total_price: budget_item::compute_total(quantity, unit_price).expect("total fits"),
        currency: "USD".to_string(),
        created_by_id: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub(crate) fn expense(category: &str, amount: i64) -> expense::Model {
    expense::Model {
        id: 1,
        project_id: 1,
        budget_item_id: None,
        description: format!("{category} expense"),
        amount: Decimal::new(amount, 0),
        currency: "USD".to_string(),
        exchange_rate: Decimal::ONE,
        category: category.to_string(),
        date: date(2024, 2, 1),
        invoice_number: None,
        supplier: None,
        receipt_image: None,
        created_by_id: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub(crate) fn purchase_order(description: &str, amount: i64, committed: bool) -> purchase_order::Model {
    purchase_order::Model {
        id: 1,
        project_id: 1,
        order_number: "OC-1".to_string(),
        description: description.to_string(),
        category: None,
        amount: Decimal::new(amount, 0),
        currency: "USD".to_string(),
        exchange_rate: Decimal::ONE,
        is_committed: committed,
        status: purchase_order::PurchaseOrderStatus::Issued,
        created_by_id: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub(crate) async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

/// Inserts a project with a budget, expenses in two months, purchase
/// orders, invoices, tasks and two stock lines (one of them low).
/// Returns the project id.
pub(crate) async fn seed_project(db: &DatabaseConnection) -> i32 {
    let now = timestamp();

    let project = project::ActiveModel {
        name: Set("Residencial Las Lomas".to_string()),
        code: Set("RLL-01".to_string()),
        description: Set(None),
        location: Set(None),
        status: Set(project::ProjectStatus::InProgress),
        estimated_budget: Set(Decimal::new(250000, 0)),
        actual_budget: Set(Decimal::ZERO),
        currency: Set("USD".to_string()),
        exchange_rate: Set(Decimal::ONE),
        start_date: Set(Some(date(2024, 1, 15))),
        end_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert project");

    budget_item::ActiveModel {
        project_id: Set(project.id),
        category: Set("Materiales".to_string()),
        description: Set("Cemento".to_string()),
        quantity: Set(Decimal::new(100, 0)),
        unit_price: Set(Decimal::new(850, 0)),
        total_price: Set(Decimal::new(85000, 0)),
        currency: Set("USD".to_string()),
        created_by_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert budget item");

    let expenses = [
        ("Materiales", 40000, date(2024, 2, 3)),
        ("Materiales", 30000, date(2024, 3, 10)),
        ("Transporte", 1200, date(2024, 2, 20)),
    ];
    for (category, amount, day) in expenses {
        expense::ActiveModel {
            project_id: Set(project.id),
            budget_item_id: Set(None),
            description: Set(format!("{category} {day}")),
            amount: Set(Decimal::new(amount, 0)),
            currency: Set("USD".to_string()),
            exchange_rate: Set(Decimal::ONE),
            category: Set(category.to_string()),
            date: Set(day),
            invoice_number: Set(None),
            supplier: Set(None),
            receipt_image: Set(None),
            created_by_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert expense");
    }

    for (number, committed) in [("OC-1", true), ("OC-2", false)] {
        purchase_order::ActiveModel {
            project_id: Set(project.id),
            order_number: Set(number.to_string()),
            description: Set("Materiales de acabado".to_string()),
            category: Set(None),
            amount: Set(Decimal::new(5000, 0)),
            currency: Set("USD".to_string()),
            exchange_rate: Set(Decimal::ONE),
            is_committed: Set(committed),
            status: Set(purchase_order::PurchaseOrderStatus::Issued),
            created_by_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert purchase order");
    }

    let invoices = [
        ("F-1", invoice::InvoiceStatus::Paid, 1000, Some(date(2024, 2, 1))),
        ("F-2", invoice::InvoiceStatus::Pending, 2000, Some(date(2024, 2, 1))),
        ("F-3", invoice::InvoiceStatus::Pending, 3000, Some(date(2024, 12, 31))),
    ];
    for (number, status, amount, due_date) in invoices {
        invoice::ActiveModel {
            project_id: Set(project.id),
            invoice_number: Set(number.to_string()),
            supplier: Set("Cementos del Norte".to_string()),
            amount: Set(Decimal::new(amount, 0)),
            currency: Set("USD".to_string()),
            exchange_rate: Set(Decimal::ONE),
            issue_date: Set(date(2024, 1, 20)),
            due_date: Set(due_date),
            status: Set(status),
            category: Set("Materiales".to_string()),
            description: Set(None),
            file_url: Set(None),
            created_by_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert invoice");
    }

    let tasks = [
        ("Excavación", task::TaskStatus::Completed),
        ("Cimentación", task::TaskStatus::InProgress),
        ("Paredes", task::TaskStatus::Todo),
        ("Techo", task::TaskStatus::Todo),
    ];
    for (title, status) in tasks {
        task::ActiveModel {
            project_id: Set(project.id),
            title: Set(title.to_string()),
            description: Set(None),
            status: Set(status),
            priority: Set(task::TaskPriority::Medium),
            due_date: Set(None),
            assigned_to: Set(None),
            created_by_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert task");
    }

    let stock = [
        ("Cemento gris", "MAT-001", "saco", 10, 50),
        ("Varilla 3/8", "MAT-002", "unidad", 400, 100),
    ];
    for (name, code, unit, quantity, minimum_stock) in stock {
        let material = material::ActiveModel {
            name: Set(name.to_string()),
            code: Set(code.to_string()),
            description: Set(None),
            unit: Set(unit.to_string()),
            base_price: Set(Decimal::new(85, 0)),
            currency: Set("USD".to_string()),
            category: Set("Materiales".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert material");

        project_material::ActiveModel {
            project_id: Set(project.id),
            material_id: Set(material.id),
            quantity: Set(Decimal::new(quantity, 0)),
            minimum_stock: Set(Decimal::new(minimum_stock, 0)),
            unit_price: Set(Decimal::new(85, 0)),
            currency: Set("USD".to_string()),
            notes: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert project material");
    }

    project.id
}
