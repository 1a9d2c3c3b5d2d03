use crate::config::Settings;
use crate::helpers::cache::ReportGenerations;
use crate::handlers::{
    budgets, expenses, invoices, material_requests, materials, project_materials, projects,
    purchase_orders, reports, settings, tasks, users,
};
use common::{
    BudgetReport, BudgetReportRow, BudgetReportTotals, BudgetStatus, InvoiceStatusBreakdown,
    LowStockMaterial, MonthlyCategoryExpense, ProjectSummary, TaskStatusCount,
};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Per-project report cache
    pub cache: Cache<String, CachedData>,
    pub report_generations: ReportGenerations,
    pub settings: Settings,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    BudgetReport(BudgetReport),
    Summary(ProjectSummary),
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Machine-readable error code, e.g. `NOT_FOUND` or `FORBIDDEN`
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
    /// Reports currently held in the cache
    pub cached_reports: u64,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        projects::create_project,
        projects::get_projects,
        projects::get_project,
        projects::update_project,
        projects::delete_project,
        budgets::create_budget_item,
        budgets::get_budget_items,
        budgets::get_project_budget_items,
        budgets::get_budget_item,
        budgets::update_budget_item,
        budgets::delete_budget_item,
        expenses::create_expense,
        expenses::get_expenses,
        expenses::get_project_expenses,
        expenses::get_expense,
        expenses::update_expense,
        expenses::delete_expense,
        invoices::create_invoice,
        invoices::get_invoices,
        invoices::get_project_invoices,
        invoices::get_invoice,
        invoices::update_invoice,
        invoices::delete_invoice,
        tasks::create_task,
        tasks::get_tasks,
        tasks::get_project_tasks,
        tasks::get_task,
        tasks::update_task,
        tasks::delete_task,
        materials::create_material,
        materials::get_materials,
        materials::get_material,
        materials::update_material,
        materials::delete_material,
        project_materials::create_project_material,
        project_materials::get_project_materials,
        project_materials::get_materials_of_project,
        project_materials::get_project_material,
        project_materials::update_project_material,
        project_materials::delete_project_material,
        purchase_orders::create_purchase_order,
        purchase_orders::get_purchase_orders,
        purchase_orders::get_project_purchase_orders,
        purchase_orders::get_purchase_order,
        purchase_orders::update_purchase_order,
        purchase_orders::delete_purchase_order,
        material_requests::create_material_request,
        material_requests::get_material_requests,
        material_requests::get_material_request,
        material_requests::update_material_request,
        material_requests::delete_material_request,
        material_requests::approve_material_request,
        material_requests::reject_material_request,
        material_requests::deliver_material_request,
        users::create_user,
        users::get_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        settings::get_settings,
        settings::get_setting,
        settings::upsert_setting,
        settings::delete_setting,
        reports::get_budget_report,
        reports::get_project_summary,
        reports::get_monthly_expenses,
        reports::get_low_stock_materials,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            projects::CreateProjectRequest,
            projects::UpdateProjectRequest,
            projects::ProjectResponse,
            budgets::CreateBudgetItemRequest,
            budgets::UpdateBudgetItemRequest,
            budgets::BudgetItemResponse,
            expenses::CreateExpenseRequest,
            expenses::UpdateExpenseRequest,
            expenses::ExpenseResponse,
            invoices::CreateInvoiceRequest,
            invoices::UpdateInvoiceRequest,
            invoices::InvoiceResponse,
            tasks::CreateTaskRequest,
            tasks::UpdateTaskRequest,
            tasks::TaskResponse,
            materials::CreateMaterialRequest,
            materials::UpdateMaterialRequest,
            materials::MaterialResponse,
            project_materials::CreateProjectMaterialRequest,
            project_materials::UpdateProjectMaterialRequest,
            project_materials::ProjectMaterialResponse,
            purchase_orders::CreatePurchaseOrderRequest,
            purchase_orders::UpdatePurchaseOrderRequest,
            purchase_orders::PurchaseOrderResponse,
            material_requests::CreateMaterialRequestRequest,
            material_requests::UpdateMaterialRequestRequest,
            material_requests::MaterialRequestResponse,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            users::UserResponse,
            settings::UpsertSettingRequest,
            settings::SettingResponse,
            BudgetReport,
            BudgetReportRow,
            BudgetReportTotals,
            BudgetStatus,
            ProjectSummary,
            InvoiceStatusBreakdown,
            TaskStatusCount,
            MonthlyCategoryExpense,
            LowStockMaterial,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "projects", description = "Construction projects"),
        (name = "budgets", description = "Budget items per project and category"),
        (name = "expenses", description = "Realized spending"),
        (name = "invoices", description = "Supplier invoices and their payment status"),
        (name = "tasks", description = "Project tasks"),
        (name = "materials", description = "Shared material catalog"),
        (name = "project-materials", description = "Material stock held by each project"),
        (name = "purchase-orders", description = "Orders placed with suppliers"),
        (name = "material-requests", description = "Site requests for material and their approval"),
        (name = "users", description = "Dashboard users and roles"),
        (name = "settings", description = "Application settings"),
        (name = "reports", description = "Budget reconciliation and project reports"),
    ),
    info(
        title = "BuildTrack API",
        description = "Construction project management API - budgets, spending, invoices, tasks and material stock per project",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
