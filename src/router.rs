use crate::handlers::{
    budgets::{
        create_budget_item, delete_budget_item, get_budget_item, get_budget_items,
        get_project_budget_items, update_budget_item,
    },
    expenses::{
        create_expense, delete_expense, get_expense, get_expenses, get_project_expenses,
        update_expense,
    },
    health::health_check,
    invoices::{
        create_invoice, delete_invoice, get_invoice, get_invoices, get_project_invoices,
        update_invoice,
    },
    material_requests::{
        approve_material_request, create_material_request, delete_material_request,
        deliver_material_request, get_material_request, get_material_requests,
        reject_material_request, update_material_request,
    },
    materials::{create_material, delete_material, get_material, get_materials, update_material},
    project_materials::{
        create_project_material, delete_project_material, get_materials_of_project,
        get_project_material, get_project_materials, update_project_material,
    },
    projects::{create_project, delete_project, get_project, get_projects, update_project},
    purchase_orders::{
        create_purchase_order, delete_purchase_order, get_project_purchase_orders,
        get_purchase_order, get_purchase_orders, update_purchase_order,
    },
    reports::{get_budget_report, get_low_stock_materials, get_monthly_expenses, get_project_summary},
    settings::{delete_setting, get_setting, get_settings, upsert_setting},
    tasks::{create_task, delete_task, get_project_tasks, get_task, get_tasks, update_task},
    users::{create_user, delete_user, get_user, get_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = state.settings.request_timeout();

    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Projects
        .route("/api/v1/projects", post(create_project).get(get_projects))
        .route(
            "/api/v1/projects/:project_id",
            get(get_project).put(update_project).delete(delete_project),
        )
        // Budget items
        .route("/api/v1/budgets", post(create_budget_item).get(get_budget_items))
        .route(
            "/api/v1/budgets/:budget_item_id",
            get(get_budget_item)
                .put(update_budget_item)
                .delete(delete_budget_item),
        )
        .route("/api/v1/projects/:project_id/budgets", get(get_project_budget_items))
        // Expenses
        .route("/api/v1/expenses", post(create_expense).get(get_expenses))
        .route(
            "/api/v1/expenses/:expense_id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        .route("/api/v1/projects/:project_id/expenses", get(get_project_expenses))
        // Invoices
        .route("/api/v1/invoices", post(create_invoice).get(get_invoices))
        .route(
            "/api/v1/invoices/:invoice_id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/api/v1/projects/:project_id/invoices", get(get_project_invoices))
        // Tasks
        .route("/api/v1/tasks", post(create_task).get(get_tasks))
        .route(
            "/api/v1/tasks/:task_id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/v1/projects/:project_id/tasks", get(get_project_tasks))
        // Material catalog
        .route("/api/v1/materials", post(create_material).get(get_materials))
        .route(
            "/api/v1/materials/:material_id",
            get(get_material).put(update_material).delete(delete_material),
        )
        // Project stock
        .route(
            "/api/v1/project-materials",
            post(create_project_material).get(get_project_materials),
        )
        .route(
            "/api/v1/project-materials/:project_material_id",
            get(get_project_material)
                .put(update_project_material)
                .delete(delete_project_material),
        )
        .route("/api/v1/projects/:project_id/materials", get(get_materials_of_project))
        // Purchase orders
        .route(
            "/api/v1/purchase-orders",
            post(create_purchase_order).get(get_purchase_orders),
        )
        .route(
            "/api/v1/purchase-orders/:purchase_order_id",
            get(get_purchase_order)
                .put(update_purchase_order)
                .delete(delete_purchase_order),
        )
        .route(
            "/api/v1/projects/:project_id/purchase-orders",
            get(get_project_purchase_orders),
        )
        // Material requests
        .route(
            "/api/v1/material-requests",
            post(create_material_request).get(get_material_requests),
        )
        .route(
            "/api/v1/material-requests/:material_request_id",
            get(get_material_request)
                .put(update_material_request)
                .delete(delete_material_request),
        )
        .route(
            "/api/v1/material-requests/:material_request_id/approve",
            post(approve_material_request),
        )
        .route(
            "/api/v1/material-requests/:material_request_id/reject",
            post(reject_material_request),
        )
        .route(
            "/api/v1/material-requests/:material_request_id/deliver",
            post(deliver_material_request),
        )
        // Users
        .route("/api/v1/users", post(create_user).get(get_users))
        .route(
            "/api/v1/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
        // Settings
        .route("/api/v1/settings", get(get_settings))
        .route(
            "/api/v1/settings/:key",
            get(get_setting).put(upsert_setting).delete(delete_setting),
        )
        // Reports
        .route("/api/v1/projects/:project_id/budget-report", get(get_budget_report))
        .route("/api/v1/projects/:project_id/summary", get(get_project_summary))
        .route(
            "/api/v1/projects/:project_id/expenses/monthly",
            get(get_monthly_expenses),
        )
        .route(
            "/api/v1/projects/:project_id/materials/low-stock",
            get(get_low_stock_materials),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // The global metrics recorder can only be installed once per process
    #[cfg(not(test))]
    let router = {
        use axum_prometheus::PrometheusMetricLayer;

        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router
            .route("/metrics", get(move || async move { metric_handle.render() }))
            .layer(prometheus_layer)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
