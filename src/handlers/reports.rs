//! Per-project reports computed by the `compute` crate.
//!
//! Budget reconciliation and the project summary are cached per project and
//! dropped whenever a record feeding them changes (see
//! [`crate::helpers::cache`]).

use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::{budget_report_key, store_report, summary_key};
use crate::helpers::converters::convert_dataframe_to_monthly_expenses;
use crate::helpers::errors::{ApiError, ApiResult, api_error, bad_request, not_found};
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{Local, NaiveDate};
use common::{BudgetReport, LowStockMaterial, MonthlyCategoryExpense, ProjectSummary};
use compute::error::ComputeError;
use compute::{
    BudgetReconciler, ExpenseBreakdownComputer, LowStockComputer, ProjectSummaryComputer,
};
use serde::Deserialize;
use tracing::{debug, error, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

fn compute_error(err: ComputeError) -> ApiError {
    match err {
        ComputeError::ProjectNotFound(id) => not_found("Project", id),
        ComputeError::Database(e) => {
            error!("Database error while computing report: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Failed to load report data",
            )
        }
        ComputeError::AmountOverflow(msg) => {
            error!("Report amounts overflowed: {}", msg);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMPUTE_ERROR",
                format!("Failed to compute report: {}", msg),
            )
        }
        ComputeError::DataFrame(msg) => {
            error!("Report computation failed: {}", msg);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMPUTE_ERROR",
                format!("Failed to compute report: {}", msg),
            )
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct MonthlyExpensesQuery {
    /// First day included (inclusive)
    pub start_date: Option<NaiveDate>,
    /// Last day included (inclusive)
    pub end_date: Option<NaiveDate>,
}

/// Budget vs. actual reconciliation by category
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/budget-report",
    tag = "reports",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Budget report computed successfully", body = ApiResponse<BudgetReport>),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_budget_report(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<BudgetReport>>> {
    user.require(Action::View)?;

    let cache_key = budget_report_key(project_id);
    if let Some(CachedData::BudgetReport(report)) = state.cache.get(&cache_key).await {
        debug!("Budget report for project {} served from cache", project_id);
        return Ok(Json(ApiResponse::new(report, "Budget report retrieved from cache")));
    }

    let generation = state.report_generations.current(project_id);
    let report = BudgetReconciler::new()
        .compute_for_project(&state.db, project_id)
        .await
        .map_err(compute_error)?;
    store_report(
        &state,
        project_id,
        cache_key,
        generation,
        CachedData::BudgetReport(report.clone()),
    )
    .await;

    info!(
        "Budget report for project {} computed with {} rows",
        project_id,
        report.rows.len()
    );
    Ok(Json(ApiResponse::new(report, "Budget report computed successfully")))
}

/// Headline figures of a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/summary",
    tag = "reports",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project summary computed successfully", body = ApiResponse<ProjectSummary>),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_summary(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<ProjectSummary>>> {
    user.require(Action::View)?;

    let cache_key = summary_key(project_id);
    if let Some(CachedData::Summary(summary)) = state.cache.get(&cache_key).await {
        debug!("Summary for project {} served from cache", project_id);
        return Ok(Json(ApiResponse::new(summary, "Project summary retrieved from cache")));
    }

    let today = Local::now().date_naive();
    let generation = state.report_generations.current(project_id);
    let summary = ProjectSummaryComputer::new()
        .compute(&state.db, project_id, today)
        .await
        .map_err(compute_error)?;
    store_report(
        &state,
        project_id,
        cache_key,
        generation,
        CachedData::Summary(summary.clone()),
    )
    .await;

    Ok(Json(ApiResponse::new(summary, "Project summary computed successfully")))
}

/// Expenses per month and category
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/expenses/monthly",
    tag = "reports",
    params(("project_id" = i32, Path, description = "Project ID"), MonthlyExpensesQuery),
    responses(
        (status = 200, description = "Monthly expenses computed successfully", body = ApiResponse<Vec<MonthlyCategoryExpense>>),
        (status = 400, description = "Start date after end date", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_monthly_expenses(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<MonthlyExpensesQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<MonthlyCategoryExpense>>>> {
    user.require(Action::View)?;
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(bad_request(
                "INVALID_DATE_RANGE",
                format!("start_date {} is after end_date {}", start, end),
            ));
        }
    }
    super::ensure_project_found(&state, project_id).await?;

    let df = ExpenseBreakdownComputer::new()
        .compute(&state.db, project_id, query.start_date, query.end_date)
        .await
        .map_err(compute_error)?;
    let rows = convert_dataframe_to_monthly_expenses(&df)
        .map_err(|msg| compute_error(ComputeError::DataFrame(msg)))?;

    Ok(Json(ApiResponse::new(rows, "Monthly expenses computed successfully")))
}

/// Materials whose stock is under the minimum
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/materials/low-stock",
    tag = "reports",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Low-stock materials retrieved successfully", body = ApiResponse<Vec<LowStockMaterial>>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_low_stock_materials(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<LowStockMaterial>>>> {
    user.require(Action::View)?;
    super::ensure_project_found(&state, project_id).await?;

    let materials = LowStockComputer::new()
        .compute(&state.db, project_id)
        .await
        .map_err(compute_error)?;

    Ok(Json(ApiResponse::new(
        materials,
        "Low-stock materials retrieved successfully",
    )))
}
