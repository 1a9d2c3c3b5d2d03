use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, bad_request, database_error, found, insert_error, not_found, parse_enum,
    validate_currency,
};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use model::entities::project::{self, ProjectStatus};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating a project
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Short unique code, e.g. "RLL-01"
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// PLANNING, IN_PROGRESS, COMPLETED or ON_HOLD (default PLANNING)
    pub status: Option<String>,
    pub estimated_budget: Decimal,
    pub actual_budget: Option<Decimal>,
    /// ISO 4217 code (default USD)
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Request body for updating a project; only provided fields change
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub estimated_budget: Option<Decimal>,
    pub actual_budget: Option<Decimal>,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub estimated_budget: Decimal,
    pub actual_budget: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<project::Model> for ProjectResponse {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            description: model.description,
            location: model.location,
            status: model.status.to_value(),
            estimated_budget: model.estimated_budget,
            actual_budget: model.actual_budget,
            currency: model.currency,
            exchange_rate: model.exchange_rate,
            start_date: model.start_date,
            end_date: model.end_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Query parameters for listing projects
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct ProjectQuery {
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    /// Page size (default: 100)
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches name, code, description or location
    pub search: Option<String>,
    pub status: Option<String>,
}

fn validate_amounts(
    estimated_budget: Option<Decimal>,
    actual_budget: Option<Decimal>,
    exchange_rate: Option<Decimal>,
) -> ApiResult<()> {
    if estimated_budget.is_some_and(|v| v.is_sign_negative()) {
        return Err(bad_request("VALIDATION_ERROR", "estimated_budget must not be negative"));
    }
    if actual_budget.is_some_and(|v| v.is_sign_negative()) {
        return Err(bad_request("VALIDATION_ERROR", "actual_budget must not be negative"));
    }
    if exchange_rate.is_some_and(|v| v <= Decimal::ZERO) {
        return Err(bad_request("VALIDATION_ERROR", "exchange_rate must be positive"));
    }
    Ok(())
}

/// Create a new project
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created successfully", body = ApiResponse<ProjectResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 409, description = "Project code already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_project(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateProjectRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProjectResponse>>)> {
    user.require(Action::Create)?;
    debug!("Creating project with code: {}", request.code);

    validate_amounts(Some(request.estimated_budget), request.actual_budget, request.exchange_rate)?;
    let status = match request.status.as_deref() {
        Some(s) => parse_enum::<ProjectStatus>("status", s)?,
        None => ProjectStatus::Planning,
    };
    let currency = validate_currency(request.currency.as_deref().unwrap_or("USD"))?;
    let now = Utc::now().naive_utc();

    let new_project = project::ActiveModel {
        name: Set(request.name),
        code: Set(request.code.clone()),
        description: Set(request.description),
        location: Set(request.location),
        status: Set(status),
        estimated_budget: Set(request.estimated_budget),
        actual_budget: Set(request.actual_budget.unwrap_or(Decimal::ZERO)),
        currency: Set(currency),
        exchange_rate: Set(request.exchange_rate.unwrap_or(Decimal::ONE)),
        start_date: Set(request.start_date),
        end_date: Set(request.end_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_project.insert(&state.db).await.map_err(|e| {
        insert_error(
            "Failed to create project",
            e,
            "DUPLICATE_PROJECT_CODE",
            format!("Project code '{}' already exists", request.code),
        )
    })?;

    info!("Project created with ID: {}, code: {}", created.id, created.code);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ProjectResponse::from(created), "Project created successfully")),
    ))
}

/// List projects
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "projects",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Projects retrieved successfully", body = ApiResponse<Vec<ProjectResponse>>),
        (status = 401, description = "Unknown or missing user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_projects(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<ProjectQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<ProjectResponse>>>> {
    user.require(Action::View)?;
    trace!("Entering get_projects function");

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = project::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(project::Column::Name.contains(search))
                .add(project::Column::Code.contains(search))
                .add(project::Column::Description.contains(search))
                .add(project::Column::Location.contains(search)),
        );
    }
    if let Some(status) = query.status.as_deref() {
        let status = parse_enum::<ProjectStatus>("status", status)?;
        select = select.filter(project::Column::Status.eq(status));
    }

    let projects = select
        .order_by_asc(project::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve projects", e))?;

    info!("Retrieved {} projects", projects.len());
    Ok(Json(ApiResponse::new(
        projects.into_iter().map(ProjectResponse::from).collect(),
        "Projects retrieved successfully",
    )))
}

/// Get a project by ID
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}",
    tag = "projects",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project retrieved successfully", body = ApiResponse<ProjectResponse>),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<ProjectResponse>>> {
    user.require(Action::View)?;
    let model = found(
        project::Entity::find_by_id(project_id).one(&state.db).await,
        "Project",
        project_id,
    )?;
    Ok(Json(ApiResponse::new(ProjectResponse::from(model), "Project retrieved successfully")))
}

/// Update a project
#[utoipa::path(
    put,
    path = "/api/v1/projects/{project_id}",
    tag = "projects",
    params(("project_id" = i32, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated successfully", body = ApiResponse<ProjectResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_project(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateProjectRequest>>,
) -> ApiResult<Json<ApiResponse<ProjectResponse>>> {
    user.require(Action::Edit)?;
    validate_amounts(request.estimated_budget, request.actual_budget, request.exchange_rate)?;

    let existing = found(
        project::Entity::find_by_id(project_id).one(&state.db).await,
        "Project",
        project_id,
    )?;
    let mut active: project::ActiveModel = existing.into();

    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(code) = request.code.clone() {
        active.code = Set(code);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(location) = request.location {
        active.location = Set(Some(location));
    }
    if let Some(status) = request.status.as_deref() {
        active.status = Set(parse_enum::<ProjectStatus>("status", status)?);
    }
    if let Some(estimated_budget) = request.estimated_budget {
        active.estimated_budget = Set(estimated_budget);
    }
    if let Some(actual_budget) = request.actual_budget {
        active.actual_budget = Set(actual_budget);
    }
    if let Some(currency) = request.currency.as_deref() {
        active.currency = Set(validate_currency(currency)?);
    }
    if let Some(exchange_rate) = request.exchange_rate {
        active.exchange_rate = Set(exchange_rate);
    }
    if let Some(start_date) = request.start_date {
        active.start_date = Set(Some(start_date));
    }
    if let Some(end_date) = request.end_date {
        active.end_date = Set(Some(end_date));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active.update(&state.db).await.map_err(|e| {
        insert_error(
            "Failed to update project",
            e,
            "DUPLICATE_PROJECT_CODE",
            format!("Project code '{}' already exists", request.code.unwrap_or_default()),
        )
    })?;

    // Currency changes alter how committed orders convert
    invalidate_project_reports(&state, project_id).await;

    info!("Project {} updated", project_id);
    Ok(Json(ApiResponse::new(ProjectResponse::from(updated), "Project updated successfully")))
}

/// Delete a project and, through the schema cascades, all of its records
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{project_id}",
    tag = "projects",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_project(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let result = project::Entity::delete_by_id(project_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete project", e))?;

    if result.rows_affected == 0 {
        warn!("Project {} not found for deletion", project_id);
        return Err(not_found("Project", project_id));
    }

    invalidate_project_reports(&state, project_id).await;
    info!("Project {} deleted", project_id);
    Ok(Json(ApiResponse::new(
        format!("Project {} deleted", project_id),
        "Project deleted successfully",
    )))
}
