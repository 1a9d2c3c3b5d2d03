//! Per-project material stock.

use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, bad_request, database_error, ensure_material, ensure_project, found, insert_error,
    not_found, validate_currency,
};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::{material, project_material};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateProjectMaterialRequest {
    pub project_id: i32,
    pub material_id: i32,
    pub quantity: Decimal,
    pub minimum_stock: Option<Decimal>,
    /// Defaults to the material's base price
    pub unit_price: Option<Decimal>,
    /// Defaults to the material's currency
    pub currency: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateProjectMaterialRequest {
    pub quantity: Option<Decimal>,
    pub minimum_stock: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectMaterialResponse {
    pub id: i32,
    pub project_id: i32,
    pub material_id: i32,
    /// Catalog name, when the material was loaded alongside
    pub material_name: Option<String>,
    pub unit: Option<String>,
    pub quantity: Decimal,
    pub minimum_stock: Decimal,
    pub unit_price: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub is_low_stock: bool,
}

impl ProjectMaterialResponse {
    fn with_material(model: project_material::Model, material: Option<material::Model>) -> Self {
        let is_low_stock = model.shortfall().is_some();
        Self {
            id: model.id,
            project_id: model.project_id,
            material_id: model.material_id,
            material_name: material.as_ref().map(|m| m.name.clone()),
            unit: material.map(|m| m.unit),
            quantity: model.quantity,
            minimum_stock: model.minimum_stock,
            unit_price: model.unit_price,
            currency: model.currency,
            notes: model.notes,
            is_low_stock,
        }
    }
}

impl From<project_material::Model> for ProjectMaterialResponse {
    fn from(model: project_material::Model) -> Self {
        Self::with_material(model, None)
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate, Default)]
pub struct ProjectMaterialQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches the notes
    pub search: Option<String>,
    pub project_id: Option<i32>,
    pub material_id: Option<i32>,
}

fn check_stock(
    quantity: Option<Decimal>,
    minimum_stock: Option<Decimal>,
    unit_price: Option<Decimal>,
) -> ApiResult<()> {
    for (field, value) in [
        ("quantity", quantity),
        ("minimum_stock", minimum_stock),
        ("unit_price", unit_price),
    ] {
        if value.is_some_and(|v| v.is_sign_negative()) {
            return Err(bad_request(
                "VALIDATION_ERROR",
                format!("{} must not be negative", field),
            ));
        }
    }
    Ok(())
}

pub(crate) async fn list_project_materials(
    state: &AppState,
    query: ProjectMaterialQuery,
) -> ApiResult<Vec<ProjectMaterialResponse>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = project_material::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(project_material::Column::Notes.contains(search));
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(project_material::Column::ProjectId.eq(project_id));
    }
    if let Some(material_id) = query.material_id {
        select = select.filter(project_material::Column::MaterialId.eq(material_id));
    }

    let rows = select
        .order_by_asc(project_material::Column::Id)
        .find_also_related(material::Entity)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve project materials", e))?;

    debug!("Retrieved {} stock lines", rows.len());
    Ok(rows
        .into_iter()
        .map(|(line, material)| ProjectMaterialResponse::with_material(line, material))
        .collect())
}

/// Put a catalog material into a project's stock
#[utoipa::path(
    post,
    path = "/api/v1/project-materials",
    tag = "project-materials",
    request_body = CreateProjectMaterialRequest,
    responses(
        (status = 201, description = "Stock line created successfully", body = ApiResponse<ProjectMaterialResponse>),
        (status = 400, description = "Invalid project, material or amounts", body = ErrorResponse),
        (status = 409, description = "The project already stocks this material", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_project_material(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateProjectMaterialRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProjectMaterialResponse>>)> {
    user.require(Action::Create)?;
    check_stock(Some(request.quantity), request.minimum_stock, request.unit_price)?;
    let project = ensure_project(&state.db, request.project_id).await?;
    let material = ensure_material(&state.db, request.material_id).await?;
    let currency = match request.currency.as_deref() {
        Some(code) => validate_currency(code)?,
        None => material.currency.clone(),
    };

    let new_line = project_material::ActiveModel {
        project_id: Set(project.id),
        material_id: Set(material.id),
        quantity: Set(request.quantity),
        minimum_stock: Set(request.minimum_stock.unwrap_or(Decimal::ZERO)),
        unit_price: Set(request.unit_price.unwrap_or(material.base_price)),
        currency: Set(currency),
        notes: Set(request.notes),
        ..Default::default()
    };

    let created = new_line.insert(&state.db).await.map_err(|e| {
        insert_error(
            "Failed to create project material",
            e,
            "DUPLICATE_PROJECT_MATERIAL",
            format!(
                "Project {} already stocks material {}",
                project.id, material.id
            ),
        )
    })?;
    invalidate_project_reports(&state, created.project_id).await;

    info!(
        "Material {} stocked in project {} (line {})",
        created.material_id, created.project_id, created.id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            ProjectMaterialResponse::with_material(created, Some(material)),
            "Project material created successfully",
        )),
    ))
}

/// List stock lines
#[utoipa::path(
    get,
    path = "/api/v1/project-materials",
    tag = "project-materials",
    params(ProjectMaterialQuery),
    responses(
        (status = 200, description = "Project materials retrieved successfully", body = ApiResponse<Vec<ProjectMaterialResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_materials(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<ProjectMaterialQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<ProjectMaterialResponse>>>> {
    user.require(Action::View)?;
    let lines = list_project_materials(&state, query).await?;
    Ok(Json(ApiResponse::new(lines, "Project materials retrieved successfully")))
}

/// List the stock of one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/materials",
    tag = "project-materials",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project materials retrieved successfully", body = ApiResponse<Vec<ProjectMaterialResponse>>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_materials_of_project(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<ProjectMaterialResponse>>>> {
    user.require(Action::View)?;
    super::ensure_project_found(&state, project_id).await?;
    let query = ProjectMaterialQuery {
        project_id: Some(project_id),
        limit: Some(1000),
        ..Default::default()
    };
    let lines = list_project_materials(&state, query).await?;
    Ok(Json(ApiResponse::new(lines, "Project materials retrieved successfully")))
}

/// Get a stock line by ID
#[utoipa::path(
    get,
    path = "/api/v1/project-materials/{project_material_id}",
    tag = "project-materials",
    params(("project_material_id" = i32, Path, description = "Project material ID")),
    responses(
        (status = 200, description = "Project material retrieved successfully", body = ApiResponse<ProjectMaterialResponse>),
        (status = 404, description = "Project material not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_material(
    user: CurrentUser,
    Path(project_material_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<ProjectMaterialResponse>>> {
    user.require(Action::View)?;
    let (line, material) = found(
        project_material::Entity::find_by_id(project_material_id)
            .find_also_related(material::Entity)
            .one(&state.db)
            .await,
        "Project material",
        project_material_id,
    )?;
    Ok(Json(ApiResponse::new(
        ProjectMaterialResponse::with_material(line, material),
        "Project material retrieved successfully",
    )))
}

/// Update a stock line
#[utoipa::path(
    put,
    path = "/api/v1/project-materials/{project_material_id}",
    tag = "project-materials",
    params(("project_material_id" = i32, Path, description = "Project material ID")),
    request_body = UpdateProjectMaterialRequest,
    responses(
        (status = 200, description = "Project material updated successfully", body = ApiResponse<ProjectMaterialResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Project material not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_project_material(
    user: CurrentUser,
    Path(project_material_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateProjectMaterialRequest>>,
) -> ApiResult<Json<ApiResponse<ProjectMaterialResponse>>> {
    user.require(Action::Edit)?;
    check_stock(request.quantity, request.minimum_stock, request.unit_price)?;

    let existing = found(
        project_material::Entity::find_by_id(project_material_id)
            .one(&state.db)
            .await,
        "Project material",
        project_material_id,
    )?;
    let mut active: project_material::ActiveModel = existing.into();

    if let Some(quantity) = request.quantity {
        active.quantity = Set(quantity);
    }
    if let Some(minimum_stock) = request.minimum_stock {
        active.minimum_stock = Set(minimum_stock);
    }
    if let Some(unit_price) = request.unit_price {
        active.unit_price = Set(unit_price);
    }
    if let Some(currency) = request.currency.as_deref() {
        active.currency = Set(validate_currency(currency)?);
    }
    if let Some(notes) = request.notes {
        active.notes = Set(Some(notes));
    }

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update project material", e))?;
    invalidate_project_reports(&state, updated.project_id).await;

    info!("Project material {} updated", project_material_id);
    Ok(Json(ApiResponse::new(
        ProjectMaterialResponse::from(updated),
        "Project material updated successfully",
    )))
}

/// Remove a stock line
#[utoipa::path(
    delete,
    path = "/api/v1/project-materials/{project_material_id}",
    tag = "project-materials",
    params(("project_material_id" = i32, Path, description = "Project material ID")),
    responses(
        (status = 200, description = "Project material deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Project material not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_project_material(
    user: CurrentUser,
    Path(project_material_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let existing = project_material::Entity::find_by_id(project_material_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load project material", e))?
        .ok_or_else(|| not_found("Project material", project_material_id))?;

    project_material::Entity::delete_by_id(project_material_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete project material", e))?;
    invalidate_project_reports(&state, existing.project_id).await;

    info!("Project material {} deleted", project_material_id);
    Ok(Json(ApiResponse::new(
        format!("Project material {} deleted", project_material_id),
        "Project material deleted successfully",
    )))
}
