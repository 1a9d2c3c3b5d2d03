//! Requests for material to be sent to a project site, and their
//! PENDING → APPROVED/REJECTED → DELIVERED workflow.

use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, api_error, bad_request, database_error, ensure_material, ensure_project, found,
    not_found, parse_enum,
};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use model::entities::material_request::{self, MaterialRequestStatus};
use model::entities::project_material;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateMaterialRequestRequest {
    pub project_id: i32,
    pub material_id: i32,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateMaterialRequestRequest {
    pub quantity: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MaterialRequestResponse {
    pub id: i32,
    pub project_id: i32,
    pub material_id: i32,
    pub quantity: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub requested_by_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<material_request::Model> for MaterialRequestResponse {
    fn from(model: material_request::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            material_id: model.material_id,
            quantity: model.quantity,
            status: model.status.to_value(),
            notes: model.notes,
            requested_by_id: model.requested_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct MaterialRequestQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches the notes
    pub search: Option<String>,
    pub project_id: Option<i32>,
    pub material_id: Option<i32>,
    pub status: Option<String>,
}

fn check_quantity(quantity: Option<Decimal>) -> ApiResult<()> {
    if quantity.is_some_and(|q| q <= Decimal::ZERO) {
        return Err(bad_request("VALIDATION_ERROR", "quantity must be positive"));
    }
    Ok(())
}

fn invalid_transition(
    from: MaterialRequestStatus,
    to: MaterialRequestStatus,
) -> (StatusCode, Json<ErrorResponse>) {
    api_error(
        StatusCode::CONFLICT,
        "INVALID_STATUS_TRANSITION",
        format!(
            "Cannot move a {} request to {}",
            from.to_value(),
            to.to_value()
        ),
    )
}

/// Loads the request and checks it may move to `next`.
async fn load_for_transition(
    state: &AppState,
    material_request_id: i32,
    next: MaterialRequestStatus,
) -> ApiResult<material_request::Model> {
    let existing = found(
        material_request::Entity::find_by_id(material_request_id)
            .one(&state.db)
            .await,
        "Material request",
        material_request_id,
    )?;
    if !existing.status.can_transition_to(next) {
        warn!(
            "Rejected transition of material request {} from {:?} to {:?}",
            material_request_id, existing.status, next
        );
        return Err(invalid_transition(existing.status, next));
    }
    Ok(existing)
}

/// Moves the request to `next` unless its status changed since it was loaded.
async fn set_status<C: ConnectionTrait>(
    conn: &C,
    existing: material_request::Model,
    next: MaterialRequestStatus,
) -> ApiResult<material_request::Model> {
    let now = Utc::now().naive_utc();
    let result = material_request::Entity::update_many()
        .set(material_request::ActiveModel {
            status: Set(next),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(material_request::Column::Id.eq(existing.id))
        .filter(material_request::Column::Status.eq(existing.status))
        .exec(conn)
        .await
        .map_err(|e| database_error("Failed to update material request", e))?;

    if result.rows_affected == 0 {
        warn!(
            "Material request {} left {:?} before it could move to {:?}",
            existing.id, existing.status, next
        );
        return Err(invalid_transition(existing.status, next));
    }

    Ok(material_request::Model {
        status: next,
        updated_at: now,
        ..existing
    })
}

/// Request material for a project
#[utoipa::path(
    post,
    path = "/api/v1/material-requests",
    tag = "material-requests",
    request_body = CreateMaterialRequestRequest,
    responses(
        (status = 201, description = "Material request created successfully", body = ApiResponse<MaterialRequestResponse>),
        (status = 400, description = "Invalid project, material or quantity", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_material_request(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateMaterialRequestRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MaterialRequestResponse>>)> {
    user.require(Action::Create)?;
    check_quantity(Some(request.quantity))?;
    let project = ensure_project(&state.db, request.project_id).await?;
    let material = ensure_material(&state.db, request.material_id).await?;

    let now = Utc::now().naive_utc();
    let created = material_request::ActiveModel {
        project_id: Set(project.id),
        material_id: Set(material.id),
        quantity: Set(request.quantity),
        status: Set(MaterialRequestStatus::Pending),
        notes: Set(request.notes),
        requested_by_id: Set(Some(user.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| database_error("Failed to create material request", e))?;

    info!(
        "User {} requested {} of material {} for project {}",
        user.id, created.quantity, created.material_id, created.project_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            MaterialRequestResponse::from(created),
            "Material request created successfully",
        )),
    ))
}

/// List material requests
#[utoipa::path(
    get,
    path = "/api/v1/material-requests",
    tag = "material-requests",
    params(MaterialRequestQuery),
    responses(
        (status = 200, description = "Material requests retrieved successfully", body = ApiResponse<Vec<MaterialRequestResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn get_material_requests(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<MaterialRequestQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<MaterialRequestResponse>>>> {
    user.require(Action::View)?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = material_request::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(material_request::Column::Notes.contains(search));
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(material_request::Column::ProjectId.eq(project_id));
    }
    if let Some(material_id) = query.material_id {
        select = select.filter(material_request::Column::MaterialId.eq(material_id));
    }
    if let Some(status) = query.status.as_deref() {
        let status = parse_enum::<MaterialRequestStatus>("status", status)?;
        select = select.filter(material_request::Column::Status.eq(status));
    }

    let requests = select
        .order_by_desc(material_request::Column::CreatedAt)
        .order_by_asc(material_request::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve material requests", e))?;

    debug!("Retrieved {} material requests", requests.len());
    Ok(Json(ApiResponse::new(
        requests.into_iter().map(MaterialRequestResponse::from).collect(),
        "Material requests retrieved successfully",
    )))
}

/// Get a material request by ID
#[utoipa::path(
    get,
    path = "/api/v1/material-requests/{material_request_id}",
    tag = "material-requests",
    params(("material_request_id" = i32, Path, description = "Material request ID")),
    responses(
        (status = 200, description = "Material request retrieved successfully", body = ApiResponse<MaterialRequestResponse>),
        (status = 404, description = "Material request not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_material_request(
    user: CurrentUser,
    Path(material_request_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<MaterialRequestResponse>>> {
    user.require(Action::View)?;
    let model = found(
        material_request::Entity::find_by_id(material_request_id)
            .one(&state.db)
            .await,
        "Material request",
        material_request_id,
    )?;
    Ok(Json(ApiResponse::new(
        MaterialRequestResponse::from(model),
        "Material request retrieved successfully",
    )))
}

/// Change quantity or notes of a pending request
#[utoipa::path(
    put,
    path = "/api/v1/material-requests/{material_request_id}",
    tag = "material-requests",
    params(("material_request_id" = i32, Path, description = "Material request ID")),
    request_body = UpdateMaterialRequestRequest,
    responses(
        (status = 200, description = "Material request updated successfully", body = ApiResponse<MaterialRequestResponse>),
        (status = 404, description = "Material request not found", body = ErrorResponse),
        (status = 409, description = "Request is no longer pending", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_material_request(
    user: CurrentUser,
    Path(material_request_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateMaterialRequestRequest>>,
) -> ApiResult<Json<ApiResponse<MaterialRequestResponse>>> {
    user.require(Action::Edit)?;
    check_quantity(request.quantity)?;

    let existing = found(
        material_request::Entity::find_by_id(material_request_id)
            .one(&state.db)
            .await,
        "Material request",
        material_request_id,
    )?;
    if existing.status != MaterialRequestStatus::Pending {
        return Err(api_error(
            StatusCode::CONFLICT,
            "INVALID_STATUS_TRANSITION",
            format!(
                "Only pending requests can be edited; request {} is {}",
                material_request_id,
                existing.status.to_value()
            ),
        ));
    }

    let mut active: material_request::ActiveModel = existing.into();
    if let Some(quantity) = request.quantity {
        active.quantity = Set(quantity);
    }
    if let Some(notes) = request.notes {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update material request", e))?;

    info!("Material request {} updated", material_request_id);
    Ok(Json(ApiResponse::new(
        MaterialRequestResponse::from(updated),
        "Material request updated successfully",
    )))
}

/// Delete a material request
#[utoipa::path(
    delete,
    path = "/api/v1/material-requests/{material_request_id}",
    tag = "material-requests",
    params(("material_request_id" = i32, Path, description = "Material request ID")),
    responses(
        (status = 200, description = "Material request deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Material request not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_material_request(
    user: CurrentUser,
    Path(material_request_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let result = material_request::Entity::delete_by_id(material_request_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete material request", e))?;
    if result.rows_affected == 0 {
        return Err(not_found("Material request", material_request_id));
    }

    info!("Material request {} deleted", material_request_id);
    Ok(Json(ApiResponse::new(
        format!("Material request {} deleted", material_request_id),
        "Material request deleted successfully",
    )))
}

/// Approve a pending request
#[utoipa::path(
    post,
    path = "/api/v1/material-requests/{material_request_id}/approve",
    tag = "material-requests",
    params(("material_request_id" = i32, Path, description = "Material request ID")),
    responses(
        (status = 200, description = "Material request approved", body = ApiResponse<MaterialRequestResponse>),
        (status = 403, description = "Only managers and administrators approve", body = ErrorResponse),
        (status = 404, description = "Material request not found", body = ErrorResponse),
        (status = 409, description = "Request is not pending", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn approve_material_request(
    user: CurrentUser,
    Path(material_request_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<MaterialRequestResponse>>> {
    user.require(Action::Delete)?;
    let next = MaterialRequestStatus::Approved;
    let existing = load_for_transition(&state, material_request_id, next).await?;
    let updated = set_status(&state.db, existing, next).await?;

    info!("Material request {} approved by user {}", material_request_id, user.id);
    Ok(Json(ApiResponse::new(
        MaterialRequestResponse::from(updated),
        "Material request approved",
    )))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/api/v1/material-requests/{material_request_id}/reject",
    tag = "material-requests",
    params(("material_request_id" = i32, Path, description = "Material request ID")),
    responses(
        (status = 200, description = "Material request rejected", body = ApiResponse<MaterialRequestResponse>),
        (status = 403, description = "Only managers and administrators reject", body = ErrorResponse),
        (status = 404, description = "Material request not found", body = ErrorResponse),
        (status = 409, description = "Request is not pending", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn reject_material_request(
    user: CurrentUser,
    Path(material_request_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<MaterialRequestResponse>>> {
    user.require(Action::Delete)?;
    let next = MaterialRequestStatus::Rejected;
    let existing = load_for_transition(&state, material_request_id, next).await?;
    let updated = set_status(&state.db, existing, next).await?;

    info!("Material request {} rejected by user {}", material_request_id, user.id);
    Ok(Json(ApiResponse::new(
        MaterialRequestResponse::from(updated),
        "Material request rejected",
    )))
}

/// Mark an approved request as delivered and add its quantity to the
/// project's stock of that material
#[utoipa::path(
    post,
    path = "/api/v1/material-requests/{material_request_id}/deliver",
    tag = "material-requests",
    params(("material_request_id" = i32, Path, description = "Material request ID")),
    responses(
        (status = 200, description = "Material request delivered", body = ApiResponse<MaterialRequestResponse>),
        (status = 403, description = "Only managers and administrators deliver", body = ErrorResponse),
        (status = 404, description = "Material request not found", body = ErrorResponse),
        (status = 409, description = "Request is not approved", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn deliver_material_request(
    user: CurrentUser,
    Path(material_request_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<MaterialRequestResponse>>> {
    user.require(Action::Delete)?;
    let next = MaterialRequestStatus::Delivered;
    let existing = load_for_transition(&state, material_request_id, next).await?;
    let material = ensure_material(&state.db, existing.material_id).await?;

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| database_error("Failed to start delivery", e))?;

    // Claims the request first so a concurrent delivery fails here
    let updated = set_status(&txn, existing, next).await?;

    let stock = project_material::Entity::find()
        .filter(project_material::Column::ProjectId.eq(updated.project_id))
        .filter(project_material::Column::MaterialId.eq(updated.material_id))
        .one(&txn)
        .await
        .map_err(|e| database_error("Failed to load project stock", e))?;

    match stock {
        Some(line) => {
            let quantity = line.quantity.checked_add(updated.quantity).ok_or_else(|| {
                warn!(
                    "Stock of material {} in project {} would overflow",
                    updated.material_id, updated.project_id
                );
                bad_request("VALIDATION_ERROR", "Delivered quantity is too large")
            })?;
            let mut active: project_material::ActiveModel = line.into();
            active.quantity = Set(quantity);
            active.update(&txn).await
        }
        None => {
            project_material::ActiveModel {
                project_id: Set(updated.project_id),
                material_id: Set(updated.material_id),
                quantity: Set(updated.quantity),
                minimum_stock: Set(Decimal::ZERO),
                unit_price: Set(material.base_price),
                currency: Set(material.currency.clone()),
                notes: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await
        }
    }
    .map_err(|e| database_error("Failed to update project stock", e))?;

    txn.commit()
        .await
        .map_err(|e| database_error("Failed to commit delivery", e))?;
    invalidate_project_reports(&state, updated.project_id).await;

    info!(
        "Material request {} delivered: {} of material {} added to project {}",
        material_request_id, updated.quantity, updated.material_id, updated.project_id
    );
    Ok(Json(ApiResponse::new(
        MaterialRequestResponse::from(updated),
        "Material request delivered",
    )))
}
