//! Application-wide key/value settings.

use crate::auth::{Action, CurrentUser};
use crate::helpers::errors::{ApiResult, database_error, not_found};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use model::entities::setting;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpsertSettingRequest {
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingResponse {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl From<setting::Model> for SettingResponse {
    fn from(model: setting::Model) -> Self {
        Self {
            key: model.key,
            value: model.value,
            description: model.description,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct SettingQuery {
    /// Matches key or description
    pub search: Option<String>,
}

/// List all settings
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    tag = "settings",
    params(SettingQuery),
    responses(
        (status = 200, description = "Settings retrieved successfully", body = ApiResponse<Vec<SettingResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn get_settings(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<SettingQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<SettingResponse>>>> {
    user.require(Action::View)?;

    let mut select = setting::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(setting::Column::Key.contains(search))
                .add(setting::Column::Description.contains(search)),
        );
    }
    let settings = select
        .order_by_asc(setting::Column::Key)
        .all(&state.db)
        .await
        .map_err(|e| database_error("Failed to retrieve settings", e))?;

    Ok(Json(ApiResponse::new(
        settings.into_iter().map(SettingResponse::from).collect(),
        "Settings retrieved successfully",
    )))
}

/// Get one setting
#[utoipa::path(
    get,
    path = "/api/v1/settings/{key}",
    tag = "settings",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting retrieved successfully", body = ApiResponse<SettingResponse>),
        (status = 404, description = "Setting not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_setting(
    user: CurrentUser,
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<SettingResponse>>> {
    user.require(Action::View)?;
    let model = setting::Entity::find_by_id(key.clone())
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to retrieve setting", e))?
        .ok_or_else(|| not_found("Setting", &key))?;
    Ok(Json(ApiResponse::new(SettingResponse::from(model), "Setting retrieved successfully")))
}

/// Create or replace a setting
#[utoipa::path(
    put,
    path = "/api/v1/settings/{key}",
    tag = "settings",
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpsertSettingRequest,
    responses(
        (status = 200, description = "Setting saved successfully", body = ApiResponse<SettingResponse>),
        (status = 403, description = "Only administrators change settings", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn upsert_setting(
    user: CurrentUser,
    Path(key): Path<String>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpsertSettingRequest>>,
) -> ApiResult<Json<ApiResponse<SettingResponse>>> {
    user.require(Action::ManageSettings)?;

    let existing = setting::Entity::find_by_id(key.clone())
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to retrieve setting", e))?;
    let now = Utc::now().naive_utc();

    let saved = match existing {
        Some(model) => {
            let mut active: setting::ActiveModel = model.into();
            active.value = Set(request.value);
            if let Some(description) = request.description {
                active.description = Set(Some(description));
            }
            active.updated_at = Set(now);
            active.update(&state.db).await
        }
        None => {
            setting::ActiveModel {
                key: Set(key.clone()),
                value: Set(request.value),
                description: Set(request.description),
                updated_at: Set(now),
            }
            .insert(&state.db)
            .await
        }
    }
    .map_err(|e| database_error("Failed to save setting", e))?;

    info!("Setting '{}' saved by user {}", key, user.id);
    Ok(Json(ApiResponse::new(SettingResponse::from(saved), "Setting saved successfully")))
}

/// Delete a setting
#[utoipa::path(
    delete,
    path = "/api/v1/settings/{key}",
    tag = "settings",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Only administrators change settings", body = ErrorResponse),
        (status = 404, description = "Setting not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_setting(
    user: CurrentUser,
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::ManageSettings)?;

    let result = setting::Entity::delete_by_id(key.clone())
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete setting", e))?;
    if result.rows_affected == 0 {
        return Err(not_found("Setting", &key));
    }

    info!("Setting '{}' deleted", key);
    Ok(Json(ApiResponse::new(
        format!("Setting '{}' deleted", key),
        "Setting deleted successfully",
    )))
}
