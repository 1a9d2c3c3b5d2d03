//! Building blocks for the `(StatusCode, Json<ErrorResponse>)` errors every
//! handler returns.

use std::fmt::Display;

use axum::{http::StatusCode, response::Json};
use common::currency::{is_valid_currency_code, normalize_currency_code};
use common::{BUDGET_CATEGORIES, is_budget_category};
use model::entities::{budget_item, material, project};
use sea_orm::{ActiveEnum, DatabaseConnection, DbErr, EntityTrait, SqlErr};
use tracing::{error, warn};

use crate::schemas::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
            success: false,
        }),
    )
}

pub fn not_found(entity: &str, id: impl Display) -> ApiError {
    warn!("{} {} not found", entity, id);
    api_error(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("{} {} not found", entity, id),
    )
}

pub fn bad_request(code: &str, message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, code, message)
}

/// Logs a database error and hides its details from the client.
pub fn database_error(context: &str, err: DbErr) -> ApiError {
    error!("{}: {}", context, err);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "DATABASE_ERROR",
        format!("{} due to a database error", context),
    )
}

/// Maps unique-constraint violations to 409 `code`, anything else to 500.
pub fn insert_error(context: &str, err: DbErr, code: &str, message: impl Into<String>) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            warn!("{}: unique constraint violated ({})", context, detail);
            api_error(StatusCode::CONFLICT, code, message)
        }
        _ => database_error(context, err),
    }
}

/// Parses one of the upper-case string values of a stored enum.
pub fn parse_enum<E>(field: &str, value: &str) -> ApiResult<E>
where
    E: ActiveEnum<Value = String>,
{
    E::try_from_value(&value.trim().to_uppercase()).map_err(|_| {
        bad_request(
            "VALIDATION_ERROR",
            format!("Invalid {} '{}'", field, value),
        )
    })
}

/// Normalizes a currency code and rejects unknown ones.
pub fn validate_currency(code: &str) -> ApiResult<String> {
    let normalized = normalize_currency_code(code);
    if is_valid_currency_code(&normalized) {
        Ok(normalized)
    } else {
        warn!("Rejected unknown currency code '{}'", code);
        Err(bad_request(
            "INVALID_CURRENCY",
            format!("Unknown currency code '{}'", code),
        ))
    }
}

/// Rejects categories outside the fixed budget vocabulary.
pub fn check_category(category: &str) -> ApiResult<()> {
    if is_budget_category(category) {
        Ok(())
    } else {
        warn!("Rejected budget category '{}'", category);
        Err(bad_request(
            "INVALID_CATEGORY",
            format!(
                "Category '{}' is not one of: {}",
                category,
                BUDGET_CATEGORIES.join(", ")
            ),
        ))
    }
}

pub async fn ensure_project(db: &DatabaseConnection, project_id: i32) -> ApiResult<project::Model> {
    match project::Entity::find_by_id(project_id).one(db).await {
        Ok(Some(found)) => Ok(found),
        Ok(None) => {
            warn!("Referenced project {} does not exist", project_id);
            Err(bad_request(
                "INVALID_PROJECT_ID",
                format!("Project with ID {} does not exist", project_id),
            ))
        }
        Err(e) => Err(database_error("Failed to validate project", e)),
    }
}

pub async fn ensure_material(db: &DatabaseConnection, material_id: i32) -> ApiResult<material::Model> {
    match material::Entity::find_by_id(material_id).one(db).await {
        Ok(Some(found)) => Ok(found),
        Ok(None) => Err(bad_request(
            "INVALID_MATERIAL_ID",
            format!("Material with ID {} does not exist", material_id),
        )),
        Err(e) => Err(database_error("Failed to validate material", e)),
    }
}

/// The budget item must exist and belong to `project_id`.
pub async fn ensure_budget_item(
    db: &DatabaseConnection,
    budget_item_id: i32,
    project_id: i32,
) -> ApiResult<budget_item::Model> {
    match budget_item::Entity::find_by_id(budget_item_id).one(db).await {
        Ok(Some(found)) if found.project_id == project_id => Ok(found),
        Ok(_) => Err(bad_request(
            "INVALID_BUDGET_ITEM_ID",
            format!(
                "Budget item {} does not exist in project {}",
                budget_item_id, project_id
            ),
        )),
        Err(e) => Err(database_error("Failed to validate budget item", e)),
    }
}

/// Unwraps a lookup by id, turning a miss into 404.
pub fn found<T>(result: Result<Option<T>, DbErr>, entity: &str, id: i32) -> ApiResult<T> {
    match result {
        Ok(Some(model)) => Ok(model),
        Ok(None) => Err(not_found(entity, id)),
        Err(e) => Err(database_error(&format!("Failed to load {} {}", entity, id), e)),
    }
}
