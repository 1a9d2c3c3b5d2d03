//! Role-based gating.
//!
//! Session handling lives outside this service; it forwards the acting
//! user's id in the `X-User-Id` header. [`CurrentUser`] resolves that id to a
//! user row, and handlers call [`CurrentUser::require`] with the [`Action`]
//! they are about to perform.

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};
use axum::response::Json;
use model::entities::user::{self, Role};
use sea_orm::{ActiveEnum, EntityTrait};
use tracing::{debug, error, warn};

use crate::helpers::errors::{ApiError, api_error};
use crate::schemas::{AppState, ErrorResponse};

pub const USER_ID_HEADER: &str = "x-user-id";

/// What a request is about to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    ManageUsers,
    ManageSettings,
}

pub fn has_permission(role: Role, action: Action) -> bool {
    match action {
        Action::View => true,
        Action::Create | Action::Edit => {
            matches!(role, Role::Admin | Role::Manager | Role::Accountant)
        }
        Action::Delete => matches!(role, Role::Admin | Role::Manager),
        Action::ManageUsers | Action::ManageSettings => role == Role::Admin,
    }
}

/// The user on whose behalf the request runs.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    /// Fails with 403 FORBIDDEN unless the user's role allows `action`.
    pub fn require(&self, action: Action) -> Result<(), ApiError> {
        if has_permission(self.role, action) {
            return Ok(());
        }
        warn!(
            "User {} ({}) denied {:?}",
            self.username,
            self.role.to_value(),
            action
        );
        Err(api_error(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            format!("Role {} may not perform {:?}", self.role.to_value(), action),
        ))
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| unauthorized("Missing X-User-Id header"))?;

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .ok_or_else(|| unauthorized("X-User-Id must be a numeric user id"))?;

        match user::Entity::find_by_id(user_id).one(&state.db).await {
            Ok(Some(found)) => {
                debug!("Request authenticated as {} ({})", found.username, found.role.to_value());
                Ok(CurrentUser {
                    id: found.id,
                    username: found.username,
                    role: found.role,
                })
            }
            Ok(None) => {
                warn!("Request for unknown user {}", user_id);
                Err(api_error(
                    StatusCode::UNAUTHORIZED,
                    "UNKNOWN_USER",
                    format!("User {} does not exist", user_id),
                ))
            }
            Err(e) => {
                error!("Failed to look up acting user {}: {}", user_id, e);
                Err(api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Failed to resolve the acting user",
                ))
            }
        }
    }
}
