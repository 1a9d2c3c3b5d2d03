use crate::auth::{Action, CurrentUser};
use crate::helpers::errors::{
    ApiResult, database_error, found, insert_error, not_found, parse_enum,
};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use model::entities::user::{self, Role};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    /// ADMIN, MANAGER, ACCOUNTANT or VISUALIZER
    pub role: String,
}

/// Request body for updating a user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
}

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub created_at: NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            full_name: model.full_name,
            email: model.email,
            role: model.role.to_value(),
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct UserQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches username, full name or email
    pub search: Option<String>,
    pub role: Option<String>,
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Only administrators manage users", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_user(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateUserRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    user.require(Action::ManageUsers)?;
    let role = parse_enum::<Role>("role", &request.role)?;

    let new_user = user::ActiveModel {
        username: Set(request.username.clone()),
        full_name: Set(request.full_name),
        email: Set(request.email),
        role: Set(role),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let created = new_user.insert(&state.db).await.map_err(|e| {
        insert_error(
            "Failed to create user",
            e,
            "DUPLICATE_USERNAME",
            format!("Username '{}' already exists", request.username),
        )
    })?;

    info!(
        "User created successfully with ID: {}, username: {}",
        created.id, created.username
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserResponse::from(created), "User created successfully")),
    ))
}

/// Get all users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 400, description = "Invalid role filter", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<UserQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    user.require(Action::View)?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = user::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(user::Column::Username.contains(search))
                .add(user::Column::FullName.contains(search))
                .add(user::Column::Email.contains(search)),
        );
    }
    if let Some(role) = query.role.as_deref() {
        let role = parse_enum::<Role>("role", role)?;
        select = select.filter(user::Column::Role.eq(role));
    }

    let users = select
        .order_by_asc(user::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve users", e))?;

    debug!("Retrieved {} users from database", users.len());
    Ok(Json(ApiResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        "Users retrieved successfully",
    )))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    user: CurrentUser,
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    user.require(Action::View)?;
    let model = found(
        user::Entity::find_by_id(user_id).one(&state.db).await,
        "User",
        user_id,
    )?;
    Ok(Json(ApiResponse::new(UserResponse::from(model), "User retrieved successfully")))
}

/// Update an existing user
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 403, description = "Only administrators manage users", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_user(
    user: CurrentUser,
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    user.require(Action::ManageUsers)?;

    let existing = found(
        user::Entity::find_by_id(user_id).one(&state.db).await,
        "User",
        user_id,
    )?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(username) = request.username.clone() {
        active.username = Set(username);
    }
    if let Some(full_name) = request.full_name {
        active.full_name = Set(full_name);
    }
    if let Some(email) = request.email {
        active.email = Set(Some(email));
    }
    if let Some(role) = request.role.as_deref() {
        let role = parse_enum::<Role>("role", role)?;
        if user_id == user.id && role != Role::Admin {
            warn!("Administrator {} is dropping their own admin role", user.id);
        }
        active.role = Set(role);
    }

    let updated = active.update(&state.db).await.map_err(|e| {
        insert_error(
            "Failed to update user",
            e,
            "DUPLICATE_USERNAME",
            format!(
                "Username '{}' already exists",
                request.username.unwrap_or_default()
            ),
        )
    })?;

    info!("User {} updated successfully", user_id);
    Ok(Json(ApiResponse::new(UserResponse::from(updated), "User updated successfully")))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Only administrators manage users", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    user: CurrentUser,
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::ManageUsers)?;

    let result = user::Entity::delete_by_id(user_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete user", e))?;
    if result.rows_affected == 0 {
        return Err(not_found("User", user_id));
    }

    info!("User {} deleted successfully", user_id);
    Ok(Json(ApiResponse::new(
        format!("User {} deleted", user_id),
        "User deleted successfully",
    )))
}
