use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, database_error, ensure_project, found, not_found, parse_enum,
};
use crate::helpers::nullable::nullable;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use model::entities::task::{self, TaskPriority, TaskStatus};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTaskRequest {
    pub project_id: i32,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    /// TODO (default), IN_PROGRESS, COMPLETED or CANCELLED
    pub status: Option<String>,
    /// LOW, MEDIUM (default), HIGH or URGENT
    pub priority: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<NaiveDate>)]
    pub due_date: Option<Option<NaiveDate>>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub id: i32,
    pub project_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    pub created_by_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<task::Model> for TaskResponse {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            title: model.title,
            description: model.description,
            status: model.status.to_value(),
            priority: model.priority.to_value(),
            due_date: model.due_date,
            assigned_to: model.assigned_to,
            created_by_id: model.created_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate, Default)]
pub struct TaskQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches title, description or assignee
    pub search: Option<String>,
    pub project_id: Option<i32>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

pub(crate) async fn list_tasks(state: &AppState, query: TaskQuery) -> ApiResult<Vec<TaskResponse>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = task::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(task::Column::Title.contains(search))
                .add(task::Column::Description.contains(search))
                .add(task::Column::AssignedTo.contains(search)),
        );
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(task::Column::ProjectId.eq(project_id));
    }
    if let Some(status) = query.status.as_deref() {
        select = select.filter(task::Column::Status.eq(parse_enum::<TaskStatus>("status", status)?));
    }
    if let Some(priority) = query.priority.as_deref() {
        select = select
            .filter(task::Column::Priority.eq(parse_enum::<TaskPriority>("priority", priority)?));
    }

    let tasks = select
        .order_by_asc(task::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve tasks", e))?;

    debug!("Retrieved {} tasks", tasks.len());
    Ok(tasks.into_iter().map(TaskResponse::from).collect())
}

/// Create a task
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created successfully", body = ApiResponse<TaskResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_task(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateTaskRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TaskResponse>>)> {
    user.require(Action::Create)?;
    let status = match request.status.as_deref() {
        Some(s) => parse_enum::<TaskStatus>("status", s)?,
        None => TaskStatus::Todo,
    };
    let priority = match request.priority.as_deref() {
        Some(p) => parse_enum::<TaskPriority>("priority", p)?,
        None => TaskPriority::Medium,
    };
    let project = ensure_project(&state.db, request.project_id).await?;

    let now = Utc::now().naive_utc();
    let new_task = task::ActiveModel {
        project_id: Set(project.id),
        title: Set(request.title),
        description: Set(request.description),
        status: Set(status),
        priority: Set(priority),
        due_date: Set(request.due_date),
        assigned_to: Set(request.assigned_to),
        created_by_id: Set(Some(user.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_task
        .insert(&state.db)
        .await
        .map_err(|e| database_error("Failed to create task", e))?;
    invalidate_project_reports(&state, created.project_id).await;

    info!("Task {} created in project {}", created.id, created.project_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(TaskResponse::from(created), "Task created successfully")),
    ))
}

/// List tasks
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = ApiResponse<Vec<TaskResponse>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_tasks(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<TaskQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    user.require(Action::View)?;
    let tasks = list_tasks(&state, query).await?;
    Ok(Json(ApiResponse::new(tasks, "Tasks retrieved successfully")))
}

/// List the tasks of one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/tasks",
    tag = "tasks",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = ApiResponse<Vec<TaskResponse>>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_tasks(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    user.require(Action::View)?;
    super::ensure_project_found(&state, project_id).await?;
    let query = TaskQuery {
        project_id: Some(project_id),
        limit: Some(1000),
        ..Default::default()
    };
    let tasks = list_tasks(&state, query).await?;
    Ok(Json(ApiResponse::new(tasks, "Tasks retrieved successfully")))
}

/// Get a task by ID
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task retrieved successfully", body = ApiResponse<TaskResponse>),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_task(
    user: CurrentUser,
    Path(task_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    user.require(Action::View)?;
    let model = found(task::Entity::find_by_id(task_id).one(&state.db).await, "Task", task_id)?;
    Ok(Json(ApiResponse::new(TaskResponse::from(model), "Task retrieved successfully")))
}

/// Update a task
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = i32, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated successfully", body = ApiResponse<TaskResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_task(
    user: CurrentUser,
    Path(task_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateTaskRequest>>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    user.require(Action::Edit)?;

    let existing = found(task::Entity::find_by_id(task_id).one(&state.db).await, "Task", task_id)?;
    let mut active: task::ActiveModel = existing.into();

    if let Some(title) = request.title {
        active.title = Set(title);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(status) = request.status.as_deref() {
        active.status = Set(parse_enum::<TaskStatus>("status", status)?);
    }
    if let Some(priority) = request.priority.as_deref() {
        active.priority = Set(parse_enum::<TaskPriority>("priority", priority)?);
    }
    if let Some(due_date) = request.due_date {
        active.due_date = Set(due_date);
    }
    if let Some(assigned_to) = request.assigned_to {
        active.assigned_to = Set(Some(assigned_to));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update task", e))?;
    invalidate_project_reports(&state, updated.project_id).await;

    info!("Task {} updated", task_id);
    Ok(Json(ApiResponse::new(TaskResponse::from(updated), "Task updated successfully")))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_task(
    user: CurrentUser,
    Path(task_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let existing = task::Entity::find_by_id(task_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load task", e))?
        .ok_or_else(|| not_found("Task", task_id))?;

    task::Entity::delete_by_id(task_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete task", e))?;
    invalidate_project_reports(&state, existing.project_id).await;

    info!("Task {} deleted", task_id);
    Ok(Json(ApiResponse::new(format!("Task {} deleted", task_id), "Task deleted successfully")))
}
