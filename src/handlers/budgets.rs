use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, bad_request, check_category, database_error, ensure_project, found, not_found,
    validate_currency,
};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use model::entities::budget_item;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating a budget item
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBudgetItemRequest {
    pub project_id: i32,
    /// One of the fixed budget categories
    pub category: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Defaults to the project's currency
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateBudgetItemRequest {
    pub category: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetItemResponse {
    pub id: i32,
    pub project_id: i32,
    pub category: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub created_by_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<budget_item::Model> for BudgetItemResponse {
    fn from(model: budget_item::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            category: model.category,
            description: model.description,
            quantity: model.quantity,
            unit_price: model.unit_price,
            total_price: model.total_price,
            currency: model.currency,
            created_by_id: model.created_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct BudgetItemQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches the description
    pub search: Option<String>,
    pub project_id: Option<i32>,
    pub category: Option<String>,
}

fn check_quantities(quantity: Option<Decimal>, unit_price: Option<Decimal>) -> ApiResult<()> {
    if quantity.is_some_and(|q| q.is_sign_negative()) {
        return Err(bad_request("VALIDATION_ERROR", "quantity must not be negative"));
    }
    if unit_price.is_some_and(|p| p.is_sign_negative()) {
        return Err(bad_request("VALIDATION_ERROR", "unit_price must not be negative"));
    }
    Ok(())
}

fn line_total(quantity: Decimal, unit_price: Decimal) -> ApiResult<Decimal> {
    budget_item::compute_total(quantity, unit_price).ok_or_else(|| {
        warn!("Budget line total overflowed: {} x {}", quantity, unit_price);
        bad_request(
            "VALIDATION_ERROR",
            "quantity times unit_price is too large",
        )
    })
}

pub(crate) async fn list_budget_items(
    state: &AppState,
    query: BudgetItemQuery,
) -> ApiResult<Vec<BudgetItemResponse>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = budget_item::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(budget_item::Column::Description.contains(search));
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(budget_item::Column::ProjectId.eq(project_id));
    }
    if let Some(category) = query.category {
        select = select.filter(budget_item::Column::Category.eq(category));
    }

    let items = select
        .order_by_asc(budget_item::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve budget items", e))?;

    debug!("Retrieved {} budget items", items.len());
    Ok(items.into_iter().map(BudgetItemResponse::from).collect())
}

/// Create a budget item; its total is quantity times unit price
#[utoipa::path(
    post,
    path = "/api/v1/budgets",
    tag = "budgets",
    request_body = CreateBudgetItemRequest,
    responses(
        (status = 201, description = "Budget item created successfully", body = ApiResponse<BudgetItemResponse>),
        (status = 400, description = "Invalid category, project or amounts", body = ErrorResponse),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_budget_item(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateBudgetItemRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BudgetItemResponse>>)> {
    user.require(Action::Create)?;
    check_category(&request.category)?;
    check_quantities(Some(request.quantity), Some(request.unit_price))?;
    let total_price = line_total(request.quantity, request.unit_price)?;
    let project = ensure_project(&state.db, request.project_id).await?;
    let currency = match request.currency.as_deref() {
        Some(code) => validate_currency(code)?,
        None => project.currency.clone(),
    };

    let now = Utc::now().naive_utc();
    let new_item = budget_item::ActiveModel {
        project_id: Set(project.id),
        category: Set(request.category),
        description: Set(request.description),
        quantity: Set(request.quantity),
        unit_price: Set(request.unit_price),
        total_price: Set(total_price),
        currency: Set(currency),
        created_by_id: Set(Some(user.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_item
        .insert(&state.db)
        .await
        .map_err(|e| database_error("Failed to create budget item", e))?;
    invalidate_project_reports(&state, created.project_id).await;

    info!(
        "Budget item {} created in project {} ({} = {})",
        created.id, created.project_id, created.category, created.total_price
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            BudgetItemResponse::from(created),
            "Budget item created successfully",
        )),
    ))
}

/// List budget items
#[utoipa::path(
    get,
    path = "/api/v1/budgets",
    tag = "budgets",
    params(BudgetItemQuery),
    responses(
        (status = 200, description = "Budget items retrieved successfully", body = ApiResponse<Vec<BudgetItemResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_budget_items(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<BudgetItemQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<BudgetItemResponse>>>> {
    user.require(Action::View)?;
    let items = list_budget_items(&state, query).await?;
    Ok(Json(ApiResponse::new(items, "Budget items retrieved successfully")))
}

/// List the budget items of one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/budgets",
    tag = "budgets",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Budget items retrieved successfully", body = ApiResponse<Vec<BudgetItemResponse>>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_budget_items(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<BudgetItemResponse>>>> {
    user.require(Action::View)?;
    super::ensure_project_found(&state, project_id).await?;
    let query = BudgetItemQuery {
        page: None,
        limit: Some(1000),
        search: None,
        project_id: Some(project_id),
        category: None,
    };
    let items = list_budget_items(&state, query).await?;
    Ok(Json(ApiResponse::new(items, "Budget items retrieved successfully")))
}

/// Get a budget item by ID
#[utoipa::path(
    get,
    path = "/api/v1/budgets/{budget_item_id}",
    tag = "budgets",
    params(("budget_item_id" = i32, Path, description = "Budget item ID")),
    responses(
        (status = 200, description = "Budget item retrieved successfully", body = ApiResponse<BudgetItemResponse>),
        (status = 404, description = "Budget item not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_budget_item(
    user: CurrentUser,
    Path(budget_item_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<BudgetItemResponse>>> {
    user.require(Action::View)?;
    let item = found(
        budget_item::Entity::find_by_id(budget_item_id).one(&state.db).await,
        "Budget item",
        budget_item_id,
    )?;
    Ok(Json(ApiResponse::new(
        BudgetItemResponse::from(item),
        "Budget item retrieved successfully",
    )))
}

/// Update a budget item, recomputing its total when quantity or price change
#[utoipa::path(
    put,
    path = "/api/v1/budgets/{budget_item_id}",
    tag = "budgets",
    params(("budget_item_id" = i32, Path, description = "Budget item ID")),
    request_body = UpdateBudgetItemRequest,
    responses(
        (status = 200, description = "Budget item updated successfully", body = ApiResponse<BudgetItemResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Budget item not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_budget_item(
    user: CurrentUser,
    Path(budget_item_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateBudgetItemRequest>>,
) -> ApiResult<Json<ApiResponse<BudgetItemResponse>>> {
    user.require(Action::Edit)?;
    if let Some(category) = request.category.as_deref() {
        check_category(category)?;
    }
    check_quantities(request.quantity, request.unit_price)?;

    let existing = found(
        budget_item::Entity::find_by_id(budget_item_id).one(&state.db).await,
        "Budget item",
        budget_item_id,
    )?;

    let quantity = request.quantity.unwrap_or(existing.quantity);
    let unit_price = request.unit_price.unwrap_or(existing.unit_price);
    let reprice = request.quantity.is_some() || request.unit_price.is_some();
    let total_price = line_total(quantity, unit_price)?;

    let mut active: budget_item::ActiveModel = existing.into();
    if let Some(category) = request.category {
        active.category = Set(category);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
    }
    if let Some(currency) = request.currency.as_deref() {
        active.currency = Set(validate_currency(currency)?);
    }
    if reprice {
        active.quantity = Set(quantity);
        active.unit_price = Set(unit_price);
        active.total_price = Set(total_price);
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update budget item", e))?;
    invalidate_project_reports(&state, updated.project_id).await;

    info!("Budget item {} updated", budget_item_id);
    Ok(Json(ApiResponse::new(
        BudgetItemResponse::from(updated),
        "Budget item updated successfully",
    )))
}

/// Delete a budget item
#[utoipa::path(
    delete,
    path = "/api/v1/budgets/{budget_item_id}",
    tag = "budgets",
    params(("budget_item_id" = i32, Path, description = "Budget item ID")),
    responses(
        (status = 200, description = "Budget item deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Budget item not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_budget_item(
    user: CurrentUser,
    Path(budget_item_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let existing = budget_item::Entity::find_by_id(budget_item_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load budget item", e))?
        .ok_or_else(|| not_found("Budget item", budget_item_id))?;

    budget_item::Entity::delete_by_id(budget_item_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete budget item", e))?;
    invalidate_project_reports(&state, existing.project_id).await;

    info!("Budget item {} deleted", budget_item_id);
    Ok(Json(ApiResponse::new(
        format!("Budget item {} deleted", budget_item_id),
        "Budget item deleted successfully",
    )))
}
