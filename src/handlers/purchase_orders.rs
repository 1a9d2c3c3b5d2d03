use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, bad_request, check_category, database_error, ensure_project, found, not_found,
    parse_enum, validate_currency,
};
use crate::helpers::nullable::nullable;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use model::entities::purchase_order::{self, PurchaseOrderStatus};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreatePurchaseOrderRequest {
    pub project_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub order_number: String,
    #[validate(length(min = 1))]
    pub description: String,
    /// Budget category to charge. Without it the order is matched to a
    /// category named in its description.
    pub category: Option<String>,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub is_committed: Option<bool>,
    /// DRAFT, ISSUED, RECEIVED or CANCELLED; defaults to DRAFT
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdatePurchaseOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub order_number: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    /// `null` goes back to matching by description
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub is_committed: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderResponse {
    pub id: i32,
    pub project_id: i32,
    pub order_number: String,
    pub description: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub is_committed: bool,
    pub status: String,
    pub created_by_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<purchase_order::Model> for PurchaseOrderResponse {
    fn from(model: purchase_order::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            order_number: model.order_number,
            description: model.description,
            category: model.category,
            amount: model.amount,
            currency: model.currency,
            exchange_rate: model.exchange_rate,
            is_committed: model.is_committed,
            status: model.status.to_value(),
            created_by_id: model.created_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate, Default)]
pub struct PurchaseOrderQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches order number or description
    pub search: Option<String>,
    pub project_id: Option<i32>,
    pub status: Option<String>,
    pub is_committed: Option<bool>,
    pub category: Option<String>,
}

fn check_money(amount: Option<Decimal>, exchange_rate: Option<Decimal>) -> ApiResult<()> {
    if amount.is_some_and(|a| a.is_sign_negative()) {
        return Err(bad_request("VALIDATION_ERROR", "amount must not be negative"));
    }
    if exchange_rate.is_some_and(|r| r <= Decimal::ZERO) {
        return Err(bad_request("VALIDATION_ERROR", "exchange_rate must be positive"));
    }
    Ok(())
}

pub(crate) async fn list_purchase_orders(
    state: &AppState,
    query: PurchaseOrderQuery,
) -> ApiResult<Vec<PurchaseOrderResponse>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = purchase_order::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(purchase_order::Column::OrderNumber.contains(search))
                .add(purchase_order::Column::Description.contains(search)),
        );
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(purchase_order::Column::ProjectId.eq(project_id));
    }
    if let Some(status) = query.status.as_deref() {
        let status = parse_enum::<PurchaseOrderStatus>("status", status)?;
        select = select.filter(purchase_order::Column::Status.eq(status));
    }
    if let Some(is_committed) = query.is_committed {
        select = select.filter(purchase_order::Column::IsCommitted.eq(is_committed));
    }
    if let Some(category) = query.category {
        select = select.filter(purchase_order::Column::Category.eq(category));
    }

    let orders = select
        .order_by_desc(purchase_order::Column::CreatedAt)
        .order_by_asc(purchase_order::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve purchase orders", e))?;

    debug!("Retrieved {} purchase orders", orders.len());
    Ok(orders.into_iter().map(PurchaseOrderResponse::from).collect())
}

/// Create a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    tag = "purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created successfully", body = ApiResponse<PurchaseOrderResponse>),
        (status = 400, description = "Invalid project, status or amounts", body = ErrorResponse),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(project_id = request.project_id))]
pub async fn create_purchase_order(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreatePurchaseOrderRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PurchaseOrderResponse>>)> {
    user.require(Action::Create)?;
    check_money(Some(request.amount), request.exchange_rate)?;
    if let Some(category) = request.category.as_deref() {
        check_category(category)?;
    }
    let project = ensure_project(&state.db, request.project_id).await?;
    let currency = match request.currency.as_deref() {
        Some(code) => validate_currency(code)?,
        None => project.currency.clone(),
    };
    let status = match request.status.as_deref() {
        Some(s) => parse_enum::<PurchaseOrderStatus>("status", s)?,
        None => PurchaseOrderStatus::Draft,
    };

    let now = Utc::now().naive_utc();
    let new_order = purchase_order::ActiveModel {
        project_id: Set(project.id),
        order_number: Set(request.order_number),
        description: Set(request.description),
        category: Set(request.category),
        amount: Set(request.amount),
        currency: Set(currency),
        exchange_rate: Set(request.exchange_rate.unwrap_or(Decimal::ONE)),
        is_committed: Set(request.is_committed.unwrap_or(false)),
        status: Set(status),
        created_by_id: Set(Some(user.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_order
        .insert(&state.db)
        .await
        .map_err(|e| database_error("Failed to create purchase order", e))?;
    invalidate_project_reports(&state, created.project_id).await;

    info!(
        "Purchase order {} ({}) created in project {}, committed: {}",
        created.id, created.order_number, created.project_id, created.is_committed
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            PurchaseOrderResponse::from(created),
            "Purchase order created successfully",
        )),
    ))
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    tag = "purchase-orders",
    params(PurchaseOrderQuery),
    responses(
        (status = 200, description = "Purchase orders retrieved successfully", body = ApiResponse<Vec<PurchaseOrderResponse>>),
        (status = 400, description = "Invalid status filter", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_purchase_orders(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<PurchaseOrderQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<PurchaseOrderResponse>>>> {
    user.require(Action::View)?;
    let orders = list_purchase_orders(&state, query).await?;
    Ok(Json(ApiResponse::new(orders, "Purchase orders retrieved successfully")))
}

/// List the purchase orders of one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/purchase-orders",
    tag = "purchase-orders",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Purchase orders retrieved successfully", body = ApiResponse<Vec<PurchaseOrderResponse>>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_purchase_orders(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<PurchaseOrderResponse>>>> {
    user.require(Action::View)?;
    super::ensure_project_found(&state, project_id).await?;
    let query = PurchaseOrderQuery {
        project_id: Some(project_id),
        limit: Some(1000),
        ..Default::default()
    };
    let orders = list_purchase_orders(&state, query).await?;
    Ok(Json(ApiResponse::new(orders, "Purchase orders retrieved successfully")))
}

/// Get a purchase order by ID
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{purchase_order_id}",
    tag = "purchase-orders",
    params(("purchase_order_id" = i32, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order retrieved successfully", body = ApiResponse<PurchaseOrderResponse>),
        (status = 404, description = "Purchase order not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_purchase_order(
    user: CurrentUser,
    Path(purchase_order_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<PurchaseOrderResponse>>> {
    user.require(Action::View)?;
    let model = found(
        purchase_order::Entity::find_by_id(purchase_order_id)
            .one(&state.db)
            .await,
        "Purchase order",
        purchase_order_id,
    )?;
    Ok(Json(ApiResponse::new(
        PurchaseOrderResponse::from(model),
        "Purchase order retrieved successfully",
    )))
}

/// Update a purchase order
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{purchase_order_id}",
    tag = "purchase-orders",
    params(("purchase_order_id" = i32, Path, description = "Purchase order ID")),
    request_body = UpdatePurchaseOrderRequest,
    responses(
        (status = 200, description = "Purchase order updated successfully", body = ApiResponse<PurchaseOrderResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Purchase order not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_purchase_order(
    user: CurrentUser,
    Path(purchase_order_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdatePurchaseOrderRequest>>,
) -> ApiResult<Json<ApiResponse<PurchaseOrderResponse>>> {
    user.require(Action::Edit)?;
    check_money(request.amount, request.exchange_rate)?;

    let existing = found(
        purchase_order::Entity::find_by_id(purchase_order_id)
            .one(&state.db)
            .await,
        "Purchase order",
        purchase_order_id,
    )?;
    let mut active: purchase_order::ActiveModel = existing.into();

    if let Some(order_number) = request.order_number {
        active.order_number = Set(order_number);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
    }
    if let Some(category) = request.category {
        if let Some(name) = category.as_deref() {
            check_category(name)?;
        }
        active.category = Set(category);
    }
    if let Some(amount) = request.amount {
        active.amount = Set(amount);
    }
    if let Some(currency) = request.currency.as_deref() {
        active.currency = Set(validate_currency(currency)?);
    }
    if let Some(exchange_rate) = request.exchange_rate {
        active.exchange_rate = Set(exchange_rate);
    }
    if let Some(is_committed) = request.is_committed {
        active.is_committed = Set(is_committed);
    }
    if let Some(status) = request.status.as_deref() {
        active.status = Set(parse_enum::<PurchaseOrderStatus>("status", status)?);
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update purchase order", e))?;
    invalidate_project_reports(&state, updated.project_id).await;

    info!("Purchase order {} updated", purchase_order_id);
    Ok(Json(ApiResponse::new(
        PurchaseOrderResponse::from(updated),
        "Purchase order updated successfully",
    )))
}

/// Delete a purchase order
#[utoipa::path(
    delete,
    path = "/api/v1/purchase-orders/{purchase_order_id}",
    tag = "purchase-orders",
    params(("purchase_order_id" = i32, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Purchase order not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_purchase_order(
    user: CurrentUser,
    Path(purchase_order_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let existing = purchase_order::Entity::find_by_id(purchase_order_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load purchase order", e))?
        .ok_or_else(|| not_found("Purchase order", purchase_order_id))?;

    purchase_order::Entity::delete_by_id(purchase_order_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete purchase order", e))?;
    invalidate_project_reports(&state, existing.project_id).await;

    info!("Purchase order {} deleted", purchase_order_id);
    Ok(Json(ApiResponse::new(
        format!("Purchase order {} deleted", purchase_order_id),
        "Purchase order deleted successfully",
    )))
}
