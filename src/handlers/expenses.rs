use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, bad_request, database_error, ensure_budget_item, ensure_project, found, not_found,
    validate_currency,
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
use model::entities::expense;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateExpenseRequest {
    pub project_id: i32,
    /// Budget item of the same project this expense is charged to
    pub budget_item_id: Option<i32>,
    #[validate(length(min = 1))]
    pub description: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    /// Free text; categories without a budget item show up as unbudgeted
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub date: NaiveDate,
    pub invoice_number: Option<String>,
    pub supplier: Option<String>,
    /// Receipt image as an opaque (usually base64) string
    pub receipt_image: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateExpenseRequest {
    /// `null` detaches the expense from its budget item
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub budget_item_id: Option<Option<i32>>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub supplier: Option<Option<String>>,
    pub receipt_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: i32,
    pub project_id: i32,
    pub budget_item_id: Option<i32>,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub category: String,
    pub date: NaiveDate,
    pub invoice_number: Option<String>,
    pub supplier: Option<String>,
    pub receipt_image: Option<String>,
    pub created_by_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<expense::Model> for ExpenseResponse {
    fn from(model: expense::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            budget_item_id: model.budget_item_id,
            description: model.description,
            amount: model.amount,
            currency: model.currency,
            exchange_rate: model.exchange_rate,
            category: model.category,
            date: model.date,
            invoice_number: model.invoice_number,
            supplier: model.supplier,
            receipt_image: model.receipt_image,
            created_by_id: model.created_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate, Default)]
pub struct ExpenseQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches description, supplier or invoice number
    pub search: Option<String>,
    pub project_id: Option<i32>,
    pub category: Option<String>,
    pub supplier: Option<String>,
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

pub(crate) async fn list_expenses(
    state: &AppState,
    query: ExpenseQuery,
) -> ApiResult<Vec<ExpenseResponse>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = expense::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(expense::Column::Description.contains(search))
                .add(expense::Column::Supplier.contains(search))
                .add(expense::Column::InvoiceNumber.contains(search)),
        );
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(expense::Column::ProjectId.eq(project_id));
    }
    if let Some(category) = query.category {
        select = select.filter(expense::Column::Category.eq(category));
    }
    if let Some(supplier) = query.supplier {
        select = select.filter(expense::Column::Supplier.eq(supplier));
    }

    let expenses = select
        .order_by_desc(expense::Column::Date)
        .order_by_asc(expense::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve expenses", e))?;

    debug!("Retrieved {} expenses", expenses.len());
    Ok(expenses.into_iter().map(ExpenseResponse::from).collect())
}

/// Record an expense
#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    tag = "expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created successfully", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "Invalid project, budget item or amounts", body = ErrorResponse),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(project_id = request.project_id))]
pub async fn create_expense(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateExpenseRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ExpenseResponse>>)> {
    user.require(Action::Create)?;
    check_money(Some(request.amount), request.exchange_rate)?;
    let project = ensure_project(&state.db, request.project_id).await?;
    if let Some(budget_item_id) = request.budget_item_id {
        ensure_budget_item(&state.db, budget_item_id, project.id).await?;
    }
    let currency = match request.currency.as_deref() {
        Some(code) => validate_currency(code)?,
        None => project.currency.clone(),
    };

    let now = Utc::now().naive_utc();
    let new_expense = expense::ActiveModel {
        project_id: Set(project.id),
        budget_item_id: Set(request.budget_item_id),
        description: Set(request.description),
        amount: Set(request.amount),
        currency: Set(currency),
        exchange_rate: Set(request.exchange_rate.unwrap_or(Decimal::ONE)),
        category: Set(request.category),
        date: Set(request.date),
        invoice_number: Set(request.invoice_number),
        supplier: Set(request.supplier),
        receipt_image: Set(request.receipt_image),
        created_by_id: Set(Some(user.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_expense
        .insert(&state.db)
        .await
        .map_err(|e| database_error("Failed to create expense", e))?;
    invalidate_project_reports(&state, created.project_id).await;

    info!(
        "Expense {} of {} {} recorded in project {}",
        created.id, created.amount, created.currency, created.project_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ExpenseResponse::from(created), "Expense created successfully")),
    ))
}

/// List expenses
#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    tag = "expenses",
    params(ExpenseQuery),
    responses(
        (status = 200, description = "Expenses retrieved successfully", body = ApiResponse<Vec<ExpenseResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expenses(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<ExpenseQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<ExpenseResponse>>>> {
    user.require(Action::View)?;
    let expenses = list_expenses(&state, query).await?;
    Ok(Json(ApiResponse::new(expenses, "Expenses retrieved successfully")))
}

/// List the expenses of one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/expenses",
    tag = "expenses",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Expenses retrieved successfully", body = ApiResponse<Vec<ExpenseResponse>>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_expenses(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<ExpenseResponse>>>> {
    user.require(Action::View)?;
    super::ensure_project_found(&state, project_id).await?;
    let query = ExpenseQuery {
        project_id: Some(project_id),
        limit: Some(1000),
        ..Default::default()
    };
    let expenses = list_expenses(&state, query).await?;
    Ok(Json(ApiResponse::new(expenses, "Expenses retrieved successfully")))
}

/// Get an expense by ID
#[utoipa::path(
    get,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense retrieved successfully", body = ApiResponse<ExpenseResponse>),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expense(
    user: CurrentUser,
    Path(expense_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<ExpenseResponse>>> {
    user.require(Action::View)?;
    let model = found(
        expense::Entity::find_by_id(expense_id).one(&state.db).await,
        "Expense",
        expense_id,
    )?;
    Ok(Json(ApiResponse::new(ExpenseResponse::from(model), "Expense retrieved successfully")))
}

/// Update an expense
#[utoipa::path(
    put,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated successfully", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_expense(
    user: CurrentUser,
    Path(expense_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateExpenseRequest>>,
) -> ApiResult<Json<ApiResponse<ExpenseResponse>>> {
    user.require(Action::Edit)?;
    check_money(request.amount, request.exchange_rate)?;

    let existing = found(
        expense::Entity::find_by_id(expense_id).one(&state.db).await,
        "Expense",
        expense_id,
    )?;
    if let Some(Some(budget_item_id)) = request.budget_item_id {
        ensure_budget_item(&state.db, budget_item_id, existing.project_id).await?;
    }

    let mut active: expense::ActiveModel = existing.into();
    if let Some(budget_item_id) = request.budget_item_id {
        active.budget_item_id = Set(budget_item_id);
    }
    if let Some(description) = request.description {
        active.description = Set(description);
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
    if let Some(category) = request.category {
        active.category = Set(category);
    }
    if let Some(date) = request.date {
        active.date = Set(date);
    }
    if let Some(invoice_number) = request.invoice_number {
        active.invoice_number = Set(Some(invoice_number));
    }
    if let Some(supplier) = request.supplier {
        active.supplier = Set(supplier);
    }
    if let Some(receipt_image) = request.receipt_image {
        active.receipt_image = Set(Some(receipt_image));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update expense", e))?;
    invalidate_project_reports(&state, updated.project_id).await;

    info!("Expense {} updated", expense_id);
    Ok(Json(ApiResponse::new(ExpenseResponse::from(updated), "Expense updated successfully")))
}

/// Delete an expense
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_expense(
    user: CurrentUser,
    Path(expense_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let existing = expense::Entity::find_by_id(expense_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load expense", e))?
        .ok_or_else(|| not_found("Expense", expense_id))?;

    expense::Entity::delete_by_id(expense_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete expense", e))?;
    invalidate_project_reports(&state, existing.project_id).await;

    info!("Expense {} deleted", expense_id);
    Ok(Json(ApiResponse::new(
        format!("Expense {} deleted", expense_id),
        "Expense deleted successfully",
    )))
}
