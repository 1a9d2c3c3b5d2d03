use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_project_reports;
use crate::helpers::errors::{
    ApiResult, bad_request, database_error, ensure_project, found, not_found, parse_enum,
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
use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use model::entities::invoice::{self, InvoiceStatus};
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
pub struct CreateInvoiceRequest {
    pub project_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub invoice_number: String,
    #[validate(length(min = 1, max = 200))]
    pub supplier: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// PENDING (default), PAID, OVERDUE or CANCELLED
    pub status: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub description: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1, max = 100))]
    pub invoice_number: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub supplier: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub issue_date: Option<NaiveDate>,
    /// `null` removes the due date
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<NaiveDate>)]
    pub due_date: Option<Option<NaiveDate>>,
    pub status: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: i32,
    pub project_id: i32,
    pub invoice_number: String,
    pub supplier: String,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// Status as stored
    pub status: String,
    /// Status as of today: a pending invoice past its due date is OVERDUE
    pub effective_status: String,
    pub category: String,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub created_by_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl InvoiceResponse {
    fn from_model(model: invoice::Model, today: NaiveDate) -> Self {
        let effective_status = model.effective_status(today).to_value();
        Self {
            id: model.id,
            project_id: model.project_id,
            invoice_number: model.invoice_number,
            supplier: model.supplier,
            amount: model.amount,
            currency: model.currency,
            exchange_rate: model.exchange_rate,
            issue_date: model.issue_date,
            due_date: model.due_date,
            status: model.status.to_value(),
            effective_status,
            category: model.category,
            description: model.description,
            file_url: model.file_url,
            created_by_id: model.created_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<invoice::Model> for InvoiceResponse {
    fn from(model: invoice::Model) -> Self {
        Self::from_model(model, Local::now().date_naive())
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate, Default)]
pub struct InvoiceQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches invoice number, supplier or description
    pub search: Option<String>,
    pub project_id: Option<i32>,
    /// Stored status
    pub status: Option<String>,
    pub supplier: Option<String>,
    pub category: Option<String>,
}

fn check_invoice(
    amount: Option<Decimal>,
    exchange_rate: Option<Decimal>,
    issue_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
) -> ApiResult<()> {
    if amount.is_some_and(|a| a.is_sign_negative()) {
        return Err(bad_request("VALIDATION_ERROR", "amount must not be negative"));
    }
    if exchange_rate.is_some_and(|r| r <= Decimal::ZERO) {
        return Err(bad_request("VALIDATION_ERROR", "exchange_rate must be positive"));
    }
    if let (Some(issued), Some(due)) = (issue_date, due_date) {
        if due < issued {
            return Err(bad_request(
                "INVALID_DATE_RANGE",
                "due_date must not be before issue_date",
            ));
        }
    }
    Ok(())
}

pub(crate) async fn list_invoices(
    state: &AppState,
    query: InvoiceQuery,
) -> ApiResult<Vec<InvoiceResponse>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = invoice::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(invoice::Column::InvoiceNumber.contains(search))
                .add(invoice::Column::Supplier.contains(search))
                .add(invoice::Column::Description.contains(search)),
        );
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(invoice::Column::ProjectId.eq(project_id));
    }
    if let Some(status) = query.status.as_deref() {
        let status = parse_enum::<InvoiceStatus>("status", status)?;
        select = select.filter(invoice::Column::Status.eq(status));
    }
    if let Some(supplier) = query.supplier {
        select = select.filter(invoice::Column::Supplier.eq(supplier));
    }
    if let Some(category) = query.category {
        select = select.filter(invoice::Column::Category.eq(category));
    }

    let invoices = select
        .order_by_desc(invoice::Column::IssueDate)
        .order_by_asc(invoice::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve invoices", e))?;

    debug!("Retrieved {} invoices", invoices.len());
    let today = Local::now().date_naive();
    Ok(invoices
        .into_iter()
        .map(|m| InvoiceResponse::from_model(m, today))
        .collect())
}

/// Register a supplier invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    tag = "invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created successfully", body = ApiResponse<InvoiceResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_invoice(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateInvoiceRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<InvoiceResponse>>)> {
    user.require(Action::Create)?;
    check_invoice(
        Some(request.amount),
        request.exchange_rate,
        Some(request.issue_date),
        request.due_date,
    )?;
    let status = match request.status.as_deref() {
        Some(s) => parse_enum::<InvoiceStatus>("status", s)?,
        None => InvoiceStatus::Pending,
    };
    let project = ensure_project(&state.db, request.project_id).await?;
    let currency = match request.currency.as_deref() {
        Some(code) => validate_currency(code)?,
        None => project.currency.clone(),
    };

    let now = Utc::now().naive_utc();
    let new_invoice = invoice::ActiveModel {
        project_id: Set(project.id),
        invoice_number: Set(request.invoice_number),
        supplier: Set(request.supplier),
        amount: Set(request.amount),
        currency: Set(currency),
        exchange_rate: Set(request.exchange_rate.unwrap_or(Decimal::ONE)),
        issue_date: Set(request.issue_date),
        due_date: Set(request.due_date),
        status: Set(status),
        category: Set(request.category),
        description: Set(request.description),
        file_url: Set(request.file_url),
        created_by_id: Set(Some(user.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_invoice
        .insert(&state.db)
        .await
        .map_err(|e| database_error("Failed to create invoice", e))?;
    invalidate_project_reports(&state, created.project_id).await;

    info!("Invoice {} ({}) created", created.id, created.invoice_number);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(InvoiceResponse::from(created), "Invoice created successfully")),
    ))
}

/// List invoices
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "invoices",
    params(InvoiceQuery),
    responses(
        (status = 200, description = "Invoices retrieved successfully", body = ApiResponse<Vec<InvoiceResponse>>),
        (status = 400, description = "Invalid status filter", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_invoices(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<InvoiceQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<InvoiceResponse>>>> {
    user.require(Action::View)?;
    let invoices = list_invoices(&state, query).await?;
    Ok(Json(ApiResponse::new(invoices, "Invoices retrieved successfully")))
}

/// List the invoices of one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/invoices",
    tag = "invoices",
    params(("project_id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Invoices retrieved successfully", body = ApiResponse<Vec<InvoiceResponse>>),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_project_invoices(
    user: CurrentUser,
    Path(project_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<InvoiceResponse>>>> {
    user.require(Action::View)?;
    super::ensure_project_found(&state, project_id).await?;
    let query = InvoiceQuery {
        project_id: Some(project_id),
        limit: Some(1000),
        ..Default::default()
    };
    let invoices = list_invoices(&state, query).await?;
    Ok(Json(ApiResponse::new(invoices, "Invoices retrieved successfully")))
}

/// Get an invoice by ID
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{invoice_id}",
    tag = "invoices",
    params(("invoice_id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice retrieved successfully", body = ApiResponse<InvoiceResponse>),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_invoice(
    user: CurrentUser,
    Path(invoice_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<InvoiceResponse>>> {
    user.require(Action::View)?;
    let model = found(
        invoice::Entity::find_by_id(invoice_id).one(&state.db).await,
        "Invoice",
        invoice_id,
    )?;
    Ok(Json(ApiResponse::new(InvoiceResponse::from(model), "Invoice retrieved successfully")))
}

/// Update an invoice
#[utoipa::path(
    put,
    path = "/api/v1/invoices/{invoice_id}",
    tag = "invoices",
    params(("invoice_id" = i32, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice updated successfully", body = ApiResponse<InvoiceResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_invoice(
    user: CurrentUser,
    Path(invoice_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateInvoiceRequest>>,
) -> ApiResult<Json<ApiResponse<InvoiceResponse>>> {
    user.require(Action::Edit)?;

    let existing = found(
        invoice::Entity::find_by_id(invoice_id).one(&state.db).await,
        "Invoice",
        invoice_id,
    )?;
    check_invoice(
        request.amount,
        request.exchange_rate,
        Some(request.issue_date.unwrap_or(existing.issue_date)),
        request.due_date.unwrap_or(existing.due_date),
    )?;

    let mut active: invoice::ActiveModel = existing.into();
    if let Some(invoice_number) = request.invoice_number {
        active.invoice_number = Set(invoice_number);
    }
    if let Some(supplier) = request.supplier {
        active.supplier = Set(supplier);
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
    if let Some(issue_date) = request.issue_date {
        active.issue_date = Set(issue_date);
    }
    if let Some(due_date) = request.due_date {
        active.due_date = Set(due_date);
    }
    if let Some(status) = request.status.as_deref() {
        active.status = Set(parse_enum::<InvoiceStatus>("status", status)?);
    }
    if let Some(category) = request.category {
        active.category = Set(category);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(file_url) = request.file_url {
        active.file_url = Set(Some(file_url));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update invoice", e))?;
    invalidate_project_reports(&state, updated.project_id).await;

    info!("Invoice {} updated", invoice_id);
    Ok(Json(ApiResponse::new(InvoiceResponse::from(updated), "Invoice updated successfully")))
}

/// Delete an invoice
#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{invoice_id}",
    tag = "invoices",
    params(("invoice_id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_invoice(
    user: CurrentUser,
    Path(invoice_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let existing = invoice::Entity::find_by_id(invoice_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load invoice", e))?
        .ok_or_else(|| not_found("Invoice", invoice_id))?;

    invoice::Entity::delete_by_id(invoice_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete invoice", e))?;
    invalidate_project_reports(&state, existing.project_id).await;

    info!("Invoice {} deleted", invoice_id);
    Ok(Json(ApiResponse::new(
        format!("Invoice {} deleted", invoice_id),
        "Invoice deleted successfully",
    )))
}
