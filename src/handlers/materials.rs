use crate::auth::{Action, CurrentUser};
use crate::helpers::cache::invalidate_all_reports;
use crate::helpers::errors::{
    ApiResult, bad_request, database_error, found, insert_error, not_found, validate_currency,
};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::material;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Unique catalog code
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    /// Unit of measure, e.g. "saco" or "m3"
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    pub base_price: Decimal,
    pub currency: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateMaterialRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    pub base_price: Option<Decimal>,
    pub currency: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MaterialResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub unit: String,
    pub base_price: Decimal,
    pub currency: String,
    pub category: String,
}

impl From<material::Model> for MaterialResponse {
    fn from(model: material::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            description: model.description,
            unit: model.unit,
            base_price: model.base_price,
            currency: model.currency,
            category: model.category,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct MaterialQuery {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Matches name, code or description
    pub search: Option<String>,
    pub category: Option<String>,
}

fn check_price(base_price: Option<Decimal>) -> ApiResult<()> {
    if base_price.is_some_and(|p| p.is_sign_negative()) {
        return Err(bad_request("VALIDATION_ERROR", "base_price must not be negative"));
    }
    Ok(())
}

/// Add a material to the catalog
#[utoipa::path(
    post,
    path = "/api/v1/materials",
    tag = "materials",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material created successfully", body = ApiResponse<MaterialResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Material code already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_material(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateMaterialRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MaterialResponse>>)> {
    user.require(Action::Create)?;
    check_price(Some(request.base_price))?;
    let currency = validate_currency(request.currency.as_deref().unwrap_or("USD"))?;

    let new_material = material::ActiveModel {
        name: Set(request.name),
        code: Set(request.code.clone()),
        description: Set(request.description),
        unit: Set(request.unit),
        base_price: Set(request.base_price),
        currency: Set(currency),
        category: Set(request.category),
        ..Default::default()
    };

    let created = new_material.insert(&state.db).await.map_err(|e| {
        insert_error(
            "Failed to create material",
            e,
            "DUPLICATE_MATERIAL_CODE",
            format!("Material code '{}' already exists", request.code),
        )
    })?;

    info!("Material {} ({}) created", created.id, created.code);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(MaterialResponse::from(created), "Material created successfully")),
    ))
}

/// List the material catalog
#[utoipa::path(
    get,
    path = "/api/v1/materials",
    tag = "materials",
    params(MaterialQuery),
    responses(
        (status = 200, description = "Materials retrieved successfully", body = ApiResponse<Vec<MaterialResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn get_materials(
    user: CurrentUser,
    State(state): State<AppState>,
    Valid(Query(query)): Valid<Query<MaterialQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<MaterialResponse>>>> {
    user.require(Action::View)?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(100);

    let mut select = material::Entity::find();
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(material::Column::Name.contains(search))
                .add(material::Column::Code.contains(search))
                .add(material::Column::Description.contains(search)),
        );
    }
    if let Some(category) = query.category {
        select = select.filter(material::Column::Category.eq(category));
    }

    let materials = select
        .order_by_asc(material::Column::Name)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve materials", e))?;

    Ok(Json(ApiResponse::new(
        materials.into_iter().map(MaterialResponse::from).collect(),
        "Materials retrieved successfully",
    )))
}

/// Get a material by ID
#[utoipa::path(
    get,
    path = "/api/v1/materials/{material_id}",
    tag = "materials",
    params(("material_id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material retrieved successfully", body = ApiResponse<MaterialResponse>),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_material(
    user: CurrentUser,
    Path(material_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<MaterialResponse>>> {
    user.require(Action::View)?;
    let model = found(
        material::Entity::find_by_id(material_id).one(&state.db).await,
        "Material",
        material_id,
    )?;
    Ok(Json(ApiResponse::new(MaterialResponse::from(model), "Material retrieved successfully")))
}

/// Update a catalog material
#[utoipa::path(
    put,
    path = "/api/v1/materials/{material_id}",
    tag = "materials",
    params(("material_id" = i32, Path, description = "Material ID")),
    request_body = UpdateMaterialRequest,
    responses(
        (status = 200, description = "Material updated successfully", body = ApiResponse<MaterialResponse>),
        (status = 404, description = "Material not found", body = ErrorResponse),
        (status = 409, description = "Material code already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_material(
    user: CurrentUser,
    Path(material_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateMaterialRequest>>,
) -> ApiResult<Json<ApiResponse<MaterialResponse>>> {
    user.require(Action::Edit)?;
    check_price(request.base_price)?;

    let existing = found(
        material::Entity::find_by_id(material_id).one(&state.db).await,
        "Material",
        material_id,
    )?;
    let mut active: material::ActiveModel = existing.into();

    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(code) = request.code.clone() {
        active.code = Set(code);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(unit) = request.unit {
        active.unit = Set(unit);
    }
    if let Some(base_price) = request.base_price {
        active.base_price = Set(base_price);
    }
    if let Some(currency) = request.currency.as_deref() {
        active.currency = Set(validate_currency(currency)?);
    }
    if let Some(category) = request.category {
        active.category = Set(category);
    }

    let updated = active.update(&state.db).await.map_err(|e| {
        insert_error(
            "Failed to update material",
            e,
            "DUPLICATE_MATERIAL_CODE",
            format!("Material code '{}' already exists", request.code.unwrap_or_default()),
        )
    })?;

    info!("Material {} updated", material_id);
    Ok(Json(ApiResponse::new(MaterialResponse::from(updated), "Material updated successfully")))
}

/// Delete a catalog material together with its stock lines and requests
#[utoipa::path(
    delete,
    path = "/api/v1/materials/{material_id}",
    tag = "materials",
    params(("material_id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not allowed for this role", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_material(
    user: CurrentUser,
    Path(material_id): Path<i32>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    user.require(Action::Delete)?;

    let result = material::Entity::delete_by_id(material_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete material", e))?;
    if result.rows_affected == 0 {
        return Err(not_found("Material", material_id));
    }

    // Stock lines of any project may have gone with it
    invalidate_all_reports(&state);

    info!("Material {} deleted", material_id);
    Ok(Json(ApiResponse::new(
        format!("Material {} deleted", material_id),
        "Material deleted successfully",
    )))
}
