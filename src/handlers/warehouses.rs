use super::common::{
    created_response, no_content_response, success_response, validate_input, PaginatedResponse,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    handlers::AppState,
    services::warehouses::{CreateWarehouseInput, UpdateWarehouseInput, WarehouseListQuery},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Central DC",
    "location": "12 Dock Road, Rotterdam"
}))]
pub struct CreateWarehouseRequest {
    /// Warehouse name, unique among live warehouses
    #[validate(length(
        min = 1,
        max = 255,
        message = "Warehouse name must be between 1 and 255 characters"
    ))]
    #[schema(example = "Central DC")]
    pub name: String,

    /// Address or site description
    #[validate(length(max = 500, message = "Location cannot exceed 500 characters"))]
    pub location: Option<String>,

    /// Whether the warehouse starts active (defaults to true)
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehouseRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Warehouse name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Location cannot exceed 500 characters"))]
    pub location: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct WarehouseListParams {
    /// Substring match on name
    pub search: Option<String>,
    /// Include soft-deleted rows (admin only)
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}
fn default_per_page() -> u64 {
    20
}

/// List warehouses
#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    params(WarehouseListParams),
    responses(
        (status = 200, description = "Warehouse page returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    current_user: AuthenticatedUser,
    Query(params): Query<WarehouseListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    if params.include_deleted && !current_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only admins may list deleted warehouses".into(),
        ));
    }

    let per_page = params.per_page.clamp(1, 100);
    let offset = params.page.saturating_sub(1) * per_page;

    let (warehouses, total) = state
        .services
        .warehouses
        .list_warehouses(WarehouseListQuery {
            search: params.search,
            include_deleted: params.include_deleted,
            limit: Some(per_page),
            offset: Some(offset),
        })
        .await?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(warehouses, params.page, per_page, total),
    )))
}

/// Get a warehouse by ID
#[utoipa::path(
    get,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse = state.services.warehouses.get_warehouse(warehouse_id).await?;
    Ok(success_response(ApiResponse::success(warehouse)))
}

/// Create a warehouse
#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    request_body = CreateWarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let warehouse = state
        .services
        .warehouses
        .create_warehouse(CreateWarehouseInput {
            name: payload.name,
            location: payload.location,
            is_active: payload.is_active,
        })
        .await?;

    Ok(created_response(ApiResponse::success(warehouse)))
}

/// Update a warehouse
#[utoipa::path(
    put,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = UpdateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
    Json(payload): Json<UpdateWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let warehouse = state
        .services
        .warehouses
        .update_warehouse(
            warehouse_id,
            UpdateWarehouseInput {
                name: payload.name,
                location: payload.location,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(success_response(ApiResponse::success(warehouse)))
}

/// Soft-delete a warehouse
#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 204, description = "Warehouse deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Warehouse still holds stock", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .warehouses
        .delete_warehouse(warehouse_id)
        .await?;
    Ok(no_content_response())
}
