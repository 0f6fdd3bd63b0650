use super::common::{created_response, success_response, PaginatedResponse};
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    handlers::AppState,
    services::movements::{MovementListQuery, RecordMovementInput},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "product_id": "550e8400-e29b-41d4-a716-446655440000",
    "movement_type": "TRANSFER",
    "quantity": 40,
    "source_warehouse_id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
    "destination_warehouse_id": "16fd2706-8baf-433b-82eb-8c7fada847da",
    "reference": "PO-42"
}))]
pub struct RecordMovementRequest {
    /// Product being moved
    pub product_id: Uuid,

    /// IN, OUT or TRANSFER
    #[schema(example = "IN")]
    pub movement_type: String,

    /// Units moved; must be positive
    #[schema(example = 40)]
    pub quantity: i32,

    /// Required for OUT and TRANSFER; empty string counts as absent
    pub source_warehouse_id: Option<String>,

    /// Required for IN and TRANSFER; empty string counts as absent
    pub destination_warehouse_id: Option<String>,

    /// Free-form reference, e.g. an order number
    pub reference: Option<String>,

    /// Free-form note
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MovementListParams {
    /// Narrow to one product
    pub product_id: Option<Uuid>,
    /// Matches either the source or the destination side
    pub warehouse_id: Option<Uuid>,
    /// IN, OUT or TRANSFER
    pub movement_type: Option<String>,
    /// Only movements recorded at or after this instant
    pub created_after: Option<DateTime<Utc>>,
    /// Only movements recorded at or before this instant
    pub created_before: Option<DateTime<Utc>>,
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

/// Record a stock movement
#[utoipa::path(
    post,
    path = "/api/v1/movements",
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or warehouse not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: AuthenticatedUser,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement = state
        .services
        .movements
        .record_movement(
            &current_user,
            RecordMovementInput {
                product_id: payload.product_id,
                movement_type: payload.movement_type,
                quantity: payload.quantity,
                source_warehouse_id: payload.source_warehouse_id,
                destination_warehouse_id: payload.destination_warehouse_id,
                reference: payload.reference,
                description: payload.description,
            },
        )
        .await?;

    Ok(created_response(ApiResponse::success(movement)))
}

/// Get one ledger entry
#[utoipa::path(
    get,
    path = "/api/v1/movements/:id",
    params(("id" = Uuid, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn get_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement = state.services.movements.get_movement(movement_id).await?;
    Ok(success_response(ApiResponse::success(movement)))
}

/// List ledger entries, newest first
#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(MovementListParams),
    responses(
        (status = 200, description = "Movement page returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let per_page = params.per_page.clamp(1, 100);
    let offset = params.page.saturating_sub(1) * per_page;

    let (movements, total) = state
        .services
        .movements
        .list_movements(MovementListQuery {
            product_id: params.product_id,
            warehouse_id: params.warehouse_id,
            movement_type: params.movement_type,
            created_after: params.created_after,
            created_before: params.created_before,
            limit: Some(per_page),
            offset: Some(offset),
        })
        .await?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(movements, params.page, per_page, total),
    )))
}
