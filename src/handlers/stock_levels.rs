use super::common::{success_response, PaginatedResponse};
use crate::{
    errors::ServiceError, handlers::AppState, services::stock::StockListQuery, ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StockListParams {
    /// Narrow to one warehouse
    pub warehouse_id: Option<Uuid>,
    /// Narrow to one product
    pub product_id: Option<Uuid>,
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

/// List stock levels
#[utoipa::path(
    get,
    path = "/api/v1/stock",
    params(StockListParams),
    responses(
        (status = 200, description = "Stock level page returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn list_stock_levels(
    State(state): State<AppState>,
    Query(params): Query<StockListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let per_page = params.per_page.clamp(1, 100);
    let offset = params.page.saturating_sub(1) * per_page;

    let (levels, total) = state
        .services
        .stock
        .list_stock_levels(StockListQuery {
            warehouse_id: params.warehouse_id,
            product_id: params.product_id,
            limit: Some(per_page),
            offset: Some(offset),
        })
        .await?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(levels, params.page, per_page, total),
    )))
}

/// Get the balance of one product at one warehouse; 0 when no stock row exists
#[utoipa::path(
    get,
    path = "/api/v1/stock/:warehouse_id/:product_id",
    params(
        ("warehouse_id" = Uuid, Path, description = "Warehouse ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Balance returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path((warehouse_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let quantity = state
        .services
        .stock
        .get_balance(warehouse_id, product_id)
        .await?;

    Ok(success_response(ApiResponse::success(json!({
        "warehouse_id": warehouse_id,
        "product_id": product_id,
        "quantity": quantity,
    }))))
}

/// Total quantity of one product across all warehouses
#[utoipa::path(
    get,
    path = "/api/v1/stock/products/:product_id/total",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Total returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_product_total(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let total = state.services.stock.get_product_total(product_id).await?;

    Ok(success_response(ApiResponse::success(json!({
        "product_id": product_id,
        "total": total,
    }))))
}

/// Replay the movement ledger and report balances that disagree with it
#[utoipa::path(
    get,
    path = "/api/v1/stock/audit",
    responses(
        (status = 200, description = "Audit report returned", body = crate::services::stock::StockAuditReport),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn audit_stock(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.stock.audit_balances().await?;
    Ok(success_response(ApiResponse::success(report)))
}
