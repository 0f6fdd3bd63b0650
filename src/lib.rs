//! StockTrack API Library
//!
//! Warehouse inventory tracking: a product/warehouse catalog, per-warehouse
//! stock balances and an append-only ledger of stock movements, served over
//! HTTP with role-based access control.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod rate_limiter;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::permissions::consts as perm;
use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// All `/api/v1` routes, permission-gated per router group.
pub fn api_v1_routes() -> Router<AppState> {
    // Catalog: everyone authenticated may read, only admins may change it
    let catalog_read = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/warehouses", get(handlers::warehouses::list_warehouses))
        .route("/warehouses/:id", get(handlers::warehouses::get_warehouse))
        .with_permission(perm::CATALOG_READ);

    let catalog_manage = Router::new()
        .route(
            "/products",
            axum::routing::post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            axum::routing::put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/warehouses",
            axum::routing::post(handlers::warehouses::create_warehouse),
        )
        .route(
            "/warehouses/:id",
            axum::routing::put(handlers::warehouses::update_warehouse)
                .delete(handlers::warehouses::delete_warehouse),
        )
        .with_permission(perm::CATALOG_MANAGE);

    // Stock balances: read for everyone, audit for admins only
    let stock_read = Router::new()
        .route("/stock", get(handlers::stock_levels::list_stock_levels))
        .route(
            "/stock/products/:product_id/total",
            get(handlers::stock_levels::get_product_total),
        )
        .route(
            "/stock/:warehouse_id/:product_id",
            get(handlers::stock_levels::get_balance),
        )
        .with_permission(perm::STOCK_READ);

    let stock_audit = Router::new()
        .route("/stock/audit", get(handlers::stock_levels::audit_stock))
        .with_role("admin");

    // Movement ledger: managers and admins may record, everyone may read
    let movements_read = Router::new()
        .route("/movements", get(handlers::movements::list_movements))
        .route("/movements/:id", get(handlers::movements::get_movement))
        .with_permission(perm::MOVEMENTS_READ);

    let movements_write = Router::new()
        .route(
            "/movements",
            axum::routing::post(handlers::movements::record_movement),
        )
        .with_permission(perm::STOCK_MOVE);

    // User administration
    let users_admin = Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/users/:id", get(handlers::users::get_user))
        .with_permission(perm::USERS_MANAGE);

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Catalog API
        .merge(catalog_read)
        .merge(catalog_manage)
        // Stock API
        .merge(stock_audit)
        .merge(stock_read)
        // Movements API
        .merge(movements_read)
        .merge(movements_write)
        // Users API
        .merge(users_admin)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "stocktrack-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

/// Root endpoint pointing at the interesting places
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "stocktrack-api",
        "version": env!("CARGO_PKG_VERSION"),
        "api": "/api/v1",
        "docs": "/swagger-ui",
    }))
}
