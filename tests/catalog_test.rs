mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn product_crud_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "WIDGET-100",
                "name": "Widget",
                "description": "A widget",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let product_id = body["data"]["id"].as_str().expect("product id").to_string();
    assert_eq!(body["data"]["sku"], json!("WIDGET-100"));

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/products/{}", product_id),
            Some(json!({ "name": "Widget Mk2" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], json!("Widget Mk2"));
    // SKU is immutable and survives the update untouched
    assert_eq!(body["data"]["sku"], json!("WIDGET-100"));

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/products/{}", product_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/products/{}", product_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sku_stays_unique_even_after_soft_delete() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-200").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "WIDGET-200", "name": "Duplicate" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/products/{}", product.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The SKU remains taken by the soft-deleted row
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "WIDGET-200", "name": "Duplicate" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn product_with_stock_cannot_be_deleted() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-300").await;
    let warehouse = app.seed_warehouse("Main").await;
    app.seed_stock(warehouse.id, product.id, 5).await;

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/products/{}", product.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/products/{}", product.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn warehouse_with_stock_cannot_be_deleted() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-400").await;
    let warehouse = app.seed_warehouse("Main").await;
    app.seed_stock(warehouse.id, product.id, 5).await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/warehouses/{}", warehouse.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn warehouse_name_is_unique_among_live_rows_only() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("North").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({ "name": "North" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/warehouses/{}", warehouse.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Unlike SKUs, a soft-deleted warehouse releases its name
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({ "name": "North" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn product_search_matches_name_and_sku() {
    let app = TestApp::new().await;
    app.seed_product("BOLT-M8").await;
    app.seed_product("NUT-M8").await;
    app.seed_product("SCREW-10").await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products?search=M8", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], json!(2));
}

#[tokio::test]
async fn listing_deleted_products_requires_admin() {
    let app = TestApp::new().await;
    let viewer_token = app.token_for("viewer");

    let response = app
        .request(
            Method::GET,
            "/api/v1/products?include_deleted=true",
            None,
            Some(&viewer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products?include_deleted=true", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deleted_products_appear_only_when_requested() {
    let app = TestApp::new().await;
    let kept = app.seed_product("KEEP-1").await;
    let dropped = app.seed_product("DROP-1").await;

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/products/{}", dropped.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], json!(1));
    assert_eq!(body["data"]["data"][0]["id"], json!(kept.id));

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products?include_deleted=true", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], json!(2));
}

#[tokio::test]
async fn blank_catalog_input_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "   ", "name": "Widget" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({ "name": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
