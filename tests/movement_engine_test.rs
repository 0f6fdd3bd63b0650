mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn in_movement_creates_balance_and_ledger_entry() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-1").await;
    let warehouse = app.seed_warehouse("Main").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "IN",
                "quantity": 100,
                "destination_warehouse_id": warehouse.id,
                "reference": "PO-1001",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["movement_type"], json!("IN"));
    assert_eq!(body["data"]["quantity"], json!(100));

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/stock/{}/{}", warehouse.id, product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["quantity"], json!(100));

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/movements?product_id={}", product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], json!(1));
}

#[tokio::test]
async fn out_exceeding_balance_is_rejected_and_leaves_state_untouched() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-2").await;
    let warehouse = app.seed_warehouse("Main").await;
    app.seed_stock(warehouse.id, product.id, 100).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "OUT",
                "quantity": 150,
                "source_warehouse_id": warehouse.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Balance unchanged, no ledger entry added
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/stock/{}/{}", warehouse.id, product.id),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["quantity"], json!(100));

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/movements?product_id={}", product.id),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], json!(1));
}

#[tokio::test]
async fn transfer_moves_stock_between_warehouses() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-3").await;
    let source = app.seed_warehouse("Source").await;
    let destination = app.seed_warehouse("Destination").await;
    app.seed_stock(source.id, product.id, 100).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "TRANSFER",
                "quantity": 40,
                "source_warehouse_id": source.id,
                "destination_warehouse_id": destination.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/stock/{}/{}", source.id, product.id),
            None,
        )
        .await;
    assert_eq!(body_json(response).await["data"]["quantity"], json!(60));

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/stock/{}/{}", destination.id, product.id),
            None,
        )
        .await;
    assert_eq!(body_json(response).await["data"]["quantity"], json!(40));

    // Product total stays constant across a transfer
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/stock/products/{}/total", product.id),
            None,
        )
        .await;
    assert_eq!(body_json(response).await["data"]["total"], json!(100));
}

#[tokio::test]
async fn transfer_to_same_warehouse_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-4").await;
    let warehouse = app.seed_warehouse("Main").await;
    app.seed_stock(warehouse.id, product.id, 10).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "TRANSFER",
                "quantity": 5,
                "source_warehouse_id": warehouse.id,
                "destination_warehouse_id": warehouse.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Balance and ledger are untouched by the rejection
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/stock/{}/{}", warehouse.id, product.id),
            None,
        )
        .await;
    assert_eq!(body_json(response).await["data"]["quantity"], json!(10));

    let response = app
        .request_authenticated(Method::GET, "/api/v1/movements", None)
        .await;
    assert_eq!(
        body_json(response).await["data"]["pagination"]["total"],
        json!(1)
    );
}

#[tokio::test]
async fn in_without_destination_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-5").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "IN",
                "quantity": 10,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        json!("Invalid input: Destination warehouse is required for IN movement")
    );
}

#[tokio::test]
async fn unknown_movement_type_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-6").await;
    let warehouse = app.seed_warehouse("Main").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "SIDEWAYS",
                "quantity": 10,
                "destination_warehouse_id": warehouse.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn viewer_cannot_record_movements() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-7").await;
    let warehouse = app.seed_warehouse("Main").await;
    let viewer_token = app.token_for("viewer");

    let response = app
        .request(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "IN",
                "quantity": 10,
                "destination_warehouse_id": warehouse.id,
            })),
            Some(&viewer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn manager_can_record_movements() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-8").await;
    let warehouse = app.seed_warehouse("Main").await;
    let manager_token = app.token_for("manager");

    let response = app
        .request(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "IN",
                "quantity": 25,
                "destination_warehouse_id": warehouse.id,
            })),
            Some(&manager_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn movement_against_unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Main").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": uuid::Uuid::new_v4(),
                "movement_type": "IN",
                "quantity": 10,
                "destination_warehouse_id": warehouse.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audit_is_clean_after_a_series_of_movements() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-9").await;
    let source = app.seed_warehouse("Source").await;
    let destination = app.seed_warehouse("Destination").await;

    app.seed_stock(source.id, product.id, 100).await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "TRANSFER",
                "quantity": 30,
                "source_warehouse_id": source.id,
                "destination_warehouse_id": destination.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "product_id": product.id,
                "movement_type": "OUT",
                "quantity": 20,
                "source_warehouse_id": destination.id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/stock/audit", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["movements_replayed"], json!(3));
    assert_eq!(body["data"]["mismatches"], json!([]));
}

#[tokio::test]
async fn audit_requires_the_admin_role() {
    let app = TestApp::new().await;
    let manager_token = app.token_for("manager");

    let response = app
        .request(Method::GET, "/api/v1/stock/audit", None, Some(&manager_token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
