mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;
use stocktrack_api::services::users::CreateUserInput;

async fn seed_user(app: &TestApp, email: &str, password: &str, role: &str) {
    app.state
        .services
        .users
        .create_user(CreateUserInput {
            email: email.to_string(),
            name: "Integration User".to_string(),
            password: password.to_string(),
            role: role.to_string(),
        })
        .await
        .expect("seed user for tests");
}

#[tokio::test]
async fn login_and_refresh_flow() {
    let app = TestApp::new().await;
    seed_user(&app, "manager@example.com", "orchard-gate-42-alpha", "manager").await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "manager@example.com",
                "password": "orchard-gate-42-alpha",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let access_token = body["access_token"].as_str().expect("access token").to_string();
    let refresh_token = body["refresh_token"].as_str().expect("refresh token").to_string();
    assert_eq!(body["token_type"], json!("Bearer"));

    // The issued token works against the API
    let response = app
        .request(Method::GET, "/api/v1/products", None, Some(&access_token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // And the refresh token mints a fresh pair
    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh_token })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["access_token"].as_str().is_some());

    // A used refresh token is retired
    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh_token })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    seed_user(&app, "viewer@example.com", "orchard-gate-42-alpha", "viewer").await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "viewer@example.com",
                "password": "not-the-password",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_requires_a_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/products", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_and_health_are_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn roles_gate_the_api_surface() {
    let app = TestApp::new().await;
    let viewer_token = app.token_for("viewer");
    let manager_token = app.token_for("manager");

    // Viewers read the catalog but cannot change it
    let response = app
        .request(Method::GET, "/api/v1/warehouses", None, Some(&viewer_token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "GATE-1", "name": "Gate" })),
            Some(&viewer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Managers move stock but catalog management stays admin-only
    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "GATE-2", "name": "Gate" })),
            Some(&manager_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({ "name": "Admin Only" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::new().await;
    let manager_token = app.token_for("manager");

    let payload = json!({
        "email": "new.user@example.com",
        "name": "New User",
        "password": "orchard-gate-42-alpha",
        "role": "viewer",
    });

    let response = app
        .request(
            Method::POST,
            "/api/v1/users",
            Some(payload.clone()),
            Some(&manager_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_authenticated(Method::POST, "/api/v1/users", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    // Hashes never leave the server
    assert!(body["data"].get("password_hash").is_none());
}
