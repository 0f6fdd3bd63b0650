use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    middleware, Router,
};
use chrono::Utc;
use serde_json::Value;
use stocktrack_api::{
    auth::{AuthService, AuthUser, Claims, RbacService},
    config::AppConfig,
    db,
    entities::{product, warehouse},
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        movements::RecordMovementInput, products::CreateProductInput,
        warehouses::CreateWarehouseInput,
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

const TEST_JWT_SECRET: &str =
    "test_secret_key_for_integration_tests_only_never_use_in_production_0987";

/// Helper harness that spins up the full application state backed by a
/// throwaway SQLite database, one file per test so tests can run in parallel.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    #[allow(dead_code)]
    auth_service: Arc<AuthService>,
    db_file: std::path::PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file =
            std::env::temp_dir().join(format!("stocktrack_test_{}.db", Uuid::new_v4().simple()));
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_cfg = stocktrack_api::auth::AuthConfig::from(&cfg);
        let auth_service = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let token = mint_token(&cfg, "admin");

        let auth_service_for_layer = auth_service.clone();
        let api_router =
            stocktrack_api::api_v1_routes().layer(middleware::from_fn_with_state(
                auth_service_for_layer,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ));

        let router = Router::new()
            .nest("/api/v1", api_router)
            .nest(
                "/auth",
                stocktrack_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .with_state(state.clone());

        Self {
            router,
            state,
            token,
            auth_service,
            db_file,
            _event_task: event_task,
        }
    }

    /// Bearer token for the default admin identity.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Mint a token for an arbitrary role ("viewer", "manager" or "admin").
    #[allow(dead_code)]
    pub fn token_for(&self, role: &str) -> String {
        mint_token(&self.state.config, role)
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin-authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Seed a live product through the service layer.
    #[allow(dead_code)]
    pub async fn seed_product(&self, sku: &str) -> product::Model {
        self.state
            .services
            .products
            .create_product(CreateProductInput {
                sku: sku.to_string(),
                name: format!("Test Product {}", sku),
                description: Some("Seeded for integration tests".to_string()),
                is_active: Some(true),
            })
            .await
            .expect("seed product for tests")
    }

    /// Seed a live warehouse through the service layer.
    #[allow(dead_code)]
    pub async fn seed_warehouse(&self, name: &str) -> warehouse::Model {
        self.state
            .services
            .warehouses
            .create_warehouse(CreateWarehouseInput {
                name: name.to_string(),
                location: Some("Test Street 1".to_string()),
                is_active: Some(true),
            })
            .await
            .expect("seed warehouse for tests")
    }

    /// Put `quantity` units of a product into a warehouse via an IN movement.
    #[allow(dead_code)]
    pub async fn seed_stock(&self, warehouse_id: Uuid, product_id: Uuid, quantity: i32) {
        self.state
            .services
            .movements
            .record_movement(
                &admin_actor(),
                RecordMovementInput {
                    product_id,
                    movement_type: "IN".to_string(),
                    quantity,
                    source_warehouse_id: None,
                    destination_warehouse_id: Some(warehouse_id.to_string()),
                    reference: Some("seed".to_string()),
                    description: None,
                },
            )
            .await
            .expect("seed stock for tests");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_file);
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = self.db_file.as_os_str().to_owned();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(std::path::PathBuf::from(sidecar));
        }
    }
}

/// An admin identity for driving the service layer directly in tests.
#[allow(dead_code)]
pub fn admin_actor() -> AuthUser {
    actor_with_role("admin")
}

/// An identity holding one role, with the permissions that role expands to.
#[allow(dead_code)]
pub fn actor_with_role(role: &str) -> AuthUser {
    let roles = vec![role.to_string()];
    let permissions: Vec<String> = RbacService::new()
        .get_permissions_for_roles(&roles)
        .into_iter()
        .collect();
    AuthUser {
        user_id: Uuid::new_v4().to_string(),
        name: Some("Test User".to_string()),
        email: Some(format!("{}@stocktrack.test", role)),
        roles,
        permissions,
        token_id: Uuid::new_v4().to_string(),
    }
}

fn mint_token(cfg: &AppConfig, role: &str) -> String {
    let roles = vec![role.to_string()];
    let permissions: Vec<String> = RbacService::new()
        .get_permissions_for_roles(&roles)
        .into_iter()
        .collect();

    let now = Utc::now();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        name: Some(format!("Test {}", role)),
        email: Some(format!("{}@stocktrack.test", role)),
        roles,
        permissions,
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        nbf: now.timestamp(),
        iss: cfg.auth_issuer.clone(),
        aud: cfg.auth_audience.clone(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .expect("encode test token")
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is not valid JSON")
}
