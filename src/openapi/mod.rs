use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StockTrack API",
        version = "1.0.0",
        description = r#"
# StockTrack Warehouse Inventory API

Tracks products, warehouses, per-warehouse stock balances and an append-only
ledger of stock movements (IN, OUT, TRANSFER).

## Authentication

All API endpoints except `/auth/*`, `/api/v1/status` and `/api/v1/health`
require a JWT in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

Three roles exist: `viewer` (read only), `manager` (reads plus stock
movements) and `admin` (everything, including catalog and user management).

## Rate Limiting

API requests are rate-limited per client. Check the response headers:
- `X-RateLimit-Limit`: Maximum requests per window
- `X-RateLimit-Remaining`: Remaining requests in current window
- `X-RateLimit-Reset`: Time when the rate limit resets

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "products", description = "Product catalog endpoints"),
        (name = "warehouses", description = "Warehouse catalog endpoints"),
        (name = "stock", description = "Stock balance endpoints"),
        (name = "movements", description = "Stock movement ledger endpoints"),
        (name = "users", description = "User administration endpoints")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        // Warehouses
        crate::handlers::warehouses::list_warehouses,
        crate::handlers::warehouses::get_warehouse,
        crate::handlers::warehouses::create_warehouse,
        crate::handlers::warehouses::update_warehouse,
        crate::handlers::warehouses::delete_warehouse,

        // Stock
        crate::handlers::stock_levels::list_stock_levels,
        crate::handlers::stock_levels::get_balance,
        crate::handlers::stock_levels::get_product_total,
        crate::handlers::stock_levels::audit_stock,

        // Movements
        crate::handlers::movements::record_movement,
        crate::handlers::movements::get_movement,
        crate::handlers::movements::list_movements,

        // Users
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::list_users,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Catalog types
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::warehouses::CreateWarehouseRequest,
            crate::handlers::warehouses::UpdateWarehouseRequest,

            // Movement types
            crate::handlers::movements::RecordMovementRequest,

            // Stock types
            crate::services::stock::StockAuditReport,
            crate::services::stock::StockAuditMismatch,

            // User types
            crate::handlers::users::CreateUserRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
