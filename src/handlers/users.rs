use super::common::{created_response, success_response, validate_input, PaginatedResponse};
use crate::{
    errors::ServiceError, handlers::AppState, services::users::CreateUserInput, ApiResponse,
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
    "email": "jordan@example.com",
    "name": "Jordan Doe",
    "password": "a-long-and-private-phrase",
    "role": "manager"
}))]
pub struct CreateUserRequest {
    /// Email address, unique per account
    #[validate(email(message = "Email must be a valid address"))]
    #[schema(example = "jordan@example.com")]
    pub email: String,

    /// Display name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Password, at least 12 characters
    #[validate(length(min = 12, message = "Password must be at least 12 characters"))]
    pub password: String,

    /// viewer, manager or admin
    #[schema(example = "viewer")]
    pub role: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserListParams {
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

/// Create a user account
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .create_user(CreateUserInput {
            email: payload.email,
            name: payload.name,
            password: payload.password,
            role: payload.role,
        })
        .await?;

    Ok(created_response(ApiResponse::success(user)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/:id",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.get_user(user_id).await?;
    Ok(success_response(ApiResponse::success(user)))
}

/// List user accounts
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListParams),
    responses(
        (status = 200, description = "User page returned"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let per_page = params.per_page.clamp(1, 100);
    let offset = params.page.saturating_sub(1) * per_page;

    let (users, total) = state
        .services
        .users
        .list_users(Some(per_page), Some(offset))
        .await?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(users, params.page, per_page, total),
    )))
}
