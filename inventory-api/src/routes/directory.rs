//! Directory REST API Routes
//!
//! Read-only views of the identity provider's users.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use inventory_core::DirectoryUser;

use crate::error::{ApiError, ApiResult};
use crate::services::InventoryService;
use crate::state::AppState;
use crate::types::PhotoResponse;

/// GET /api/v1/auth/users - List directory users
#[utoipa::path(
    get,
    path = "/api/v1/auth/users",
    tag = "Directory",
    responses(
        (status = 200, description = "All users", body = Vec<DirectoryUser>),
        (status = 502, description = "Directory unavailable", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(State(service): State<InventoryService>) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.list_users().await?))
}

/// GET /api/v1/auth/users/{id} - Get one user
#[utoipa::path(
    get,
    path = "/api/v1/auth/users/{id}",
    tag = "Directory",
    params(("id" = String, Path, description = "Directory user ID")),
    responses(
        (status = 200, description = "User found", body = DirectoryUser),
        (status = 404, description = "User not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(service): State<InventoryService>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.resolve_user(&user_id).await?))
}

/// GET /api/v1/auth/users/{id}/photo - Profile photo as a data URL
#[utoipa::path(
    get,
    path = "/api/v1/auth/users/{id}/photo",
    tag = "Directory",
    params(("id" = String, Path, description = "Directory user ID")),
    responses(
        (status = 200, description = "Data URL, empty when the user has no photo", body = PhotoResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user_photo(
    State(service): State<InventoryService>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let photo_url = service.user_photo_url(&user_id).await?;
    Ok(Json(PhotoResponse { photo_url }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .route("/:id/photo", get(get_user_photo))
}
