//! Inventory History REST API Routes
//!
//! Appending to the ledger drives the component status; reads return
//! entries oldest first.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use inventory_core::InventoryHistoryEntry;

use crate::error::{ApiError, ApiResult};
use crate::services::InventoryService;
use crate::state::AppState;
use crate::types::RecordHistoryRequest;

/// POST /api/v1/inventory-history - Record an operation
#[utoipa::path(
    post,
    path = "/api/v1/inventory-history",
    tag = "History",
    request_body = RecordHistoryRequest,
    responses(
        (status = 201, description = "Entry appended and status updated", body = InventoryHistoryEntry),
        (status = 400, description = "Operation type not accepted by the ledger", body = ApiError),
        (status = 404, description = "Component or user not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn record_history(
    State(service): State<InventoryService>,
    Json(req): Json<RecordHistoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let entry = service
        .record_history(req.component_id, &req.user_id, &req.operation_type)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/v1/users/{id}/inventory-history - Entries recorded for one user
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/inventory-history",
    tag = "History",
    params(("id" = String, Path, description = "Directory user ID")),
    responses(
        (status = 200, description = "Ledger entries, oldest first", body = Vec<InventoryHistoryEntry>),
        (status = 404, description = "User not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_history(
    State(service): State<InventoryService>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.user_history(&user_id).await?))
}

/// History routes. Paths are absolute below `/api/v1`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/inventory-history", post(record_history))
        .route("/users/:id/inventory-history", get(user_history))
}
