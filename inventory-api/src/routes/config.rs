//! Public client configuration route.

use axum::{extract::State, routing::get, Json, Router};

use crate::state::AppState;
use crate::types::PublicAuthConfig;

/// GET /api/v1/config - Tenant and client ids for the sign-in flow
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "Config",
    responses((status = 200, description = "Public identifiers", body = PublicAuthConfig))
)]
pub async fn get_config(State(config): State<PublicAuthConfig>) -> Json<PublicAuthConfig> {
    Json(config)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(get_config))
}
