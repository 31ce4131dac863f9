//! Component Type REST API Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use inventory_core::{ComponentType, ComponentTypeId, NewComponentType};

use crate::error::{ApiError, ApiResult};
use crate::services::InventoryService;
use crate::state::AppState;

/// POST /api/v1/types - Create a component type
///
/// The required attributes are appended to the given list.
#[utoipa::path(
    post,
    path = "/api/v1/types",
    tag = "Types",
    request_body = NewComponentType,
    responses(
        (status = 201, description = "Type created", body = ComponentType),
        (status = 400, description = "Name missing", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_type(
    State(service): State<InventoryService>,
    Json(req): Json<NewComponentType>,
) -> ApiResult<impl IntoResponse> {
    let created = service.create_component_type(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/types - List component types
#[utoipa::path(
    get,
    path = "/api/v1/types",
    tag = "Types",
    responses((status = 200, description = "All types", body = Vec<ComponentType>)),
    security(("bearer_auth" = []))
)]
pub async fn list_types(State(service): State<InventoryService>) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.list_component_types().await?))
}

/// GET /api/v1/types/{id} - Get a component type
#[utoipa::path(
    get,
    path = "/api/v1/types/{id}",
    tag = "Types",
    params(("id" = i32, Path, description = "Component type ID")),
    responses(
        (status = 200, description = "Type found", body = ComponentType),
        (status = 404, description = "Type not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_type(
    State(service): State<InventoryService>,
    Path(id): Path<ComponentTypeId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.get_component_type(id).await?))
}

/// PUT /api/v1/types/{id} - Overwrite name and attributes
#[utoipa::path(
    put,
    path = "/api/v1/types/{id}",
    tag = "Types",
    params(("id" = i32, Path, description = "Component type ID")),
    request_body = NewComponentType,
    responses(
        (status = 200, description = "Type updated", body = ComponentType),
        (status = 404, description = "Type not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_type(
    State(service): State<InventoryService>,
    Path(id): Path<ComponentTypeId>,
    Json(req): Json<NewComponentType>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.update_component_type(id, req).await?))
}

/// DELETE /api/v1/types/{id} - Delete an unreferenced type
#[utoipa::path(
    delete,
    path = "/api/v1/types/{id}",
    tag = "Types",
    params(("id" = i32, Path, description = "Component type ID")),
    responses(
        (status = 204, description = "Type deleted"),
        (status = 404, description = "Type not found", body = ApiError),
        (status = 409, description = "Components still use this type", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_type(
    State(service): State<InventoryService>,
    Path(id): Path<ComponentTypeId>,
) -> ApiResult<StatusCode> {
    service.delete_component_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_types).post(create_type))
        .route("/:id", get(get_type).put(update_type).delete(delete_type))
}
