//! Component REST API Routes
//!
//! Listing with search and sort, creation with the `Added` ledger entry,
//! activation toggles and the per-component history views.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use inventory_core::{ComponentDraft, ComponentId, ComponentQuery};

use crate::error::{ApiError, ApiResult};
use crate::services::InventoryService;
use crate::state::AppState;
use crate::types::{ComponentInput, CreateComponentRequest};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/components - List components
///
/// Recognised query parameters are `search`, `sort`, `order` and any
/// component attribute name as an equality filter.
#[utoipa::path(
    get,
    path = "/api/v1/components",
    tag = "Components",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive match on text fields and on the display name of users in the ledger"),
        ("sort" = Option<String>, Query, description = "Attribute to sort by"),
        ("order" = Option<String>, Query, description = "asc (default) or desc"),
    ),
    responses(
        (status = 200, description = "Matching components", body = Vec<inventory_core::Component>),
        (status = 400, description = "Unknown sort field or malformed filter", body = ApiError),
        (status = 502, description = "Directory lookup failed", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_components(
    State(service): State<InventoryService>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let query = ComponentQuery::from_params(&params).map_err(ApiError::from)?;
    let components = service.list_components(&query).await?;
    Ok(Json(components))
}

/// POST /api/v1/components - Create a component
#[utoipa::path(
    post,
    path = "/api/v1/components",
    tag = "Components",
    request_body = CreateComponentRequest,
    responses(
        (status = 201, description = "Component created", body = inventory_core::Component),
        (status = 400, description = "Unknown component type", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_component(
    State(service): State<InventoryService>,
    Json(req): Json<CreateComponentRequest>,
) -> ApiResult<impl IntoResponse> {
    let draft = ComponentDraft::from(req.component);
    let component = service.create_component(draft, &req.user_id).await?;
    Ok((StatusCode::CREATED, Json(component)))
}

/// GET /api/v1/components/{id} - Get a component
#[utoipa::path(
    get,
    path = "/api/v1/components/{id}",
    tag = "Components",
    params(("id" = i32, Path, description = "Component ID")),
    responses(
        (status = 200, description = "Component found", body = inventory_core::Component),
        (status = 404, description = "Component not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_component(
    State(service): State<InventoryService>,
    Path(id): Path<ComponentId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.get_component(id).await?))
}

/// PUT /api/v1/components/{id} - Overwrite a component's writable fields
#[utoipa::path(
    put,
    path = "/api/v1/components/{id}",
    tag = "Components",
    params(("id" = i32, Path, description = "Component ID")),
    request_body = ComponentInput,
    responses(
        (status = 200, description = "Component updated", body = inventory_core::Component),
        (status = 400, description = "Unknown component type", body = ApiError),
        (status = 404, description = "Component not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_component(
    State(service): State<InventoryService>,
    Path(id): Path<ComponentId>,
    Json(input): Json<ComponentInput>,
) -> ApiResult<impl IntoResponse> {
    let component = service.update_component(id, input.into()).await?;
    Ok(Json(component))
}

/// PUT /api/v1/components/{id}/activate/{user_id}
#[utoipa::path(
    put,
    path = "/api/v1/components/{id}/activate/{user_id}",
    tag = "Components",
    params(
        ("id" = i32, Path, description = "Component ID"),
        ("user_id" = String, Path, description = "Directory id of the acting user"),
    ),
    responses(
        (status = 204, description = "Component is Ready to Use"),
        (status = 404, description = "Component not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn activate_component(
    State(service): State<InventoryService>,
    Path((id, user_id)): Path<(ComponentId, String)>,
) -> ApiResult<StatusCode> {
    service.activate_component(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/components/{id}/deactivate/{user_id}
#[utoipa::path(
    put,
    path = "/api/v1/components/{id}/deactivate/{user_id}",
    tag = "Components",
    params(
        ("id" = i32, Path, description = "Component ID"),
        ("user_id" = String, Path, description = "Directory id of the acting user"),
    ),
    responses(
        (status = 204, description = "Component is Out of Inventory"),
        (status = 404, description = "Component not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn deactivate_component(
    State(service): State<InventoryService>,
    Path((id, user_id)): Path<(ComponentId, String)>,
) -> ApiResult<StatusCode> {
    service.deactivate_component(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/components/{id}/last-interactant
#[utoipa::path(
    get,
    path = "/api/v1/components/{id}/last-interactant",
    tag = "Components",
    params(("id" = i32, Path, description = "Component ID")),
    responses(
        (status = 200, description = "Most recent interaction", body = inventory_core::LastInteraction),
        (status = 404, description = "Component or interaction not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn last_interactant(
    State(service): State<InventoryService>,
    Path(id): Path<ComponentId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.last_interactant(id).await?))
}

/// GET /api/v1/components/{id}/inventory-history
#[utoipa::path(
    get,
    path = "/api/v1/components/{id}/inventory-history",
    tag = "Components",
    params(("id" = i32, Path, description = "Component ID")),
    responses(
        (status = 200, description = "Ledger entries, oldest first", body = Vec<inventory_core::InventoryHistoryEntry>),
        (status = 404, description = "Component not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn component_history(
    State(service): State<InventoryService>,
    Path(id): Path<ComponentId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.component_history(id).await?))
}

/// GET /api/v1/components/{attribute}/uniquevalue
#[utoipa::path(
    get,
    path = "/api/v1/components/{attribute}/uniquevalue",
    tag = "Components",
    params(("attribute" = String, Path, description = "Attribute name, camelCase or snake_case")),
    responses(
        (status = 200, description = "Distinct non-null values, ascending", body = inventory_core::AttributeValues),
        (status = 400, description = "Unknown attribute", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn unique_values(
    State(service): State<InventoryService>,
    Path(attribute): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.attribute_values(&attribute).await?))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Component routes, mounted at `/components`.
///
/// The attribute segment of `uniquevalue` shares the `:id` slot because the
/// router does not allow two parameter names at the same position.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_components).post(create_component))
        .route("/:id", get(get_component).put(update_component))
        .route("/:id/activate/:user_id", put(activate_component))
        .route("/:id/deactivate/:user_id", put(deactivate_component))
        .route("/:id/last-interactant", get(last_interactant))
        .route("/:id/inventory-history", get(component_history))
        .route("/:id/uniquevalue", get(unique_values))
}
