//! OpenAPI Specification for the Vinventory API
//!
//! Generated with utoipa from the route annotations and the schema derives
//! on the wire types.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{component_types, components, config, directory, health, history, images};
use crate::types::*;

use inventory_core::{
    AttributeValues, Component, ComponentStatus, ComponentType, DirectoryUser, InteractantUser,
    InventoryHistoryEntry, LastInteraction, NewComponentType, OperationType,
};

/// OpenAPI document for the Vinventory API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vinventory API",
        version = "0.1.0",
        description = "Equipment inventory: components, component types, the inventory history ledger and the warranty notifier",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local Development")
    ),
    tags(
        (name = "Components", description = "Tracked equipment and its lifecycle"),
        (name = "Images", description = "Component photos in object storage"),
        (name = "Types", description = "Component type schemas"),
        (name = "History", description = "Inventory history ledger"),
        (name = "Directory", description = "Identity provider users"),
        (name = "Config", description = "Public client configuration"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        // === Component Routes ===
        components::list_components,
        components::create_component,
        components::get_component,
        components::update_component,
        components::activate_component,
        components::deactivate_component,
        components::last_interactant,
        components::component_history,
        components::unique_values,

        // === Image Routes ===
        images::upload_image,
        images::list_images,

        // === Type Routes ===
        component_types::create_type,
        component_types::list_types,
        component_types::get_type,
        component_types::update_type,
        component_types::delete_type,

        // === History Routes ===
        history::record_history,
        history::user_history,

        // === Directory Routes ===
        directory::list_users,
        directory::get_user,
        directory::get_user_photo,

        // === Config / Health / Metrics ===
        config::get_config,
        health::ping,
        health::liveness,
        health::readiness,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(
        schemas(
            // === Error Types ===
            ApiError, ErrorCode,

            // === Request/Response Types ===
            ComponentInput, CreateComponentRequest, ImageListResponse, ImageUploadResponse,
            RecordHistoryRequest, PhotoResponse, PublicAuthConfig,
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth,

            // === Core Domain Types (from inventory-core) ===
            Component, ComponentStatus, ComponentType, NewComponentType, OperationType,
            InventoryHistoryEntry, DirectoryUser, InteractantUser, LastInteraction,
            AttributeValues
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by `security(("bearer_auth" = []))`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Entra ID token issued for this application"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
