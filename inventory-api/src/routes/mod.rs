//! REST API Routes Module
//!
//! This module contains all Axum route handlers for the Vinventory API.
//! Each submodule implements one resource.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::{ApiConfig, UploadLimit};
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub mod component_types;
pub mod components;
pub mod config;
pub mod directory;
pub mod health;
pub mod history;
pub mod images;

#[cfg(all(feature = "openapi", not(feature = "swagger-ui")))]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

/// Resource routes that sit behind authentication, relative to `/api/v1`.
fn resource_routes(upload_limit: UploadLimit) -> Router<AppState> {
    Router::new()
        .nest(
            "/components",
            components::create_router().merge(images::create_router(upload_limit)),
        )
        .nest("/types", component_types::create_router())
        .nest("/auth/users", directory::create_router())
        .merge(history::create_router())
        .route("/metrics", get(metrics_handler))
}

/// Create the complete API router.
///
/// Everything under `/api/v1` except `/api/v1/config` requires a verified
/// token. Health probes, `/metrics` and the OpenAPI document are public.
pub fn create_api_router(
    state: AppState,
    api_config: &ApiConfig,
    auth_state: AuthMiddlewareState,
) -> Router {
    let protected = resource_routes(state.upload_limit)
        .layer(from_fn_with_state(auth_state, auth_middleware));
    assemble(protected, state, api_config)
}

/// Same routes without the authentication layer.
#[cfg(test)]
pub fn create_api_router_unauthenticated(state: AppState, api_config: &ApiConfig) -> Router {
    let routes = resource_routes(state.upload_limit);
    assemble(routes, state, api_config)
}

fn assemble(resources: Router<AppState>, state: AppState, api_config: &ApiConfig) -> Router {
    let api_v1 = Router::new()
        .merge(resources)
        .nest("/config", config::create_router());

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api/v1", api_v1)
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler));

    // Swagger UI serves /openapi.json itself.
    #[cfg(feature = "swagger-ui")]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/openapi.json", crate::openapi::ApiDoc::openapi()),
        );
    }
    #[cfg(all(feature = "openapi", not(feature = "swagger-ui")))]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    router
        .with_state(state)
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(api_config))
}

/// Build the CORS layer based on configuration.
///
/// With no configured origins every origin is allowed (development mode).
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_keys;
    use crate::object_store::{MockObjectStore, ObjectStore};
    use crate::types::PublicAuthConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use inventory_core::IdentityResolver;
    use inventory_storage::InventoryStore;
    use inventory_test_utils::{
        fixtures::{directory, jane, storage_with_laptop_type},
        InMemoryDirectory, MockStorage,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        storage: MockStorage,
        directory: InMemoryDirectory,
        type_id: i32,
    }

    async fn harness_with(object_store: MockObjectStore) -> Harness {
        let (storage, type_id) = storage_with_laptop_type().await;
        let directory = directory();
        let store: Arc<dyn InventoryStore> = Arc::new(storage.clone());
        let identity: Arc<dyn IdentityResolver> = Arc::new(directory.clone());
        let object_store: Arc<dyn ObjectStore> = Arc::new(object_store);
        let config = ApiConfig::default();
        let state = AppState::new(
            store,
            identity,
            object_store,
            &config,
            PublicAuthConfig {
                tenant_id: "tenant-1".to_string(),
                client_id: test_keys::AUDIENCE.to_string(),
            },
        );
        let app = create_api_router(
            state,
            &config,
            AuthMiddlewareState::new(test_keys::verifier()),
        );
        Harness {
            app,
            storage,
            directory,
            type_id,
        }
    }

    async fn harness() -> Harness {
        harness_with(MockObjectStore::new()).await
    }

    fn authed(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", test_keys::valid_token()),
            );
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn component_body(type_id: i32) -> Value {
        json!({
            "component": {
                "brand": "Dell",
                "model": "Latitude 7440",
                "typeId": type_id,
                "warrantyEndDate": "2031-06-30T00:00:00Z",
                "serialNumber": "DL-1"
            },
            "userId": "u1"
        })
    }

    async fn create_component(h: &Harness) -> i64 {
        let response = send(
            &h.app,
            authed(Method::POST, "/api/v1/components", Some(component_body(h.type_id))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_and_config_are_public() {
        let h = harness().await;
        let ping = send(&h.app, Request::get("/health/ping").body(Body::empty()).unwrap()).await;
        assert_eq!(ping.status(), StatusCode::OK);

        let ready = send(&h.app, Request::get("/health/ready").body(Body::empty()).unwrap()).await;
        assert_eq!(ready.status(), StatusCode::OK);
        assert_eq!(body_json(ready).await["status"], "healthy");

        let config = send(&h.app, Request::get("/api/v1/config").body(Body::empty()).unwrap()).await;
        assert_eq!(config.status(), StatusCode::OK);
        let body = body_json(config).await;
        assert_eq!(body["tenantId"], "tenant-1");
        assert_eq!(body["clientId"], test_keys::AUDIENCE);
    }

    #[tokio::test]
    async fn test_resources_require_token() {
        let h = harness().await;
        let response = send(
            &h.app,
            Request::get("/api/v1/components").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_create_then_get_component() {
        let h = harness().await;
        let id = create_component(&h).await;

        let response = send(&h.app, authed(Method::GET, &format!("/api/v1/components/{}", id), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["brand"], "Dell");
        assert_eq!(body["status"], "Ready to Use");
        assert_eq!(body["emailNotified"], false);
        assert_eq!(h.storage.history_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_with_blank_status_defaults_to_ready() {
        let h = harness().await;
        let mut body = component_body(h.type_id);
        body["component"]["status"] = json!("");
        let response = send(&h.app, authed(Method::POST, "/api/v1/components", Some(body))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["status"], "Ready to Use");
    }

    #[tokio::test]
    async fn test_update_component() {
        let h = harness().await;
        let id = create_component(&h).await;
        h.storage.mark_notified(id as i32).await.unwrap();
        let uri = format!("/api/v1/components/{}", id);

        let mut input = component_body(h.type_id)["component"].clone();
        input["notes"] = json!("new battery");
        let response = send(&h.app, authed(Method::PUT, &uri, Some(input.clone()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["notes"], "new battery");
        assert_eq!(body["emailNotified"], true);

        input["warrantyEndDate"] = json!("2032-06-30T00:00:00Z");
        let response = send(&h.app, authed(Method::PUT, &uri, Some(input.clone()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["emailNotified"], false);

        let response = send(
            &h.app,
            authed(Method::PUT, "/api/v1/components/404", Some(input.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        input["typeId"] = json!(999);
        let response = send(&h.app, authed(Method::PUT, &uri, Some(input))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let stored = h.storage.component_get(id as i32).await.unwrap().unwrap();
        assert_eq!(stored.type_id, h.type_id);
    }

    #[tokio::test]
    async fn test_create_with_unknown_type_is_bad_request() {
        let h = harness().await;
        let response = send(
            &h.app,
            authed(Method::POST, "/api/v1/components", Some(component_body(999))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.storage.component_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_component_is_not_found() {
        let h = harness().await;
        let response = send(&h.app, authed(Method::GET, "/api/v1/components/404", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "Component not found");
    }

    #[tokio::test]
    async fn test_record_history_drives_last_interactant() {
        let h = harness().await;
        let id = create_component(&h).await;

        let response = send(
            &h.app,
            authed(
                Method::POST,
                "/api/v1/inventory-history",
                Some(json!({"componentId": id, "userId": "u2", "operationType": "Assigned"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["userName"], "John Smith");

        let response = send(
            &h.app,
            authed(Method::GET, &format!("/api/v1/components/{}/last-interactant", id), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["componentStatus"], "Being Used");
        assert_eq!(body["lastInteractantUser"]["id"], "u2");

        let history = send(
            &h.app,
            authed(Method::GET, "/api/v1/users/u2/inventory-history", None),
        )
        .await;
        assert_eq!(history.status(), StatusCode::OK);
        assert_eq!(body_json(history).await.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_record_history_rejects_borrowed() {
        let h = harness().await;
        let id = create_component(&h).await;
        let response = send(
            &h.app,
            authed(
                Method::POST,
                "/api/v1/inventory-history",
                Some(json!({"componentId": id, "userId": "u1", "operationType": "Borrowed"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.storage.history_count().await, 1);
    }

    #[tokio::test]
    async fn test_deactivate_and_activate_return_no_content() {
        let h = harness().await;
        let id = create_component(&h).await;

        let response = send(
            &h.app,
            authed(Method::PUT, &format!("/api/v1/components/{}/deactivate/u1", id), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let body = body_json(
            send(&h.app, authed(Method::GET, &format!("/api/v1/components/{}", id), None)).await,
        )
        .await;
        assert_eq!(body["status"], "Out of Inventory");

        h.directory.set_unavailable(true).await;
        let response = send(
            &h.app,
            authed(Method::PUT, &format!("/api/v1/components/{}/activate/u1", id), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(h.storage.history_count().await, 3);
    }

    #[tokio::test]
    async fn test_type_lifecycle_and_delete_conflict() {
        let h = harness().await;
        let response = send(
            &h.app,
            authed(Method::POST, "/api/v1/types", Some(json!({"name": "Monitor", "attributes": ["resolution"]}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let attributes = created["attributes"].as_array().unwrap();
        assert!(attributes.iter().any(|a| a == "serialNumber"));

        create_component(&h).await;
        let response = send(
            &h.app,
            authed(Method::DELETE, &format!("/api/v1/types/{}", h.type_id), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let monitor_id = created["id"].as_i64().unwrap();
        let response = send(
            &h.app,
            authed(Method::DELETE, &format!("/api/v1/types/{}", monitor_id), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_search_and_sort_parameters() {
        let h = harness().await;

        let id = create_component(&h).await;

        // Ready to Use: the user who added it does not count as its holder.
        let response = send(&h.app, authed(Method::GET, "/api/v1/components?search=jane", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(0));

        let response = send(
            &h.app,
            authed(
                Method::POST,
                "/api/v1/inventory-history",
                Some(json!({"componentId": id, "userId": "u1", "operationType": "Assigned"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(&h.app, authed(Method::GET, "/api/v1/components?search=jane", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let found = body_json(response).await;
        assert_eq!(found.as_array().map(Vec::len), Some(1));
        assert_eq!(found[0]["id"].as_i64(), Some(id));

        let response = send(&h.app, authed(Method::GET, "/api/v1/components?search=latitude", None)).await;
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

        let response = send(
            &h.app,
            authed(Method::GET, "/api/v1/components?sort=nonsense", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unique_values_are_typed() {
        let h = harness().await;
        create_component(&h).await;
        let response = send(&h.app, authed(Method::GET, "/api/v1/components/brand/uniquevalue", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!(["Dell"]));

        let response = send(&h.app, authed(Method::GET, "/api/v1/components/owner/uniquevalue", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_directory_routes() {
        let h = harness().await;
        let response = send(&h.app, authed(Method::GET, "/api/v1/auth/users/u1", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], jane().id);

        let response = send(&h.app, authed(Method::GET, "/api/v1/auth/users/ghost", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&h.app, authed(Method::GET, "/api/v1/auth/users/u1/photo", None)).await;
        assert_eq!(body_json(response).await["photoUrl"], "");
    }

    #[tokio::test]
    async fn test_upload_image_stores_object() {
        let mut object_store = MockObjectStore::new();
        object_store
            .expect_put_object()
            .times(1)
            .withf(|key, bytes, content_type| {
                key.starts_with("1/")
                    && key.ends_with("_front.jpg")
                    && bytes.as_slice() == b"jpegdata"
                    && content_type == "image/jpeg"
            })
            .returning(|_, _, _| Ok(()));
        let h = harness_with(object_store).await;
        create_component(&h).await;

        let boundary = "X-INVENTORY-BOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"front.jpg\"\r\nContent-Type: image/jpeg\r\n\r\njpegdata\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::post("/api/v1/components/1/image")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", test_keys::valid_token()),
            )
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        let response = send(&h.app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_list_images_presigns_each_key() {
        let mut object_store = MockObjectStore::new();
        object_store
            .expect_list_objects()
            .withf(|prefix| prefix == "1/")
            .returning(|_| Ok(vec!["1/10_a.jpg".to_string(), "1/20_b.jpg".to_string()]));
        object_store
            .expect_presign_get()
            .times(2)
            .withf(|_, ttl| ttl.as_secs() == 86_400)
            .returning(|key, _| Ok(format!("https://minio/{}?sig", key)));
        let h = harness_with(object_store).await;

        let response = send(&h.app, authed(Method::GET, "/api/v1/components/1/image", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["images"],
            json!(["https://minio/1/10_a.jpg?sig", "https://minio/1/20_b.jpg?sig"])
        );
    }

    #[tokio::test]
    async fn test_metrics_endpoint_is_public() {
        let h = harness().await;
        let response = send(&h.app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unauthenticated_router_skips_auth() {
        let (storage, _) = storage_with_laptop_type().await;
        let config = ApiConfig::default();
        let state = AppState::new(
            Arc::new(storage),
            Arc::new(directory()),
            Arc::new(MockObjectStore::new()),
            &config,
            PublicAuthConfig {
                tenant_id: "t".to_string(),
                client_id: "c".to_string(),
            },
        );
        let app = create_api_router_unauthenticated(state, &config);
        let response = send(&app, Request::get("/api/v1/types").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
