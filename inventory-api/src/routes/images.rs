//! Component Image REST API Routes
//!
//! Uploads go to the object store under `{componentId}/{unix_seconds}_{filename}`;
//! listing returns presigned download URLs.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use inventory_core::ComponentId;

use crate::config::UploadLimit;
use crate::constants::{IMAGE_FIELD_NAME, PRESIGNED_URL_TTL_SECS};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::object_store::{image_key, image_prefix, ObjectStore};
use crate::services::InventoryService;
use crate::state::AppState;
use crate::types::{ImageListResponse, ImageUploadResponse};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn multipart_error(err: axum::extract::multipart::MultipartError, limit: UploadLimit) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(limit.mib)
    } else {
        ApiError::new(ErrorCode::InvalidInput, err.body_text())
    }
}

/// POST /api/v1/components/{id}/image - Upload one image
#[utoipa::path(
    post,
    path = "/api/v1/components/{id}/image",
    tag = "Images",
    params(("id" = i32, Path, description = "Component ID")),
    request_body(content_type = "multipart/form-data", description = "Form with an `image` file field"),
    responses(
        (status = 201, description = "Image stored", body = ImageUploadResponse),
        (status = 400, description = "Missing `image` field", body = ApiError),
        (status = 404, description = "Component not found", body = ApiError),
        (status = 413, description = "Upload exceeds the configured limit", body = ApiError),
        (status = 502, description = "Object store failure", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_image(
    State(service): State<InventoryService>,
    State(store): State<Arc<dyn ObjectStore>>,
    State(limit): State<UploadLimit>,
    Path(id): Path<ComponentId>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    service.get_component(id).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(IMAGE_FIELD_NAME) {
            continue;
        }
        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        let key = image_key(id, Utc::now().timestamp(), &filename);
        store.put_object(&key, bytes.to_vec(), &content_type).await?;
        tracing::info!(component_id = id, key = %key, size = bytes.len(), "Image uploaded");
        return Ok((StatusCode::CREATED, Json(ImageUploadResponse { key })));
    }

    Err(ApiError::missing_field(IMAGE_FIELD_NAME))
}

/// GET /api/v1/components/{id}/image - Presigned URLs for every stored image
#[utoipa::path(
    get,
    path = "/api/v1/components/{id}/image",
    tag = "Images",
    params(("id" = i32, Path, description = "Component ID")),
    responses(
        (status = 200, description = "Presigned GET URLs valid for 24 hours", body = ImageListResponse),
        (status = 502, description = "Object store failure", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_images(
    State(store): State<Arc<dyn ObjectStore>>,
    Path(id): Path<ComponentId>,
) -> ApiResult<impl IntoResponse> {
    let ttl = Duration::from_secs(PRESIGNED_URL_TTL_SECS);
    let keys = store.list_objects(&image_prefix(id)).await?;
    let mut images = Vec::with_capacity(keys.len());
    for key in keys {
        images.push(store.presign_get(&key, ttl).await?);
    }
    Ok(Json(ImageListResponse { images }))
}

/// Image routes, mounted next to the component routes.
pub fn create_router(limit: UploadLimit) -> Router<AppState> {
    Router::new().route(
        "/:id/image",
        post(upload_image)
            .get(list_images)
            .layer(DefaultBodyLimit::max(limit.bytes())),
    )
}
