//! Object storage for component images.
//!
//! Images live under `{component_id}/` in a single bucket. The S3 client is
//! built once at startup and injected through router state.

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use inventory_core::{ConfigError, UpstreamError};
use s3::config::{Credentials, Region};
use s3::presigning::PresigningConfig;
use s3::primitives::ByteStream;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::constants::DEFAULT_BUCKET;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// MinIO / S3 connection settings.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Host and optional port, without scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: SecretString,
    pub use_ssl: bool,
    pub bucket: String,
}

impl ObjectStoreConfig {
    /// Load from `MINIO_ENDPOINT`, `MINIO_ACCESS_KEY`, `MINIO_SECRET_KEY`,
    /// `MINIO_USE_SSL` (default true) and `MINIO_BUCKET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: key.to_string(),
                })
        };
        Ok(Self {
            endpoint: required("MINIO_ENDPOINT")?,
            access_key: required("MINIO_ACCESS_KEY")?,
            secret_key: SecretString::from(required("MINIO_SECRET_KEY")?),
            use_ssl: std::env::var("MINIO_USE_SSL")
                .ok()
                .map(|s| !s.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            bucket: std::env::var("MINIO_BUCKET")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        })
    }

    /// Endpoint URL with the scheme implied by `use_ssl`.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            return self.endpoint.clone();
        }
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint)
    }
}

/// Key for an uploaded image: `{component_id}/{unix_seconds}_{filename}`.
pub fn image_key(component_id: i32, unix_seconds: i64, filename: &str) -> String {
    let name: String = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    format!("{}/{}_{}", component_id, unix_seconds, name)
}

/// Prefix under which one component's images are stored.
pub fn image_prefix(component_id: i32) -> String {
    format!("{}/", component_id)
}

// ============================================================================
// OBJECT STORE TRAIT
// ============================================================================

/// Minimal object store surface used by the image routes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), UpstreamError>;

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, UpstreamError>;

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, UpstreamError>;
}

fn store_err(operation: &str, err: impl std::fmt::Display) -> UpstreamError {
    UpstreamError::ObjectStore {
        operation: operation.to_string(),
        reason: err.to_string(),
    }
}

// ============================================================================
// S3 IMPLEMENTATION
// ============================================================================

/// S3-compatible store (MinIO in deployment).
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    inner: s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(inner: s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            inner,
            bucket: bucket.into(),
        }
    }

    /// Build a path-style client against the configured endpoint with
    /// static credentials.
    pub async fn from_config(config: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.expose_secret().to_string(),
            None,
            None,
            "static",
        );
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        tracing::info!(endpoint = %config.endpoint_url(), bucket = %config.bucket, "Object store configured");
        Self::new(s3::Client::from_conf(s3_config), config.bucket.clone())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), UpstreamError> {
        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| store_err("put_object", s3::error::DisplayErrorContext(e)))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, UpstreamError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let output = self
                .inner
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| store_err("list_objects", s3::error::DisplayErrorContext(e)))?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }
        Ok(keys)
    }

    #[tracing::instrument(skip(self))]
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, UpstreamError> {
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| store_err("presign", e))?;
        let request = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| store_err("presign", s3::error::DisplayErrorContext(e)))?;
        Ok(request.uri().to_string())
    }
}
