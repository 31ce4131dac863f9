//! Vinventory API - REST Layer and Warranty Notifier
//!
//! This crate exposes the inventory over an Axum REST API backed by
//! PostgreSQL, verifies Entra ID tokens, resolves users through Microsoft
//! Graph, stores component images in an S3-compatible bucket and runs the
//! warranty expiry notifier.

pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod directory;
pub mod error;
pub mod jobs;
pub mod mail;
mod macros;
pub mod middleware;
pub mod object_store;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod query;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{AuthContext, Claims, JwtVerifier};
pub use config::{ApiConfig, AzureConfig, UploadLimit};
pub use db::{DbClient, DbConfig};
pub use directory::GraphDirectory;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use mail::{MailConfig, MailTransport, SesMailTransport};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use object_store::{ObjectStore, ObjectStoreConfig, S3ObjectStore};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use services::InventoryService;
pub use state::AppState;
pub use types::*;
