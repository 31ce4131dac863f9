//! Middleware modules for the Inventory API
//!
//! - `auth`: bearer/cookie token verification and the `AuthExtractor`
//!
//! Observability middleware lives in `crate::telemetry::middleware`.

mod auth;

pub use auth::{auth_middleware, AuthExtractor, AuthMiddlewareError, AuthMiddlewareState};
