//! Error Types for the Inventory API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Mapping from the domain `InventoryError` taxonomy
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inventory_core::{
    EntityType, IdentityError, InventoryError, StorageError, UpstreamError, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    // ========================================================================
    // Validation Errors (400, 413)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Uploaded body exceeds the configured limit
    PayloadTooLarge,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    /// Requested component does not exist
    ComponentNotFound,

    /// Requested component type does not exist
    ComponentTypeNotFound,

    /// Directory does not know the user
    UserNotFound,

    /// Component has no history entries
    InteractionNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Entity is still referenced and cannot be removed
    ReferenceConflict,

    // ========================================================================
    // Server Errors (500, 502, 503, 504)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// An external collaborator (directory, object store, mail) failed
    UpstreamFailure,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,

    /// Operation timed out
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::MissingField => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            ErrorCode::EntityNotFound
            | ErrorCode::ComponentNotFound
            | ErrorCode::ComponentTypeNotFound
            | ErrorCode::UserNotFound
            | ErrorCode::InteractionNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ReferenceConflict => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::UpstreamFailure => StatusCode::BAD_GATEWAY,

            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",

            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::PayloadTooLarge => "Payload too large",

            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::ComponentNotFound => "Component not found",
            ErrorCode::ComponentTypeNotFound => "Component type not found",
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::InteractionNotFound => "No interaction found for this component",

            ErrorCode::ReferenceConflict => {
                "Cannot delete component type; it is referenced by components"
            }

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::UpstreamFailure => "Upstream service failed",
            ErrorCode::ServiceUnavailable => "Service not ready",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
            ErrorCode::Timeout => "Operation timed out",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn payload_too_large(limit_mib: u64) -> Self {
        Self::new(
            ErrorCode::PayloadTooLarge,
            format!("Upload exceeds the {} MiB limit", limit_mib),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityNotFound, message)
    }

    pub fn component_not_found() -> Self {
        Self::from_code(ErrorCode::ComponentNotFound)
    }

    pub fn component_type_not_found() -> Self {
        Self::from_code(ErrorCode::ComponentTypeNotFound)
    }

    pub fn user_not_found() -> Self {
        Self::from_code(ErrorCode::UserNotFound)
    }

    pub fn interaction_not_found() -> Self {
        Self::from_code(ErrorCode::InteractionNotFound)
    }

    pub fn reference_conflict(references: i64) -> Self {
        Self::from_code(ErrorCode::ReferenceConflict)
            .with_details(serde_json::json!({ "references": references }))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamFailure, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity_type, id } => match entity_type {
                EntityType::Component => ApiError::component_not_found(),
                EntityType::ComponentType => ApiError::component_type_not_found(),
                EntityType::User => ApiError::user_not_found(),
                EntityType::InventoryHistory => ApiError::interaction_not_found()
                    .with_details(serde_json::json!({ "componentId": id })),
            },
            StorageError::ReferenceConflict { references, .. } => {
                ApiError::reference_conflict(references)
            }
            StorageError::TransactionFailed { reason } | StorageError::Backend { reason } => {
                tracing::error!(reason = %reason, "Storage failure");
                ApiError::database_error("Database operation failed")
            }
            StorageError::Unavailable { reason } => {
                tracing::error!(reason = %reason, "Storage unavailable");
                if reason.contains("exhausted") {
                    ApiError::connection_pool_exhausted()
                } else {
                    ApiError::service_unavailable("Database unavailable")
                }
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownComponentType { type_id } => {
                ApiError::validation_failed("Invalid type_id")
                    .with_details(serde_json::json!({ "typeId": type_id }))
            }
            ValidationError::InvalidOperationType { value } => {
                ApiError::validation_failed("Invalid operation type")
                    .with_details(serde_json::json!({ "operationType": value }))
            }
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
            other => ApiError::invalid_input(other.to_string()),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UserNotFound { .. } => ApiError::user_not_found(),
            IdentityError::Upstream { reason } => {
                tracing::error!(reason = %reason, "Identity provider failure");
                ApiError::upstream("Identity provider request failed")
            }
            IdentityError::Timeout { timeout_secs } => ApiError::timeout(format!(
                "Identity provider did not answer within {}s",
                timeout_secs
            )),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        tracing::error!(error = %err, "Upstream failure");
        match err {
            UpstreamError::ObjectStore { .. } => ApiError::upstream("Unable to save file"),
            UpstreamError::Mail { .. } => ApiError::upstream("Mail delivery failed"),
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Storage(e) => e.into(),
            InventoryError::Validation(e) => e.into(),
            InventoryError::Identity(e) => e.into(),
            InventoryError::Upstream(e) => e.into(),
            InventoryError::Config(e) => {
                tracing::error!(error = %e, "Configuration error");
                ApiError::internal_error("Server misconfigured")
            }
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ComponentNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ReferenceConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::UpstreamFailure.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::ComponentTypeNotFound).unwrap();
        assert_eq!(json, "\"COMPONENT_TYPE_NOT_FOUND\"");
    }

    #[test]
    fn test_not_found_maps_per_entity() {
        let err: ApiError = InventoryError::from(StorageError::not_found(EntityType::Component, 3)).into();
        assert_eq!(err.code, ErrorCode::ComponentNotFound);
        assert_eq!(err.message, "Component not found");

        let err: ApiError =
            InventoryError::from(StorageError::not_found(EntityType::ComponentType, 3)).into();
        assert_eq!(err.message, "Component type not found");
    }

    #[test]
    fn test_validation_messages() {
        let err: ApiError = ValidationError::UnknownComponentType { type_id: 5 }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid type_id");

        let err: ApiError = ValidationError::InvalidOperationType {
            value: "Borrowed".into(),
        }
        .into();
        assert_eq!(err.message, "Invalid operation type");
    }

    #[test]
    fn test_reference_conflict_carries_count() {
        let err: ApiError = StorageError::ReferenceConflict {
            entity_type: EntityType::ComponentType,
            id: "1".into(),
            referenced_by: EntityType::Component,
            references: 4,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.details, Some(serde_json::json!({ "references": 4 })));
    }

    #[test]
    fn test_identity_errors() {
        let err: ApiError = IdentityError::UserNotFound {
            user_id: "x".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::UserNotFound);

        let err: ApiError = IdentityError::Timeout { timeout_secs: 5 }.into();
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ApiError::component_not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "COMPONENT_NOT_FOUND");
        assert_eq!(json["message"], "Component not found");
        assert!(json.get("details").is_none());
    }
}
