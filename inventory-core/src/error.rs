//! Error types for vinventory operations

use crate::EntityType;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("{entity_type:?} {id} is still referenced by {references} {referenced_by:?} record(s)")]
    ReferenceConflict {
        entity_type: EntityType,
        id: String,
        referenced_by: EntityType,
        references: i64,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage backend error: {reason}")]
    Backend { reason: String },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StorageError {
    pub fn not_found(entity_type: EntityType, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid type_id: {type_id}")]
    UnknownComponentType { type_id: i32 },

    #[error("Invalid operation type: {value}")]
    InvalidOperationType { value: String },

    #[error("Unknown component attribute: {name}")]
    UnknownAttribute { name: String },
}

/// Identity directory errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Identity provider request failed: {reason}")]
    Upstream { reason: String },

    #[error("Identity provider did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Failures of external collaborators other than the directory.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Object store operation {operation} failed: {reason}")]
    ObjectStore { operation: String, reason: String },

    #[error("Mail transport failed: {reason}")]
    Mail { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all vinventory errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for vinventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::not_found(EntityType::Component, 42);
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Component"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_storage_error_display_reference_conflict() {
        let err = StorageError::ReferenceConflict {
            entity_type: EntityType::ComponentType,
            id: "7".to_string(),
            referenced_by: EntityType::Component,
            references: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("ComponentType 7"));
        assert!(msg.contains("3 Component"));
    }

    #[test]
    fn test_validation_error_display_unknown_type() {
        let err = ValidationError::UnknownComponentType { type_id: 9 };
        assert_eq!(format!("{}", err), "Invalid type_id: 9");
    }

    #[test]
    fn test_identity_error_display_timeout() {
        let err = IdentityError::Timeout { timeout_secs: 10 };
        assert!(format!("{}", err).contains("10s"));
    }

    #[test]
    fn test_inventory_error_from_variants() {
        let storage = InventoryError::from(StorageError::TransactionFailed {
            reason: "aborted".to_string(),
        });
        assert!(matches!(storage, InventoryError::Storage(_)));

        let validation = InventoryError::from(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
        assert!(matches!(validation, InventoryError::Validation(_)));

        let identity = InventoryError::from(IdentityError::UserNotFound {
            user_id: "u1".to_string(),
        });
        assert!(matches!(identity, InventoryError::Identity(_)));

        let upstream = InventoryError::from(UpstreamError::Mail {
            reason: "throttled".to_string(),
        });
        assert!(matches!(upstream, InventoryError::Upstream(_)));

        let config = InventoryError::from(ConfigError::MissingRequired {
            field: "AZURE_TENANT_ID".to_string(),
        });
        assert!(matches!(config, InventoryError::Config(_)));
    }
}
