//! Enum types for vinventory entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

// ============================================================================
// COMPONENT STATUS
// ============================================================================

/// Coarse lifecycle state of a component.
///
/// Every transition is permitted from every state. The inventory history is
/// the record of what happened; the status only mirrors the latest action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ComponentStatus {
    /// In stock and available for assignment
    #[default]
    #[serde(rename = "Ready to Use")]
    ReadyToUse,
    /// Assigned to a user
    #[serde(rename = "Being Used")]
    BeingUsed,
    /// Retired from circulation
    #[serde(rename = "Out of Inventory")]
    OutOfInventory,
}

impl ComponentStatus {
    pub const ALL: [ComponentStatus; 3] = [
        ComponentStatus::ReadyToUse,
        ComponentStatus::BeingUsed,
        ComponentStatus::OutOfInventory,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ComponentStatus::ReadyToUse => "Ready to Use",
            ComponentStatus::BeingUsed => "Being Used",
            ComponentStatus::OutOfInventory => "Out of Inventory",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ComponentStatusParseError> {
        match s.trim().to_lowercase().as_str() {
            "ready to use" => Ok(ComponentStatus::ReadyToUse),
            "being used" => Ok(ComponentStatus::BeingUsed),
            "out of inventory" => Ok(ComponentStatus::OutOfInventory),
            _ => Err(ComponentStatusParseError(s.to_string())),
        }
    }

    /// Parse an optional client-supplied status, treating blank as unset.
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, ComponentStatusParseError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(ComponentStatus::default()),
            Some(s) => Self::from_db_str(s),
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ComponentStatus {
    type Err = ComponentStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid component status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentStatusParseError(pub String);

impl fmt::Display for ComponentStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid component status: {}", self.0)
    }
}

impl std::error::Error for ComponentStatusParseError {}

impl From<ComponentStatusParseError> for ValidationError {
    fn from(err: ComponentStatusParseError) -> Self {
        ValidationError::InvalidValue {
            field: "status".to_string(),
            reason: err.to_string(),
        }
    }
}

// ============================================================================
// OPERATION TYPE
// ============================================================================

/// Kind of action recorded in the inventory history.
///
/// Stored in Postgres as the `inventory_operation_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum OperationType {
    Added,
    Assigned,
    Returned,
    Activated,
    Deactivated,
}

impl OperationType {
    pub const ALL: [OperationType; 5] = [
        OperationType::Added,
        OperationType::Assigned,
        OperationType::Returned,
        OperationType::Activated,
        OperationType::Deactivated,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            OperationType::Added => "Added",
            OperationType::Assigned => "Assigned",
            OperationType::Returned => "Returned",
            OperationType::Activated => "Activated",
            OperationType::Deactivated => "Deactivated",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, OperationTypeParseError> {
        match s.to_lowercase().as_str() {
            "added" => Ok(OperationType::Added),
            "assigned" => Ok(OperationType::Assigned),
            "returned" => Ok(OperationType::Returned),
            "activated" => Ok(OperationType::Activated),
            "deactivated" => Ok(OperationType::Deactivated),
            _ => Err(OperationTypeParseError(s.to_string())),
        }
    }

    /// Status a component takes on after this operation.
    pub fn resulting_status(&self) -> ComponentStatus {
        match self {
            OperationType::Added | OperationType::Returned | OperationType::Activated => {
                ComponentStatus::ReadyToUse
            }
            OperationType::Assigned => ComponentStatus::BeingUsed,
            OperationType::Deactivated => ComponentStatus::OutOfInventory,
        }
    }

    /// Operations that may be submitted directly to the history ledger.
    ///
    /// Activation and deactivation have their own entry points.
    pub fn ledger_status(&self) -> Result<ComponentStatus, ValidationError> {
        match self {
            OperationType::Added | OperationType::Assigned | OperationType::Returned => {
                Ok(self.resulting_status())
            }
            other => Err(ValidationError::InvalidOperationType {
                value: other.as_db_str().to_string(),
            }),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for OperationType {
    type Err = OperationTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid operation type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTypeParseError(pub String);

impl fmt::Display for OperationTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid operation type: {}", self.0)
    }
}

impl std::error::Error for OperationTypeParseError {}

impl From<OperationTypeParseError> for ValidationError {
    fn from(err: OperationTypeParseError) -> Self {
        ValidationError::InvalidOperationType { value: err.0 }
    }
}

// ============================================================================
// ENTITY TYPE
// ============================================================================

/// Entity type discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    ComponentType,
    Component,
    InventoryHistory,
    User,
}

impl EntityType {
    /// Human readable label, as used in client-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::ComponentType => "Component type",
            EntityType::Component => "Component",
            EntityType::InventoryHistory => "Inventory history entry",
            EntityType::User => "User",
        }
    }
}
