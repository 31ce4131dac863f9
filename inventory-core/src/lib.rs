//! Vinventory Core - Entity Types
//!
//! Pure data structures shared by the storage and API crates: components,
//! component types, the inventory history ledger, the status transition
//! table and the component search model. No I/O happens here.

use chrono::{DateTime, Utc};

mod attributes;
mod entities;
mod enums;
mod error;
mod filter;
mod identity;

pub use attributes::{AttributeKind, AttributeValue, AttributeValues, ComponentAttribute};
pub use entities::{
    Component, ComponentDraft, ComponentType, DirectoryUser, InteractantUser,
    InventoryHistoryEntry, LastInteraction, NewComponentType, NewHistoryEntry,
    REQUIRED_TYPE_ATTRIBUTES,
};
pub use enums::{
    ComponentStatus, ComponentStatusParseError, EntityType, OperationType,
    OperationTypeParseError,
};
pub use error::{
    ConfigError, IdentityError, InventoryError, InventoryResult, StorageError, UpstreamError,
    ValidationError,
};
pub use filter::{ComponentFilter, ComponentQuery, ComponentSort, SortOrder};
pub use identity::{matching_user_ids, IdentityResolver};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Component identifier (serial primary key).
pub type ComponentId = i32;

/// Component type identifier (serial primary key).
pub type ComponentTypeId = i32;

/// Inventory history entry identifier (serial primary key).
pub type HistoryId = i32;

/// Opaque user id issued by the external directory.
pub type UserId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Default look-ahead window for warranty expiry notices, in days.
pub const DEFAULT_WARRANTY_HORIZON_DAYS: i64 = 30;
