//! Vinventory Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for entity types
//! - An in-memory directory standing in for the identity provider
//! - Fixtures for common scenarios
//! - Assertions on inventory error variants

// Re-export mock storage from its source crate
pub use inventory_storage::{InventoryStore, MockStorage};

// Re-export core types for convenience
pub use inventory_core::{
    Component, ComponentDraft, ComponentStatus, ComponentType, ComponentTypeId, DirectoryUser,
    EntityType, IdentityError, IdentityResolver, InventoryError, InventoryHistoryEntry,
    InventoryResult, NewComponentType, OperationType, StorageError, Timestamp, ValidationError,
};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// IN-MEMORY DIRECTORY
// ============================================================================

/// Directory fake keyed by user id.
///
/// `set_unavailable(true)` makes every call fail as if the provider were
/// down, which drives the tolerant fallback paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: Arc<RwLock<Vec<DirectoryUser>>>,
    photos: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<DirectoryUser>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
            ..Self::default()
        }
    }

    pub async fn add_user(&self, user: DirectoryUser) {
        self.users.write().await.push(user);
    }

    /// Remove a user, as when someone leaves the organisation.
    pub async fn remove_user(&self, user_id: &str) {
        self.users.write().await.retain(|u| u.id != user_id);
    }

    pub async fn set_photo(&self, user_id: &str, bytes: Vec<u8>) {
        self.photos.write().await.insert(user_id.to_string(), bytes);
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    async fn check_available(&self) -> Result<(), IdentityError> {
        if *self.unavailable.read().await {
            return Err(IdentityError::Upstream {
                reason: "directory unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for InMemoryDirectory {
    async fn resolve_user(&self, user_id: &str) -> Result<DirectoryUser, IdentityError> {
        self.check_available().await?;
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| IdentityError::UserNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn list_users(&self) -> Result<Vec<DirectoryUser>, IdentityError> {
        self.check_available().await?;
        Ok(self.users.read().await.clone())
    }

    async fn user_photo(&self, user_id: &str) -> Result<Option<Vec<u8>>, IdentityError> {
        self.check_available().await?;
        Ok(self.photos.read().await.get(user_id).cloned())
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating inventory entity types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // Generate timestamps within a reasonable range (2020-2035)
        (1577836800i64..2051222400i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate a ComponentStatus variant.
    pub fn arb_component_status() -> impl Strategy<Value = ComponentStatus> {
        prop_oneof![
            Just(ComponentStatus::ReadyToUse),
            Just(ComponentStatus::BeingUsed),
            Just(ComponentStatus::OutOfInventory),
        ]
    }

    /// Generate any OperationType variant.
    pub fn arb_operation_type() -> impl Strategy<Value = OperationType> {
        prop_oneof![
            Just(OperationType::Added),
            Just(OperationType::Assigned),
            Just(OperationType::Returned),
            Just(OperationType::Activated),
            Just(OperationType::Deactivated),
        ]
    }

    /// Generate an attribute name, occasionally one of the required ones.
    pub fn arb_attribute_name() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => "[a-z][a-zA-Z]{0,12}",
            1 => Just("warrantyEndDate".to_string()),
            1 => Just("serialNumber".to_string()),
        ]
    }

    /// Generate a component type creation request.
    pub fn arb_new_component_type() -> impl Strategy<Value = NewComponentType> {
        (
            "[A-Z][a-z]{2,12}",
            prop::collection::vec(arb_attribute_name(), 0..8),
        )
            .prop_map(|(name, attributes)| NewComponentType { name, attributes })
    }

    /// Generate a component draft referencing `type_id`.
    pub fn arb_component_draft(type_id: ComponentTypeId) -> impl Strategy<Value = ComponentDraft> {
        (
            prop::option::of(arb_component_status()),
            prop_oneof![Just("Dell"), Just("HP"), Just("Lenovo"), Just("Apple")],
            "[A-Z][a-z0-9 ]{2,10}",
            prop::option::of(2015i32..2026),
            prop::option::of(prop_oneof![Just(4i32), Just(8), Just(12), Just(16)]),
            prop::option::of(prop_oneof![Just(8i32), Just(16), Just(32), Just(64)]),
            arb_timestamp(),
            "[A-Z0-9]{6,10}",
        )
            .prop_map(
                move |(status, brand, model, model_year, cores, ram, warranty, serial)| {
                    ComponentDraft {
                        status,
                        brand: brand.to_string(),
                        model,
                        model_year,
                        type_id,
                        screen_size: "14\"".to_string(),
                        resolution: "1920x1080".to_string(),
                        processor_type: "x86".to_string(),
                        processor_cores: cores,
                        ram,
                        warranty_end_date: warranty,
                        serial_number: serial,
                        condition: "Functioning".to_string(),
                        notes: String::new(),
                    }
                },
            )
    }

    /// Generate a directory user.
    pub fn arb_directory_user() -> impl Strategy<Value = DirectoryUser> {
        ("[a-f0-9]{8}", "[A-Z][a-z]{2,8}", "[A-Z][a-z]{2,10}").prop_map(|(id, first, last)| {
            DirectoryUser {
                email: Some(format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase())),
                display_name: Some(format!("{} {}", first, last)),
                first_name: Some(first),
                last_name: Some(last),
                id,
            }
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::Duration;

    /// A directory user with a full name.
    pub fn user(id: &str, first: &str, last: &str) -> DirectoryUser {
        DirectoryUser {
            id: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            email: Some(format!("{}@example.com", first.to_lowercase())),
            display_name: Some(format!("{} {}", first, last)),
        }
    }

    /// "Jane Doe" with id `u1`.
    pub fn jane() -> DirectoryUser {
        user("u1", "Jane", "Doe")
    }

    /// "John Smith" with id `u2`.
    pub fn john() -> DirectoryUser {
        user("u2", "John", "Smith")
    }

    /// Directory preloaded with [`jane`] and [`john`].
    pub fn directory() -> InMemoryDirectory {
        InMemoryDirectory::with_users(vec![jane(), john()])
    }

    /// A laptop type with one custom attribute.
    pub fn laptop_type() -> NewComponentType {
        NewComponentType::new("Laptop", vec!["color".to_string()])
    }

    /// A Dell laptop draft whose warranty ends a year from now.
    pub fn laptop_draft(type_id: ComponentTypeId) -> ComponentDraft {
        ComponentDraft {
            status: None,
            brand: "Dell".to_string(),
            model: "Latitude 7440".to_string(),
            model_year: Some(2023),
            type_id,
            screen_size: "14\"".to_string(),
            resolution: "1920x1200".to_string(),
            processor_type: "Intel Core i7".to_string(),
            processor_cores: Some(12),
            ram: Some(16),
            warranty_end_date: Utc::now() + Duration::days(365),
            serial_number: "DL-7440-0001".to_string(),
            condition: "Functioning".to_string(),
            notes: String::new(),
        }
    }

    /// Storage with the laptop type already created. Returns the type id.
    pub async fn storage_with_laptop_type() -> (MockStorage, ComponentTypeId) {
        let storage = MockStorage::new();
        let created = storage
            .component_type_insert(&laptop_type().with_required_attributes())
            .await;
        let id = match created {
            Ok(t) => t.id,
            Err(e) => panic!("fixture type insert failed: {}", e),
        };
        (storage, id)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on inventory error variants.

    use super::*;

    /// Assert that a result is a NotFound storage error for `entity_type`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &InventoryResult<T>, entity_type: EntityType) {
        match result {
            Err(InventoryError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "NotFound for wrong entity type");
            }
            other => panic!("Expected NotFound({:?}), got: {:?}", entity_type, other),
        }
    }

    /// Assert that a result is a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &InventoryResult<T>) {
        match result {
            Err(InventoryError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a result is a reference conflict.
    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &InventoryResult<T>) {
        match result {
            Err(InventoryError::Storage(StorageError::ReferenceConflict { .. })) => {}
            other => panic!("Expected ReferenceConflict, got: {:?}", other),
        }
    }
}
