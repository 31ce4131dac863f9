//! Async storage trait for inventory persistence.
//!
//! Each method is one atomic unit of work. Operations that touch both a
//! component and the history ledger (`component_insert_with_entry`,
//! `apply_status_event`) must either apply both writes or neither.

use ::async_trait::async_trait;
use inventory_core::{
    AttributeValues, Component, ComponentAttribute, ComponentDraft, ComponentId, ComponentQuery,
    ComponentStatus, ComponentType, ComponentTypeId, InventoryHistoryEntry, InventoryResult,
    NewComponentType, NewHistoryEntry, Timestamp, UserId,
};

/// Async storage trait for inventory data.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // ========================================================================
    // COMPONENT TYPE OPERATIONS
    // ========================================================================

    /// Insert a component type exactly as given.
    async fn component_type_insert(&self, t: &NewComponentType) -> InventoryResult<ComponentType>;

    /// Get a component type by ID.
    async fn component_type_get(&self, id: ComponentTypeId) -> InventoryResult<Option<ComponentType>>;

    /// List all component types ordered by id.
    async fn component_type_list(&self) -> InventoryResult<Vec<ComponentType>>;

    /// Overwrite name and attributes. `StorageError::NotFound` if unknown.
    async fn component_type_update(
        &self,
        id: ComponentTypeId,
        t: &NewComponentType,
    ) -> InventoryResult<ComponentType>;

    /// Delete a component type.
    ///
    /// `StorageError::ReferenceConflict` while any component references it.
    async fn component_type_delete(&self, id: ComponentTypeId) -> InventoryResult<()>;

    // ========================================================================
    // COMPONENT OPERATIONS
    // ========================================================================

    /// Insert a component and its `Added` ledger entry.
    ///
    /// `ValidationError::UnknownComponentType` if `draft.type_id` is unknown.
    async fn component_insert_with_entry(
        &self,
        draft: ComponentDraft,
        user_id: &str,
        user_name: &str,
    ) -> InventoryResult<(Component, InventoryHistoryEntry)>;

    /// Get a component by ID.
    async fn component_get(&self, id: ComponentId) -> InventoryResult<Option<Component>>;

    /// Overwrite every mutable field, resetting `email_notified` when the
    /// warranty end date changes.
    async fn component_update(
        &self,
        id: ComponentId,
        draft: ComponentDraft,
    ) -> InventoryResult<Component>;

    /// List components matching `query`, without duplicates.
    ///
    /// `matching_user_ids` are the directory users whose display name
    /// contains the search term; ignored when the query has no term.
    async fn component_search(
        &self,
        query: &ComponentQuery,
        matching_user_ids: &[UserId],
    ) -> InventoryResult<Vec<Component>>;

    /// Set a component's status and append `entry` to its ledger.
    ///
    /// `StorageError::NotFound` if the component does not exist.
    async fn apply_status_event(
        &self,
        status: ComponentStatus,
        entry: NewHistoryEntry,
    ) -> InventoryResult<(Component, InventoryHistoryEntry)>;

    /// Distinct non-null values of one attribute, ascending.
    async fn attribute_values(&self, attribute: ComponentAttribute)
        -> InventoryResult<AttributeValues>;

    // ========================================================================
    // HISTORY OPERATIONS
    // ========================================================================

    /// Ledger of one component, oldest first.
    async fn history_by_component(
        &self,
        component_id: ComponentId,
    ) -> InventoryResult<Vec<InventoryHistoryEntry>>;

    /// Every entry written by one user, oldest first.
    async fn history_by_user(&self, user_id: &str) -> InventoryResult<Vec<InventoryHistoryEntry>>;

    /// Most recent entry of one component (latest `created_at`, then highest id).
    async fn history_latest(
        &self,
        component_id: ComponentId,
    ) -> InventoryResult<Option<InventoryHistoryEntry>>;

    // ========================================================================
    // WARRANTY OPERATIONS
    // ========================================================================

    /// Components not yet notified whose warranty ends in `(after, until]`.
    async fn warranty_expiring(
        &self,
        after: Timestamp,
        until: Timestamp,
    ) -> InventoryResult<Vec<Component>>;

    /// Flag a component as notified about its warranty expiry.
    async fn mark_notified(&self, id: ComponentId) -> InventoryResult<()>;

    /// Cheap connectivity check.
    async fn ping(&self) -> InventoryResult<()>;
}
