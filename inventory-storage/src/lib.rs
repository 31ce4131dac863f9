//! Vinventory Storage - Storage Trait and Mock Implementation
//!
//! Defines the storage abstraction layer for inventory entities.
//! The Postgres implementation lives in inventory-api.

pub mod store;

pub use store::InventoryStore;

use ::async_trait::async_trait;
use chrono::Utc;
use inventory_core::{
    AttributeValue, AttributeValues, Component, ComponentAttribute, ComponentDraft, ComponentId,
    ComponentQuery, ComponentStatus, ComponentType, ComponentTypeId, EntityType, HistoryId,
    InventoryHistoryEntry, InventoryResult, NewComponentType, NewHistoryEntry, OperationType,
    SortOrder, StorageError, Timestamp, UserId, ValidationError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// MOCK STORAGE
// ============================================================================

#[derive(Debug, Default)]
struct MockState {
    types: BTreeMap<ComponentTypeId, ComponentType>,
    components: BTreeMap<ComponentId, Component>,
    history: Vec<InventoryHistoryEntry>,
    next_type_id: ComponentTypeId,
    next_component_id: ComponentId,
    next_history_id: HistoryId,
    fail_history_appends: bool,
}

impl MockState {
    fn append_entry(&mut self, entry: NewHistoryEntry) -> InventoryResult<InventoryHistoryEntry> {
        if self.fail_history_appends {
            return Err(StorageError::TransactionFailed {
                reason: "history append rejected".to_string(),
            }
            .into());
        }
        self.next_history_id += 1;
        let stored = InventoryHistoryEntry {
            id: self.next_history_id,
            created_at: Utc::now(),
            component_id: entry.component_id,
            user_id: entry.user_id,
            operation_type: entry.operation_type,
            user_name: entry.user_name,
        };
        self.history.push(stored.clone());
        Ok(stored)
    }

    fn latest_entry(&self, component_id: ComponentId) -> Option<&InventoryHistoryEntry> {
        self.history
            .iter()
            .filter(|e| e.component_id == component_id)
            .max_by(|a, b| a.recency_cmp(b))
    }

    fn ensure_type(&self, type_id: ComponentTypeId) -> InventoryResult<()> {
        if self.types.contains_key(&type_id) {
            Ok(())
        } else {
            Err(ValidationError::UnknownComponentType { type_id }.into())
        }
    }
}

/// In-memory storage for tests.
///
/// A single lock guards all tables so every trait method is atomic, like
/// one database transaction.
#[derive(Debug, Clone, Default)]
pub struct MockStorage {
    state: Arc<RwLock<MockState>>,
}

impl MockStorage {
    /// Create a new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub async fn clear(&self) {
        *self.state.write().await = MockState::default();
    }

    /// Make every subsequent ledger append fail, to exercise rollback.
    pub async fn fail_history_appends(&self, fail: bool) {
        self.state.write().await.fail_history_appends = fail;
    }

    /// Get count of stored components.
    pub async fn component_count(&self) -> usize {
        self.state.read().await.components.len()
    }

    /// Get count of ledger entries.
    pub async fn history_count(&self) -> usize {
        self.state.read().await.history.len()
    }

    /// Insert a component bypassing the ledger, for seeding fixtures.
    pub async fn seed_component(&self, component: Component) {
        let mut state = self.state.write().await;
        state.next_component_id = state.next_component_id.max(component.id);
        state.components.insert(component.id, component);
    }
}

#[async_trait]
impl InventoryStore for MockStorage {
    // === Component Type Operations ===

    async fn component_type_insert(&self, t: &NewComponentType) -> InventoryResult<ComponentType> {
        let mut state = self.state.write().await;
        state.next_type_id += 1;
        let stored = ComponentType {
            id: state.next_type_id,
            name: t.name.clone(),
            attributes: t.attributes.clone(),
        };
        state.types.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn component_type_get(&self, id: ComponentTypeId) -> InventoryResult<Option<ComponentType>> {
        Ok(self.state.read().await.types.get(&id).cloned())
    }

    async fn component_type_list(&self) -> InventoryResult<Vec<ComponentType>> {
        Ok(self.state.read().await.types.values().cloned().collect())
    }

    async fn component_type_update(
        &self,
        id: ComponentTypeId,
        t: &NewComponentType,
    ) -> InventoryResult<ComponentType> {
        let mut state = self.state.write().await;
        let existing = state
            .types
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::ComponentType, id))?;
        existing.name = t.name.clone();
        existing.attributes = t.attributes.clone();
        Ok(existing.clone())
    }

    async fn component_type_delete(&self, id: ComponentTypeId) -> InventoryResult<()> {
        let mut state = self.state.write().await;
        if !state.types.contains_key(&id) {
            return Err(StorageError::not_found(EntityType::ComponentType, id).into());
        }
        let references = state.components.values().filter(|c| c.type_id == id).count();
        if references > 0 {
            return Err(StorageError::ReferenceConflict {
                entity_type: EntityType::ComponentType,
                id: id.to_string(),
                referenced_by: EntityType::Component,
                references: references as i64,
            }
            .into());
        }
        state.types.remove(&id);
        Ok(())
    }

    // === Component Operations ===

    async fn component_insert_with_entry(
        &self,
        draft: ComponentDraft,
        user_id: &str,
        user_name: &str,
    ) -> InventoryResult<(Component, InventoryHistoryEntry)> {
        let mut state = self.state.write().await;
        state.ensure_type(draft.type_id)?;

        let id = state.next_component_id + 1;
        let component = Component::from_draft(id, draft);
        let entry = state.append_entry(NewHistoryEntry::new(
            id,
            user_id,
            OperationType::Added,
            user_name,
        ))?;
        state.next_component_id = id;
        state.components.insert(id, component.clone());
        Ok((component, entry))
    }

    async fn component_get(&self, id: ComponentId) -> InventoryResult<Option<Component>> {
        Ok(self.state.read().await.components.get(&id).cloned())
    }

    async fn component_update(
        &self,
        id: ComponentId,
        draft: ComponentDraft,
    ) -> InventoryResult<Component> {
        let mut state = self.state.write().await;
        if !state.components.contains_key(&id) {
            return Err(StorageError::not_found(EntityType::Component, id).into());
        }
        state.ensure_type(draft.type_id)?;
        let component = state
            .components
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::Component, id))?;
        component.overwrite_with(draft);
        Ok(component.clone())
    }

    async fn component_search(
        &self,
        query: &ComponentQuery,
        matching_user_ids: &[UserId],
    ) -> InventoryResult<Vec<Component>> {
        let state = self.state.read().await;
        let latest = latest_entries(&state.history);
        let mut found: Vec<Component> = state
            .components
            .values()
            .filter(|c| query.filter.matches_fields(c))
            .filter(|c| {
                let current_user = latest.get(&c.id).map(|e| e.user_id.as_str());
                query.filter.matches_search(c, current_user, matching_user_ids)
            })
            .cloned()
            .collect();

        if let Some(sort) = query.sort {
            found.sort_by(|a, b| {
                let ord = a.cmp_by(b, sort.field);
                let ord = match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
                ord.then(a.id.cmp(&b.id))
            });
        }
        Ok(found)
    }

    async fn apply_status_event(
        &self,
        status: ComponentStatus,
        entry: NewHistoryEntry,
    ) -> InventoryResult<(Component, InventoryHistoryEntry)> {
        let mut state = self.state.write().await;
        let component_id = entry.component_id;
        let mut component = state
            .components
            .get(&component_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(EntityType::Component, component_id))?;

        // Append first so a failure leaves the component untouched.
        let stored = state.append_entry(entry)?;
        component.status = status;
        state.components.insert(component_id, component.clone());
        Ok((component, stored))
    }

    async fn attribute_values(
        &self,
        attribute: ComponentAttribute,
    ) -> InventoryResult<AttributeValues> {
        let state = self.state.read().await;
        let mut values: Vec<AttributeValue> = state
            .components
            .values()
            .filter_map(|c| c.attribute_value(attribute))
            .collect();
        values.sort();
        values.dedup();
        Ok(AttributeValues::collect(attribute, values))
    }

    // === History Operations ===

    async fn history_by_component(
        &self,
        component_id: ComponentId,
    ) -> InventoryResult<Vec<InventoryHistoryEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .history
            .iter()
            .filter(|e| e.component_id == component_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.recency_cmp(b));
        Ok(entries)
    }

    async fn history_by_user(&self, user_id: &str) -> InventoryResult<Vec<InventoryHistoryEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .history
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.recency_cmp(b));
        Ok(entries)
    }

    async fn history_latest(
        &self,
        component_id: ComponentId,
    ) -> InventoryResult<Option<InventoryHistoryEntry>> {
        Ok(self.state.read().await.latest_entry(component_id).cloned())
    }

    // === Warranty Operations ===

    async fn warranty_expiring(
        &self,
        after: Timestamp,
        until: Timestamp,
    ) -> InventoryResult<Vec<Component>> {
        let state = self.state.read().await;
        let mut due: Vec<Component> = state
            .components
            .values()
            .filter(|c| !c.email_notified)
            .filter(|c| c.warranty_end_date > after && c.warranty_end_date <= until)
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.warranty_end_date
                .cmp(&b.warranty_end_date)
                .then(a.id.cmp(&b.id))
        });
        Ok(due)
    }

    async fn mark_notified(&self, id: ComponentId) -> InventoryResult<()> {
        let mut state = self.state.write().await;
        let component = state
            .components
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::Component, id))?;
        component.email_notified = true;
        Ok(())
    }

    async fn ping(&self) -> InventoryResult<()> {
        Ok(())
    }
}

/// Group ledger entries by component, keeping only the most recent one.
pub fn latest_entries(entries: &[InventoryHistoryEntry]) -> HashMap<ComponentId, &InventoryHistoryEntry> {
    let mut latest: HashMap<ComponentId, &InventoryHistoryEntry> = HashMap::new();
    for entry in entries {
        latest
            .entry(entry.component_id)
            .and_modify(|current| {
                if entry.recency_cmp(current).is_gt() {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }
    latest
}

// ============================================================================
// TESTS
// ============================================================================
