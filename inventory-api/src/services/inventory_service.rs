//! Inventory Service
//!
//! Component lifecycle on top of an [`InventoryStore`] and an
//! [`IdentityResolver`]. Directory calls are bounded by the configured
//! identity timeout and always complete before the store opens a
//! transaction.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use inventory_core::{
    matching_user_ids, AttributeValues, Component, ComponentAttribute, ComponentDraft, ComponentId,
    ComponentQuery, ComponentType, ComponentTypeId, DirectoryUser, EntityType,
    IdentityError, IdentityResolver, InteractantUser, InventoryHistoryEntry, InventoryResult,
    LastInteraction, NewComponentType, NewHistoryEntry, OperationType, StorageError,
    ValidationError,
};
use inventory_storage::InventoryStore;

/// Lifecycle operations shared by the HTTP routes.
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    identity: Arc<dyn IdentityResolver>,
    identity_timeout: Duration,
}

impl InventoryService {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        identity: Arc<dyn IdentityResolver>,
        identity_timeout: Duration,
    ) -> Self {
        Self {
            store,
            identity,
            identity_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn InventoryStore> {
        &self.store
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, IdentityError>
    where
        F: Future<Output = Result<T, IdentityError>>,
    {
        tokio::time::timeout(self.identity_timeout, call)
            .await
            .map_err(|_| IdentityError::Timeout {
                timeout_secs: self.identity_timeout.as_secs(),
            })?
    }

    /// Strict lookup: any failure is returned to the caller.
    pub async fn resolve_user(&self, user_id: &str) -> InventoryResult<DirectoryUser> {
        Ok(self.bounded(self.identity.resolve_user(user_id)).await?)
    }

    /// Tolerant lookup: failures are logged and yield `None`.
    async fn try_resolve_user(&self, user_id: &str) -> Option<DirectoryUser> {
        match self.bounded(self.identity.resolve_user(user_id)).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Directory lookup failed; continuing without it");
                None
            }
        }
    }

    async fn require_component(&self, id: ComponentId) -> InventoryResult<Component> {
        self.store
            .component_get(id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Component, id).into())
    }

    // ========================================================================
    // COMPONENT TYPES
    // ========================================================================

    #[tracing::instrument(skip(self, t), fields(name = %t.name))]
    pub async fn create_component_type(&self, t: NewComponentType) -> InventoryResult<ComponentType> {
        let t = validated_type(t)?;
        let created = self.store.component_type_insert(&t).await?;
        tracing::info!(type_id = created.id, "Component type created");
        Ok(created)
    }

    pub async fn get_component_type(&self, id: ComponentTypeId) -> InventoryResult<ComponentType> {
        self.store
            .component_type_get(id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::ComponentType, id).into())
    }

    pub async fn list_component_types(&self) -> InventoryResult<Vec<ComponentType>> {
        self.store.component_type_list().await
    }

    #[tracing::instrument(skip(self, t))]
    pub async fn update_component_type(
        &self,
        id: ComponentTypeId,
        t: NewComponentType,
    ) -> InventoryResult<ComponentType> {
        let t = validated_type(t)?;
        self.store.component_type_update(id, &t).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_component_type(&self, id: ComponentTypeId) -> InventoryResult<()> {
        self.store.component_type_delete(id).await?;
        tracing::info!(type_id = id, "Component type deleted");
        Ok(())
    }

    // ========================================================================
    // COMPONENTS
    // ========================================================================

    /// Create a component and its `Added` entry. The acting user must resolve.
    #[tracing::instrument(skip(self, draft), fields(type_id = draft.type_id))]
    pub async fn create_component(
        &self,
        draft: ComponentDraft,
        user_id: &str,
    ) -> InventoryResult<Component> {
        if self.store.component_type_get(draft.type_id).await?.is_none() {
            return Err(ValidationError::UnknownComponentType {
                type_id: draft.type_id,
            }
            .into());
        }
        let user = self.resolve_user(user_id).await?;
        let (component, entry) = self
            .store
            .component_insert_with_entry(draft, user_id, &user.full_name())
            .await?;
        tracing::info!(component_id = component.id, history_id = entry.id, "Component created");
        Ok(component)
    }

    pub async fn get_component(&self, id: ComponentId) -> InventoryResult<Component> {
        self.require_component(id).await
    }

    #[tracing::instrument(skip(self, draft))]
    pub async fn update_component(
        &self,
        id: ComponentId,
        draft: ComponentDraft,
    ) -> InventoryResult<Component> {
        self.store.component_update(id, draft).await
    }

    /// Filtered, sorted listing. The directory is consulted only when a
    /// search term is present.
    pub async fn list_components(&self, query: &ComponentQuery) -> InventoryResult<Vec<Component>> {
        let matching = match query.filter.search.as_deref() {
            Some(term) => {
                let users = self.bounded(self.identity.list_users()).await?;
                matching_user_ids(&users, term)
            }
            None => Vec::new(),
        };
        let components = self.store.component_search(query, &matching).await?;
        tracing::debug!(count = components.len(), "Listed components");
        Ok(components)
    }

    pub async fn attribute_values(&self, attribute: &str) -> InventoryResult<AttributeValues> {
        let attribute = ComponentAttribute::parse(attribute)?;
        self.store.attribute_values(attribute).await
    }

    // ========================================================================
    // LEDGER & STATUS
    // ========================================================================

    /// Append a ledger entry and move the component to the matching status.
    ///
    /// Only `Added`, `Assigned` and `Returned` are accepted here; the
    /// acting user must resolve.
    #[tracing::instrument(skip(self))]
    pub async fn record_history(
        &self,
        component_id: ComponentId,
        user_id: &str,
        operation_type: &str,
    ) -> InventoryResult<InventoryHistoryEntry> {
        self.require_component(component_id).await?;
        let user = self.resolve_user(user_id).await?;
        let operation: OperationType = operation_type.parse().map_err(ValidationError::from)?;
        let status = operation.ledger_status()?;

        let (_, entry) = self
            .store
            .apply_status_event(
                status,
                NewHistoryEntry::new(component_id, user_id, operation, user.full_name()),
            )
            .await?;
        tracing::info!(
            component_id,
            history_id = entry.id,
            operation = %operation,
            status = %status,
            "Inventory history recorded"
        );
        Ok(entry)
    }

    /// Return a component to service.
    pub async fn activate_component(&self, id: ComponentId, user_id: &str) -> InventoryResult<Component> {
        self.set_active(id, user_id, OperationType::Activated).await
    }

    /// Take a component out of inventory.
    pub async fn deactivate_component(
        &self,
        id: ComponentId,
        user_id: &str,
    ) -> InventoryResult<Component> {
        self.set_active(id, user_id, OperationType::Deactivated).await
    }

    #[tracing::instrument(skip(self))]
    async fn set_active(
        &self,
        id: ComponentId,
        user_id: &str,
        operation: OperationType,
    ) -> InventoryResult<Component> {
        self.require_component(id).await?;
        let user_name = self
            .try_resolve_user(user_id)
            .await
            .map(|u| u.full_name())
            .unwrap_or_default();

        let (component, entry) = self
            .store
            .apply_status_event(
                operation.resulting_status(),
                NewHistoryEntry::new(id, user_id, operation, user_name),
            )
            .await?;
        tracing::info!(component_id = id, history_id = entry.id, operation = %operation, "Component status changed");
        Ok(component)
    }

    /// Latest actor on a component, falling back to the frozen name when the
    /// directory cannot resolve them.
    pub async fn last_interactant(&self, id: ComponentId) -> InventoryResult<LastInteraction> {
        let component = self.require_component(id).await?;
        let latest = self
            .store
            .history_latest(id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::InventoryHistory, id))?;

        let user = match self.try_resolve_user(&latest.user_id).await {
            Some(user) => InteractantUser::from(user),
            None => InteractantUser::from_snapshot(&latest.user_name),
        };
        Ok(LastInteraction {
            last_interactant_user: user,
            component_status: component.status,
        })
    }

    pub async fn component_history(
        &self,
        id: ComponentId,
    ) -> InventoryResult<Vec<InventoryHistoryEntry>> {
        self.require_component(id).await?;
        self.store.history_by_component(id).await
    }

    pub async fn user_history(&self, user_id: &str) -> InventoryResult<Vec<InventoryHistoryEntry>> {
        self.resolve_user(user_id).await?;
        self.store.history_by_user(user_id).await
    }

    // ========================================================================
    // DIRECTORY
    // ========================================================================

    pub async fn list_users(&self) -> InventoryResult<Vec<DirectoryUser>> {
        Ok(self.bounded(self.identity.list_users()).await?)
    }

    /// Profile photo as a `data:` URL, or an empty string when there is none.
    pub async fn user_photo_url(&self, user_id: &str) -> InventoryResult<String> {
        let photo = self.bounded(self.identity.user_photo(user_id)).await?;
        Ok(photo.map(|bytes| photo_data_url(&bytes)).unwrap_or_default())
    }
}

/// Trim the name and apply the required attributes.
fn validated_type(t: NewComponentType) -> Result<NewComponentType, ValidationError> {
    let name = t.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    Ok(NewComponentType { name, ..t }.with_required_attributes())
}

pub fn photo_data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_core::{ComponentFilter, ComponentStatus, InventoryError};
    use inventory_test_utils::assertions::{assert_conflict, assert_not_found, assert_validation_error};
    use inventory_test_utils::fixtures::{directory, laptop_draft, laptop_type, storage_with_laptop_type};
    use inventory_test_utils::{InMemoryDirectory, MockStorage};

    async fn service() -> (InventoryService, MockStorage, InMemoryDirectory, ComponentTypeId) {
        let (storage, type_id) = storage_with_laptop_type().await;
        let dir = directory();
        let svc = InventoryService::new(
            Arc::new(storage.clone()),
            Arc::new(dir.clone()),
            Duration::from_secs(5),
        );
        (svc, storage, dir, type_id)
    }

    #[tokio::test]
    async fn test_create_type_appends_required_attributes() {
        let (svc, _, _, _) = service().await;
        let created = svc.create_component_type(laptop_type()).await.unwrap();
        assert_eq!(created.attributes, vec!["color", "warrantyEndDate", "serialNumber"]);
    }

    #[tokio::test]
    async fn test_create_type_requires_name() {
        let (svc, _, _, _) = service().await;
        let result = svc
            .create_component_type(NewComponentType::new("  ", vec![]))
            .await;
        assert_validation_error(&result);
    }

    #[tokio::test]
    async fn test_delete_referenced_type_conflicts() {
        let (svc, _, _, type_id) = service().await;
        svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        assert_conflict(&svc.delete_component_type(type_id).await);
    }

    #[tokio::test]
    async fn test_create_component_writes_added_entry_with_name() {
        let (svc, storage, _, type_id) = service().await;
        let component = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        assert_eq!(component.status, ComponentStatus::ReadyToUse);

        let history = svc.component_history(component.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation_type, OperationType::Added);
        assert_eq!(history[0].user_name, "Jane Doe");
        assert_eq!(storage.history_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_component_rejects_unknown_user_without_writing() {
        let (svc, storage, _, type_id) = service().await;
        let result = svc.create_component(laptop_draft(type_id), "ghost").await;
        assert!(matches!(
            result,
            Err(InventoryError::Identity(IdentityError::UserNotFound { .. }))
        ));
        assert_eq!(storage.component_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_component_rejects_unknown_type() {
        let (svc, _, _, type_id) = service().await;
        let result = svc.create_component(laptop_draft(type_id + 100), "u1").await;
        assert_validation_error(&result);
    }

    #[tokio::test]
    async fn test_lifecycle_scenario() {
        let (svc, _, _, type_id) = service().await;
        let c = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();

        let entry = svc.record_history(c.id, "u1", "Assigned").await.unwrap();
        assert_eq!(entry.operation_type, OperationType::Assigned);
        assert_eq!(svc.get_component(c.id).await.unwrap().status, ComponentStatus::BeingUsed);

        let after = svc.deactivate_component(c.id, "u1").await.unwrap();
        assert_eq!(after.status, ComponentStatus::OutOfInventory);

        let history = svc.component_history(c.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].operation_type, OperationType::Deactivated);
    }

    #[tokio::test]
    async fn test_assign_then_return_leaves_ready() {
        let (svc, _, _, type_id) = service().await;
        let c = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        svc.record_history(c.id, "u2", "Assigned").await.unwrap();
        svc.record_history(c.id, "u2", "Returned").await.unwrap();

        assert_eq!(svc.get_component(c.id).await.unwrap().status, ComponentStatus::ReadyToUse);
        let ops: Vec<_> = svc
            .component_history(c.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.operation_type)
            .collect();
        assert_eq!(
            ops,
            vec![OperationType::Added, OperationType::Assigned, OperationType::Returned]
        );
    }

    #[tokio::test]
    async fn test_record_history_rejects_activation_ops() {
        let (svc, _, _, type_id) = service().await;
        let c = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        assert_validation_error(&svc.record_history(c.id, "u1", "Activated").await);
        assert_validation_error(&svc.record_history(c.id, "u1", "Borrowed").await);
    }

    #[tokio::test]
    async fn test_record_history_unknown_component() {
        let (svc, _, _, _) = service().await;
        assert_not_found(&svc.record_history(404, "u1", "Assigned").await, EntityType::Component);
    }

    #[tokio::test]
    async fn test_record_history_is_strict_about_identity() {
        let (svc, storage, dir, type_id) = service().await;
        let c = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        dir.set_unavailable(true).await;

        assert!(svc.record_history(c.id, "u1", "Assigned").await.is_err());
        assert_eq!(storage.history_count().await, 1);
        assert_eq!(svc.get_component(c.id).await.unwrap().status, ComponentStatus::ReadyToUse);
    }

    #[tokio::test]
    async fn test_activate_tolerates_directory_failure() {
        let (svc, _, dir, type_id) = service().await;
        let c = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        dir.set_unavailable(true).await;

        svc.deactivate_component(c.id, "u1").await.unwrap();
        let activated = svc.activate_component(c.id, "u1").await.unwrap();
        assert_eq!(activated.status, ComponentStatus::ReadyToUse);

        let history = svc.store().history_by_component(c.id).await.unwrap();
        assert_eq!(history.last().map(|e| e.user_name.as_str()), Some(""));
    }

    #[tokio::test]
    async fn test_last_interactant_falls_back_to_snapshot() {
        let (svc, _, dir, type_id) = service().await;
        let c = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        svc.record_history(c.id, "u2", "Assigned").await.unwrap();

        let live = svc.last_interactant(c.id).await.unwrap();
        assert_eq!(live.last_interactant_user.id.as_deref(), Some("u2"));
        assert_eq!(live.component_status, ComponentStatus::BeingUsed);

        dir.remove_user("u2").await;
        let fallback = svc.last_interactant(c.id).await.unwrap();
        assert_eq!(fallback.last_interactant_user.id, None);
        assert_eq!(
            fallback.last_interactant_user.display_name.as_deref(),
            Some("John Smith")
        );
    }

    #[tokio::test]
    async fn test_last_interactant_without_history() {
        let (svc, storage, _, type_id) = service().await;
        storage
            .seed_component(Component::from_draft(42, laptop_draft(type_id)))
            .await;
        assert_not_found(&svc.last_interactant(42).await, EntityType::InventoryHistory);
    }

    #[tokio::test]
    async fn test_search_finds_current_user_by_display_name() {
        let (svc, _, _, type_id) = service().await;
        let assigned = svc.create_component(laptop_draft(type_id), "u2").await.unwrap();
        let idle = svc.create_component(laptop_draft(type_id), "u2").await.unwrap();
        svc.record_history(assigned.id, "u1", "Assigned").await.unwrap();

        let query = ComponentQuery {
            filter: ComponentFilter::default().with_search("jane"),
            sort: None,
        };
        let found: Vec<_> = svc
            .list_components(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(found, vec![assigned.id]);
        assert!(!found.contains(&idle.id));
    }

    #[tokio::test]
    async fn test_search_surfaces_directory_failure() {
        let (svc, _, dir, _) = service().await;
        dir.set_unavailable(true).await;
        let query = ComponentQuery {
            filter: ComponentFilter::default().with_search("jane"),
            sort: None,
        };
        assert!(matches!(
            svc.list_components(&query).await,
            Err(InventoryError::Identity(IdentityError::Upstream { .. }))
        ));
        // Listing without a term never touches the directory.
        assert!(svc.list_components(&ComponentQuery::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_user_history_requires_known_user() {
        let (svc, _, _, type_id) = service().await;
        svc.create_component(laptop_draft(type_id), "u1").await.unwrap();
        assert_eq!(svc.user_history("u1").await.unwrap().len(), 1);
        assert!(svc.user_history("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_user_photo_url() {
        let (svc, _, dir, _) = service().await;
        assert_eq!(svc.user_photo_url("u1").await.unwrap(), "");
        dir.set_photo("u1", vec![0xff, 0xd8]).await;
        assert_eq!(
            svc.user_photo_url("u1").await.unwrap(),
            "data:image/jpeg;base64,/9g="
        );
    }

    #[tokio::test]
    async fn test_attribute_values_rejects_unknown_attribute() {
        let (svc, _, _, _) = service().await;
        assert_validation_error(&svc.attribute_values("colour").await);
    }
}
