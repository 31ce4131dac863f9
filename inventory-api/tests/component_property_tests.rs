//! Property-Based Tests for the component lifecycle
//!
//! **Property: updates reset the warranty notice only when the warranty moves**
//!
//! **Property: a holder's display name finds the component only while it is in use**
//!
//! **Property: the ledger accepts `Added`, `Assigned` and `Returned` only**

use std::sync::Arc;
use std::time::Duration;

use inventory_api::InventoryService;
use inventory_core::{
    ComponentFilter, ComponentQuery, ComponentStatus, InventoryError, OperationType,
};
use inventory_storage::{InventoryStore, MockStorage};
use inventory_test_utils::fixtures::{jane, laptop_draft, storage_with_laptop_type};
use inventory_test_utils::generators::{
    arb_component_draft, arb_directory_user, arb_operation_type, arb_timestamp,
};
use inventory_test_utils::InMemoryDirectory;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

fn service(storage: &MockStorage, directory: InMemoryDirectory) -> InventoryService {
    InventoryService::new(
        Arc::new(storage.clone()),
        Arc::new(directory),
        Duration::from_secs(5),
    )
}

fn search(term: &str) -> ComponentQuery {
    ComponentQuery {
        filter: ComponentFilter::default().with_search(term.to_string()),
        sort: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_update_resets_notified_only_on_warranty_change(
        original in arb_component_draft(0),
        replacement in arb_component_draft(0),
        new_warranty in arb_timestamp(),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let (storage, type_id) = storage_with_laptop_type().await;
            let svc = service(&storage, InMemoryDirectory::with_users(vec![jane()]));

            let mut original = original;
            original.type_id = type_id;
            let created = svc.create_component(original.clone(), "u1").await.unwrap();
            storage.mark_notified(created.id).await.unwrap();

            let mut same_warranty = replacement.clone();
            same_warranty.type_id = type_id;
            same_warranty.warranty_end_date = original.warranty_end_date;
            let updated = svc.update_component(created.id, same_warranty).await.unwrap();
            prop_assert!(updated.email_notified);

            let mut moved = replacement;
            moved.type_id = type_id;
            moved.warranty_end_date = new_warranty;
            let updated = svc.update_component(created.id, moved).await.unwrap();
            prop_assert_eq!(
                updated.email_notified,
                new_warranty == original.warranty_end_date
            );
            Ok(())
        })?;
    }

    #[test]
    fn prop_search_matches_holder_display_name(user in arb_directory_user()) {
        let rt = runtime();
        rt.block_on(async {
            let (storage, type_id) = storage_with_laptop_type().await;
            let svc = service(&storage, InMemoryDirectory::with_users(vec![user.clone()]));
            let term = user.display_name.clone().unwrap_or_default().to_lowercase();

            let created = svc.create_component(laptop_draft(type_id), &user.id).await.unwrap();
            prop_assert!(svc.list_components(&search(&term)).await.unwrap().is_empty());

            svc.record_history(created.id, &user.id, "Assigned").await.unwrap();
            let found = svc.list_components(&search(&term)).await.unwrap();
            prop_assert_eq!(found.len(), 1);
            prop_assert_eq!(found[0].id, created.id);

            svc.record_history(created.id, &user.id, "Returned").await.unwrap();
            prop_assert!(svc.list_components(&search(&term)).await.unwrap().is_empty());
            Ok(())
        })?;
    }

    #[test]
    fn prop_ledger_accepts_only_direct_operations(op in arb_operation_type()) {
        let rt = runtime();
        rt.block_on(async {
            let (storage, type_id) = storage_with_laptop_type().await;
            let svc = service(&storage, InMemoryDirectory::with_users(vec![jane()]));
            let created = svc.create_component(laptop_draft(type_id), "u1").await.unwrap();

            let result = svc.record_history(created.id, "u1", op.as_db_str()).await;
            let stored = storage.component_get(created.id).await.unwrap().unwrap();
            let history = storage.history_by_component(created.id).await.unwrap();
            match op {
                OperationType::Added | OperationType::Assigned | OperationType::Returned => {
                    let entry = result.unwrap();
                    prop_assert_eq!(entry.operation_type, op);
                    prop_assert_eq!(stored.status, op.resulting_status());
                    prop_assert_eq!(history.len(), 2);
                }
                OperationType::Activated | OperationType::Deactivated => {
                    prop_assert!(matches!(result, Err(InventoryError::Validation(_))));
                    prop_assert_eq!(stored.status, ComponentStatus::ReadyToUse);
                    prop_assert_eq!(history.len(), 1);
                }
            }
            Ok(())
        })?;
    }
}
