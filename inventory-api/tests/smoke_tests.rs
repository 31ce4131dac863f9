//! End-to-end smoke tests against a live PostgreSQL.
//!
//! Run with `cargo test -p inventory-api --features db-tests` and the
//! `DB_*` variables pointing at a scratch database.

#![cfg(feature = "db-tests")]

use chrono::{Duration, Utc};
use inventory_api::{ApiResult, DbClient, DbConfig};
use inventory_core::*;
use inventory_storage::InventoryStore;
use inventory_test_utils::fixtures::{laptop_draft, laptop_type};

async fn test_db() -> ApiResult<DbClient> {
    let db = DbClient::from_config(&DbConfig::from_env())?;
    db.apply_schema().await?;
    Ok(db)
}

fn unique(label: &str) -> String {
    format!("{}-{}", label, uuid::Uuid::now_v7())
}

#[tokio::test]
async fn smoke_test_component_lifecycle() -> ApiResult<()> {
    let db = test_db().await?;
    db.ping().await?;

    let component_type = db
        .component_type_insert(
            &NewComponentType::new(unique("laptop"), laptop_type().attributes)
                .with_required_attributes(),
        )
        .await?;

    let mut draft = laptop_draft(component_type.id);
    draft.serial_number = unique("SN");
    let (component, added) = db
        .component_insert_with_entry(draft, "u1", "Jane Doe")
        .await?;
    assert_eq!(component.status, ComponentStatus::ReadyToUse);
    assert_eq!(added.operation_type, OperationType::Added);
    assert_eq!(added.user_name, "Jane Doe");

    let (assigned, entry) = db
        .apply_status_event(
            ComponentStatus::BeingUsed,
            NewHistoryEntry::new(component.id, "u2", OperationType::Assigned, "John Smith"),
        )
        .await?;
    assert_eq!(assigned.status, ComponentStatus::BeingUsed);

    let latest = db.history_latest(component.id).await?;
    assert_eq!(latest.map(|e| e.id), Some(entry.id));
    assert_eq!(db.history_by_component(component.id).await?.len(), 2);

    let deleted = db.component_type_delete(component_type.id).await;
    assert!(matches!(
        deleted,
        Err(InventoryError::Storage(StorageError::ReferenceConflict { .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn smoke_test_warranty_scan_and_mark() -> ApiResult<()> {
    let db = test_db().await?;
    let component_type = db
        .component_type_insert(&NewComponentType::new(unique("monitor"), Vec::new()).with_required_attributes())
        .await?;

    let now = Utc::now();
    let mut draft = laptop_draft(component_type.id);
    draft.serial_number = unique("SN");
    draft.warranty_end_date = now + Duration::days(3);
    let (component, _) = db
        .component_insert_with_entry(draft, "u1", "Jane Doe")
        .await?;

    let due = db.warranty_expiring(now, now + Duration::days(30)).await?;
    assert!(due.iter().any(|c| c.id == component.id));

    db.mark_notified(component.id).await?;
    let due = db.warranty_expiring(now, now + Duration::days(30)).await?;
    assert!(due.iter().all(|c| c.id != component.id));
    Ok(())
}

#[tokio::test]
async fn smoke_test_search_by_serial() -> ApiResult<()> {
    let db = test_db().await?;
    let component_type = db
        .component_type_insert(&NewComponentType::new(unique("dock"), Vec::new()).with_required_attributes())
        .await?;
    let serial = unique("DOCK");
    let mut draft = laptop_draft(component_type.id);
    draft.serial_number = serial.clone();
    db.component_insert_with_entry(draft, "u1", "Jane Doe").await?;

    let query = ComponentQuery {
        filter: ComponentFilter::default().with_search(serial.to_lowercase()),
        sort: None,
    };
    let found = db.component_search(&query, &[]).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].serial_number, serial);
    Ok(())
}
