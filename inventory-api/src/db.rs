//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! `InventoryStore` implementation backed by it. Operations that touch both
//! a component and its ledger run inside a single transaction.

use crate::query::{self, COMPONENT_COLUMNS};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime};
use inventory_core::{
    AttributeKind, AttributeValue, AttributeValues, Component, ComponentAttribute, ComponentDraft,
    ComponentId, ComponentQuery, ComponentStatus, ComponentType, ComponentTypeId, EntityType,
    InventoryError, InventoryHistoryEntry, InventoryResult, NewComponentType, NewHistoryEntry,
    OperationType, StorageError, Timestamp, UserId, ValidationError,
};
use inventory_storage::InventoryStore;
use tokio_postgres::{NoTls, Row};

/// Idempotent schema applied at startup when `DB_APPLY_SCHEMA` is set.
const SCHEMA_SQL: &str = include_str!("../migrations/V1__inventory_schema.sql");

const HISTORY_COLUMNS: &str = "id, created_at, component_id, user_id, operation_type::text, user_name";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Apply the bundled schema on startup
    pub apply_schema: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "vinventory".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            apply_schema: false,
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("DB_NAME").unwrap_or_else(|_| "vinventory".to_string()),
            user: std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            apply_schema: std::env::var("DB_APPLY_SCHEMA")
                .ok()
                .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
                .unwrap_or(false),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> InventoryResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.pool = Some(PoolConfig::new(self.max_size));

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        cfg.create_pool(Some(Runtime::Tokio1), NoTls).map_err(|e| {
            StorageError::Backend {
                reason: format!("Failed to create pool: {}", e),
            }
            .into()
        })
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn db_err(err: tokio_postgres::Error) -> InventoryError {
    StorageError::Backend {
        reason: err.to_string(),
    }
    .into()
}

fn pool_err(err: PoolError) -> InventoryError {
    let reason = match err {
        PoolError::Timeout(_) => "connection pool exhausted".to_string(),
        other => other.to_string(),
    };
    StorageError::Unavailable { reason }.into()
}

fn decode_err(reason: impl ToString) -> InventoryError {
    StorageError::Backend {
        reason: reason.to_string(),
    }
    .into()
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn row_to_component_type(row: &Row) -> ComponentType {
    ComponentType {
        id: row.get(0),
        name: row.get(1),
        attributes: row.get(2),
    }
}

fn row_to_component(row: &Row) -> InventoryResult<Component> {
    let status: String = row.get(1);
    Ok(Component {
        id: row.get(0),
        status: ComponentStatus::from_db_str(&status).map_err(decode_err)?,
        brand: row.get(2),
        model: row.get(3),
        model_year: row.get(4),
        type_id: row.get(5),
        screen_size: row.get(6),
        resolution: row.get(7),
        processor_type: row.get(8),
        processor_cores: row.get(9),
        ram: row.get(10),
        warranty_end_date: row.get(11),
        serial_number: row.get(12),
        condition: row.get(13),
        notes: row.get(14),
        email_notified: row.get(15),
    })
}

fn row_to_history(row: &Row) -> InventoryResult<InventoryHistoryEntry> {
    let operation: String = row.get(4);
    Ok(InventoryHistoryEntry {
        id: row.get(0),
        created_at: row.get(1),
        component_id: row.get(2),
        user_id: row.get(3),
        operation_type: OperationType::from_db_str(&operation).map_err(decode_err)?,
        user_name: row.get(5),
    })
}

fn rows_to_history(rows: &[Row]) -> InventoryResult<Vec<InventoryHistoryEntry>> {
    rows.iter().map(row_to_history).collect()
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> InventoryResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> InventoryResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_err)
    }

    /// Create tables, enum and indexes if they do not exist yet.
    pub async fn apply_schema(&self) -> InventoryResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA_SQL).await.map_err(db_err)?;
        tracing::info!("Database schema applied");
        Ok(())
    }

    /// Lock the type row against deletion for the rest of the transaction.
    async fn ensure_type(
        client: &tokio_postgres::Transaction<'_>,
        type_id: ComponentTypeId,
    ) -> InventoryResult<()> {
        let row = client
            .query_opt(
                "SELECT id FROM component_types WHERE id = $1 FOR KEY SHARE",
                &[&type_id],
            )
            .await
            .map_err(db_err)?;
        match row {
            Some(_) => Ok(()),
            None => Err(ValidationError::UnknownComponentType { type_id }.into()),
        }
    }

    async fn insert_entry(
        client: &tokio_postgres::Transaction<'_>,
        entry: &NewHistoryEntry,
    ) -> InventoryResult<InventoryHistoryEntry> {
        let sql = format!(
            "INSERT INTO inventory_history (component_id, user_id, operation_type, user_name) \
             VALUES ($1, $2, $3::text::inventory_operation_type, $4) RETURNING {}",
            HISTORY_COLUMNS
        );
        let row = client
            .query_one(
                &sql,
                &[
                    &entry.component_id,
                    &entry.user_id,
                    &entry.operation_type.as_db_str(),
                    &entry.user_name,
                ],
            )
            .await
            .map_err(db_err)?;
        row_to_history(&row)
    }
}

#[async_trait]
impl InventoryStore for DbClient {
    // ========================================================================
    // COMPONENT TYPE OPERATIONS
    // ========================================================================

    async fn component_type_insert(&self, t: &NewComponentType) -> InventoryResult<ComponentType> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO component_types (name, attributes) VALUES ($1, $2) \
                 RETURNING id, name, attributes",
                &[&t.name, &t.attributes],
            )
            .await
            .map_err(db_err)?;
        Ok(row_to_component_type(&row))
    }

    async fn component_type_get(&self, id: ComponentTypeId) -> InventoryResult<Option<ComponentType>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, name, attributes FROM component_types WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_component_type))
    }

    async fn component_type_list(&self) -> InventoryResult<Vec<ComponentType>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT id, name, attributes FROM component_types ORDER BY id",
                &[],
            )
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_component_type).collect())
    }

    async fn component_type_update(
        &self,
        id: ComponentTypeId,
        t: &NewComponentType,
    ) -> InventoryResult<ComponentType> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "UPDATE component_types SET name = $2, attributes = $3 WHERE id = $1 \
                 RETURNING id, name, attributes",
                &[&id, &t.name, &t.attributes],
            )
            .await
            .map_err(db_err)?;
        row.as_ref()
            .map(row_to_component_type)
            .ok_or_else(|| StorageError::not_found(EntityType::ComponentType, id).into())
    }

    async fn component_type_delete(&self, id: ComponentTypeId) -> InventoryResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        let exists = tx
            .query_opt(
                "SELECT id FROM component_types WHERE id = $1 FOR UPDATE",
                &[&id],
            )
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(StorageError::not_found(EntityType::ComponentType, id).into());
        }

        let references: i64 = tx
            .query_one("SELECT count(*) FROM components WHERE type_id = $1", &[&id])
            .await
            .map_err(db_err)?
            .get(0);
        if references > 0 {
            return Err(StorageError::ReferenceConflict {
                entity_type: EntityType::ComponentType,
                id: id.to_string(),
                referenced_by: EntityType::Component,
                references,
            }
            .into());
        }

        tx.execute("DELETE FROM component_types WHERE id = $1", &[&id])
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    // ========================================================================
    // COMPONENT OPERATIONS
    // ========================================================================

    async fn component_insert_with_entry(
        &self,
        draft: ComponentDraft,
        user_id: &str,
        user_name: &str,
    ) -> InventoryResult<(Component, InventoryHistoryEntry)> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        Self::ensure_type(&tx, draft.type_id).await?;

        let status = draft.status.unwrap_or_default();
        let sql = format!(
            "INSERT INTO components AS c (status, brand, model, model_year, type_id, screen_size, \
             resolution, processor_type, processor_cores, ram, warranty_end_date, serial_number, \
             \"condition\", notes, email_notified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, FALSE) \
             RETURNING {}",
            COMPONENT_COLUMNS
        );
        let row = tx
            .query_one(
                &sql,
                &[
                    &status.as_db_str(),
                    &draft.brand,
                    &draft.model,
                    &draft.model_year,
                    &draft.type_id,
                    &draft.screen_size,
                    &draft.resolution,
                    &draft.processor_type,
                    &draft.processor_cores,
                    &draft.ram,
                    &draft.warranty_end_date,
                    &draft.serial_number,
                    &draft.condition,
                    &draft.notes,
                ],
            )
            .await
            .map_err(db_err)?;
        let component = row_to_component(&row)?;

        let entry = Self::insert_entry(
            &tx,
            &NewHistoryEntry::new(component.id, user_id, OperationType::Added, user_name),
        )
        .await?;

        tx.commit().await.map_err(db_err)?;
        Ok((component, entry))
    }

    async fn component_get(&self, id: ComponentId) -> InventoryResult<Option<Component>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM components c WHERE c.id = $1", COMPONENT_COLUMNS);
        let row = conn.query_opt(&sql, &[&id]).await.map_err(db_err)?;
        row.as_ref().map(row_to_component).transpose()
    }

    async fn component_update(
        &self,
        id: ComponentId,
        draft: ComponentDraft,
    ) -> InventoryResult<Component> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        let sql = format!(
            "SELECT {} FROM components c WHERE c.id = $1 FOR UPDATE",
            COMPONENT_COLUMNS
        );
        let mut component = match tx.query_opt(&sql, &[&id]).await.map_err(db_err)? {
            Some(row) => row_to_component(&row)?,
            None => return Err(StorageError::not_found(EntityType::Component, id).into()),
        };

        Self::ensure_type(&tx, draft.type_id).await?;
        component.overwrite_with(draft);

        let sql = format!(
            "UPDATE components AS c SET status = $2, brand = $3, model = $4, model_year = $5, \
             type_id = $6, screen_size = $7, resolution = $8, processor_type = $9, \
             processor_cores = $10, ram = $11, warranty_end_date = $12, serial_number = $13, \
             \"condition\" = $14, notes = $15, email_notified = $16 \
             WHERE c.id = $1 RETURNING {}",
            COMPONENT_COLUMNS
        );
        let row = tx
            .query_one(
                &sql,
                &[
                    &id,
                    &component.status.as_db_str(),
                    &component.brand,
                    &component.model,
                    &component.model_year,
                    &component.type_id,
                    &component.screen_size,
                    &component.resolution,
                    &component.processor_type,
                    &component.processor_cores,
                    &component.ram,
                    &component.warranty_end_date,
                    &component.serial_number,
                    &component.condition,
                    &component.notes,
                    &component.email_notified,
                ],
            )
            .await
            .map_err(db_err)?;
        let updated = row_to_component(&row)?;

        tx.commit().await.map_err(db_err)?;
        Ok(updated)
    }

    async fn component_search(
        &self,
        query: &ComponentQuery,
        matching_user_ids: &[UserId],
    ) -> InventoryResult<Vec<Component>> {
        let composed = query::component_search(query, matching_user_ids);
        tracing::debug!(sql = %composed.sql, params = composed.params.len(), "Component search");

        let conn = self.get_conn().await?;
        let rows = conn
            .query(&composed.sql, &composed.param_refs())
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_component).collect()
    }

    async fn apply_status_event(
        &self,
        status: ComponentStatus,
        entry: NewHistoryEntry,
    ) -> InventoryResult<(Component, InventoryHistoryEntry)> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        let sql = format!(
            "UPDATE components AS c SET status = $2 WHERE c.id = $1 RETURNING {}",
            COMPONENT_COLUMNS
        );
        let component = match tx
            .query_opt(&sql, &[&entry.component_id, &status.as_db_str()])
            .await
            .map_err(db_err)?
        {
            Some(row) => row_to_component(&row)?,
            None => {
                return Err(StorageError::not_found(EntityType::Component, entry.component_id).into())
            }
        };

        let written = Self::insert_entry(&tx, &entry).await?;
        tx.commit().await.map_err(db_err)?;
        Ok((component, written))
    }

    async fn attribute_values(
        &self,
        attribute: ComponentAttribute,
    ) -> InventoryResult<AttributeValues> {
        let composed = query::attribute_values(attribute);
        let conn = self.get_conn().await?;
        let rows = conn.query(&composed.sql, &[]).await.map_err(db_err)?;

        let values = rows
            .iter()
            .map(|row| match attribute.kind() {
                AttributeKind::Text | AttributeKind::Status => AttributeValue::Text(row.get(0)),
                AttributeKind::Int => AttributeValue::Int(row.get(0)),
                AttributeKind::Timestamp => AttributeValue::Timestamp(row.get(0)),
                AttributeKind::Bool => AttributeValue::Bool(row.get(0)),
            })
            .collect();
        Ok(AttributeValues::collect(attribute, values))
    }

    // ========================================================================
    // HISTORY OPERATIONS
    // ========================================================================

    async fn history_by_component(
        &self,
        component_id: ComponentId,
    ) -> InventoryResult<Vec<InventoryHistoryEntry>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM inventory_history WHERE component_id = $1 ORDER BY created_at ASC, id ASC",
            HISTORY_COLUMNS
        );
        let rows = conn.query(&sql, &[&component_id]).await.map_err(db_err)?;
        rows_to_history(&rows)
    }

    async fn history_by_user(&self, user_id: &str) -> InventoryResult<Vec<InventoryHistoryEntry>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM inventory_history WHERE user_id = $1 ORDER BY created_at ASC, id ASC",
            HISTORY_COLUMNS
        );
        let rows = conn.query(&sql, &[&user_id]).await.map_err(db_err)?;
        rows_to_history(&rows)
    }

    async fn history_latest(
        &self,
        component_id: ComponentId,
    ) -> InventoryResult<Option<InventoryHistoryEntry>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM inventory_history WHERE component_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1",
            HISTORY_COLUMNS
        );
        let row = conn.query_opt(&sql, &[&component_id]).await.map_err(db_err)?;
        row.as_ref().map(row_to_history).transpose()
    }

    // ========================================================================
    // WARRANTY OPERATIONS
    // ========================================================================

    async fn warranty_expiring(
        &self,
        after: Timestamp,
        until: Timestamp,
    ) -> InventoryResult<Vec<Component>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM components c WHERE c.email_notified = FALSE \
             AND c.warranty_end_date > $1 AND c.warranty_end_date <= $2 \
             ORDER BY c.warranty_end_date ASC, c.id ASC",
            COMPONENT_COLUMNS
        );
        let rows = conn.query(&sql, &[&after, &until]).await.map_err(db_err)?;
        rows.iter().map(row_to_component).collect()
    }

    async fn mark_notified(&self, id: ComponentId) -> InventoryResult<()> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE components SET email_notified = TRUE WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(db_err)?;
        if updated == 0 {
            return Err(StorageError::not_found(EntityType::Component, id).into());
        }
        Ok(())
    }

    async fn ping(&self) -> InventoryResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(db_err)?;
        Ok(())
    }
}
