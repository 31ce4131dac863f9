//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use inventory_core::IdentityResolver;
use inventory_storage::InventoryStore;

use crate::config::{ApiConfig, UploadLimit};
use crate::object_store::ObjectStore;
use crate::services::InventoryService;
use crate::types::PublicAuthConfig;

/// Application-wide state shared across all routes.
///
/// Collaborators are constructed once at startup and injected here; handlers
/// pull the piece they need through `State<T>` via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Store access for routes that bypass the lifecycle service (health).
    pub store: Arc<dyn InventoryStore>,
    pub service: InventoryService,
    pub object_store: Arc<dyn ObjectStore>,
    pub public_auth: PublicAuthConfig,
    pub upload_limit: UploadLimit,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        identity: Arc<dyn IdentityResolver>,
        object_store: Arc<dyn ObjectStore>,
        api_config: &ApiConfig,
        public_auth: PublicAuthConfig,
    ) -> Self {
        let service = InventoryService::new(store.clone(), identity, api_config.identity_timeout);
        Self {
            store,
            service,
            object_store,
            public_auth,
            upload_limit: api_config.upload_limit(),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<dyn InventoryStore>, store);
crate::impl_from_ref!(InventoryService, service);
crate::impl_from_ref!(Arc<dyn ObjectStore>, object_store);
crate::impl_from_ref!(PublicAuthConfig, public_auth);
crate::impl_from_ref!(UploadLimit, upload_limit);
crate::impl_from_ref!(Instant, start_time);
