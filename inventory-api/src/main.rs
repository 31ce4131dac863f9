//! Vinventory API Server Entry Point
//!
//! Without arguments the binary serves the REST API. Invoked as
//! `inventory-api notification_job` it runs the warranty notifier once and
//! exits, for use from a scheduler.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use inventory_api::constants::NOTIFICATION_JOB_ARG;
use inventory_api::jobs::{run_once, warranty_notifier_task, WarrantyNotifierConfig};
use inventory_api::telemetry::{init_tracer, TelemetryConfig};
use inventory_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthMiddlewareState,
    AzureConfig, DbClient, DbConfig, GraphDirectory, JwtVerifier, MailTransport,
    ObjectStoreConfig, S3ObjectStore, SesMailTransport,
};
use inventory_storage::InventoryStore;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracer(&TelemetryConfig::default())?;

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    if db_config.apply_schema {
        db.apply_schema().await?;
    }
    let store: Arc<dyn InventoryStore> = Arc::new(db);

    if std::env::args().nth(1).as_deref() == Some(NOTIFICATION_JOB_ARG) {
        return run_notification_job(store).await;
    }
    serve(store).await
}

fn startup_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::internal_error(format!("Startup failed: {}", err))
}

async fn run_notification_job(store: Arc<dyn InventoryStore>) -> ApiResult<()> {
    let config = WarrantyNotifierConfig::from_env().map_err(startup_error)?;
    let mail = SesMailTransport::from_config(&config.mail).await;
    let summary = run_once(store.as_ref(), &mail, &config, Utc::now()).await?;
    tracing::info!(
        scanned = summary.scanned,
        marked = summary.marked,
        failed = summary.failed,
        sent = summary.sent,
        "Notification job finished"
    );
    Ok(())
}

async fn serve(store: Arc<dyn InventoryStore>) -> ApiResult<()> {
    let api_config = ApiConfig::from_env();
    let azure = AzureConfig::from_env().map_err(startup_error)?;

    let identity = Arc::new(GraphDirectory::new(
        azure.clone(),
        api_config.identity_timeout,
    )?);
    let object_store_config = ObjectStoreConfig::from_env().map_err(startup_error)?;
    let object_store = Arc::new(S3ObjectStore::from_config(&object_store_config).await);
    let verifier = JwtVerifier::from_azure(&azure, api_config.identity_timeout)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    match WarrantyNotifierConfig::from_env() {
        Ok(config) if config.enabled => {
            let mail: Arc<dyn MailTransport> =
                Arc::new(SesMailTransport::from_config(&config.mail).await);
            tokio::spawn(warranty_notifier_task(store.clone(), mail, config, shutdown_rx));
        }
        Ok(_) => tracing::info!("Warranty notifier disabled"),
        Err(e) => tracing::warn!(error = %e, "Warranty notifier not started"),
    }

    let state = AppState::new(store, identity, object_store, &api_config, azure.public());
    let app = create_api_router(state, &api_config, AuthMiddlewareState::new(verifier));

    let addr: SocketAddr = api_config.bind_addr.parse().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", api_config.bind_addr, e))
    })?;
    tracing::info!(%addr, environment = %api_config.environment, "Starting Vinventory API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    Ok(())
}
