//! Background Jobs for the Inventory API
//!
//! - `warranty_notifier`: mails a batch of upcoming warranty expiries
//!
//! # Usage
//!
//! ```ignore
//! use inventory_api::jobs::{warranty_notifier_task, WarrantyNotifierConfig};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! tokio::spawn(warranty_notifier_task(store, mail, config, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod warranty_notifier;

pub use warranty_notifier::{
    compose_notice, run_once, warranty_notifier_task, WarrantyNotifierConfig,
    WarrantyNotifierMetrics, WarrantyNotifierSnapshot, WarrantyRunSummary,
};
