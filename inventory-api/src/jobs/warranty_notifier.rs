//! Warranty Notification Job
//!
//! Finds components whose warranty ends within the horizon and that have not
//! been notified yet, marks each one notified and mails a single batch.
//!
//! Components are marked before the mail goes out, so a failed send does not
//! re-arm them. Concurrent runs are not coordinated and may double-send.
//!
//! # Configuration
//!
//! - `WARRANTY_HORIZON_DAYS`: look-ahead window (default: 30)
//! - `WARRANTY_INTERVAL_SECS`: period of the in-process task (default: 86400)
//! - `WARRANTY_NOTIFIER_ENABLED`: run the in-process task (default: false)

use chrono::{Duration as ChronoDuration, Utc};
use inventory_core::{Component, ConfigError, InventoryResult, Timestamp, DEFAULT_WARRANTY_HORIZON_DAYS};
use inventory_storage::InventoryStore;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::constants::{
    DEFAULT_WARRANTY_INTERVAL_SECS, WARRANTY_MAIL_HEADER, WARRANTY_MAIL_SUBJECT,
};
use crate::mail::{MailConfig, MailTransport};
use crate::telemetry::METRICS;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the warranty notifier.
#[derive(Debug, Clone)]
pub struct WarrantyNotifierConfig {
    /// Look-ahead window in days
    pub horizon_days: i64,

    /// How often the in-process task runs
    pub interval: Duration,

    /// Whether the server spawns the in-process task
    pub enabled: bool,

    pub mail: MailConfig,
}

impl WarrantyNotifierConfig {
    pub fn new(mail: MailConfig) -> Self {
        Self {
            horizon_days: DEFAULT_WARRANTY_HORIZON_DAYS,
            interval: Duration::from_secs(DEFAULT_WARRANTY_INTERVAL_SECS),
            enabled: false,
            mail,
        }
    }

    /// Load from environment variables. Sender and receiver are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(MailConfig::from_env()?);

        if let Ok(raw) = std::env::var("WARRANTY_HORIZON_DAYS") {
            config.horizon_days = raw
                .trim()
                .parse()
                .ok()
                .filter(|d: &i64| *d > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "WARRANTY_HORIZON_DAYS".to_string(),
                    value: raw.clone(),
                    reason: "must be a positive number of days".to_string(),
                })?;
        }

        if let Some(secs) = std::env::var("WARRANTY_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            config.interval = Duration::from_secs(secs);
        }

        config.enabled = std::env::var("WARRANTY_NOTIFIER_ENABLED")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false);

        Ok(config)
    }
}

// ============================================================================
// SINGLE RUN
// ============================================================================

/// Outcome of one notifier run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarrantyRunSummary {
    /// Components found in the window
    pub scanned: usize,
    /// Components flagged as notified
    pub marked: usize,
    /// Components whose flag could not be saved
    pub failed: usize,
    /// Whether the batch mail was accepted by the transport
    pub sent: bool,
}

/// Mail body listing every component in `due`.
pub fn compose_notice(due: &[Component]) -> String {
    let mut body = format!("{}\n\n", WARRANTY_MAIL_HEADER);
    for component in due {
        let _ = writeln!(
            body,
            "Component {} (ID: {}) is expiring on {}.",
            component.serial_number,
            component.id,
            component.warranty_end_date.format("%Y-%m-%d")
        );
    }
    body
}

/// Scan, mark and mail once.
///
/// Only the scan can fail. Marking is log-and-continue per component and a
/// send failure is logged and reported through [`WarrantyRunSummary::sent`].
#[tracing::instrument(skip_all, fields(horizon_days = config.horizon_days))]
pub async fn run_once(
    store: &dyn InventoryStore,
    mail: &dyn MailTransport,
    config: &WarrantyNotifierConfig,
    now: Timestamp,
) -> InventoryResult<WarrantyRunSummary> {
    let until = now + ChronoDuration::days(config.horizon_days);
    let due = store.warranty_expiring(now, until).await?;

    let mut summary = WarrantyRunSummary {
        scanned: due.len(),
        ..Default::default()
    };
    if due.is_empty() {
        tracing::info!("No components with expiring warranties found");
        return Ok(summary);
    }
    tracing::info!(count = due.len(), "Found components with expiring warranties");

    let body = compose_notice(&due);

    for component in &due {
        match store.mark_notified(component.id).await {
            Ok(()) => summary.marked += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::error!(component_id = component.id, error = %e, "Failed to mark component notified");
            }
        }
    }

    match mail
        .send(&config.mail.sender, &config.mail.receiver, WARRANTY_MAIL_SUBJECT, &body)
        .await
    {
        Ok(()) => {
            summary.sent = true;
            tracing::info!(count = due.len(), receiver = %config.mail.receiver, "Warranty notice sent");
        }
        Err(e) => tracing::error!(error = %e, "Failed to send warranty notice"),
    }

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_warranty_outcome("marked", summary.marked as u64);
        metrics.record_warranty_outcome("mark_failed", summary.failed as u64);
        metrics.record_warranty_outcome(if summary.sent { "sent" } else { "send_failed" }, 1);
    }

    Ok(summary)
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters accumulated by the periodic task.
#[derive(Debug, Default)]
pub struct WarrantyNotifierMetrics {
    pub runs: AtomicU64,
    pub components_marked: AtomicU64,
    pub mark_failures: AtomicU64,
    pub mails_sent: AtomicU64,
    /// Failed scans and failed sends
    pub errors: AtomicU64,
}

impl WarrantyNotifierMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, summary: &WarrantyRunSummary) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.components_marked
            .fetch_add(summary.marked as u64, Ordering::Relaxed);
        self.mark_failures
            .fetch_add(summary.failed as u64, Ordering::Relaxed);
        if summary.sent {
            self.mails_sent.fetch_add(1, Ordering::Relaxed);
        } else if summary.scanned > 0 {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> WarrantyNotifierSnapshot {
        WarrantyNotifierSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            components_marked: self.components_marked.load(Ordering::Relaxed),
            mark_failures: self.mark_failures.load(Ordering::Relaxed),
            mails_sent: self.mails_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarrantyNotifierSnapshot {
    pub runs: u64,
    pub components_marked: u64,
    pub mark_failures: u64,
    pub mails_sent: u64,
    pub errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run [`run_once`] every `config.interval` until `shutdown_rx` flips to true.
pub async fn warranty_notifier_task(
    store: Arc<dyn InventoryStore>,
    mail: Arc<dyn MailTransport>,
    config: WarrantyNotifierConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<WarrantyNotifierMetrics> {
    let metrics = Arc::new(WarrantyNotifierMetrics::new());

    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        horizon_days = config.horizon_days,
        "Warranty notifier task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Warranty notifier task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                match run_once(store.as_ref(), mail.as_ref(), &config, Utc::now()).await {
                    Ok(summary) => metrics.record(&summary),
                    Err(e) => {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(error = %e, "Warranty scan failed");
                    }
                }
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        runs = snapshot.runs,
        components_marked = snapshot.components_marked,
        mails_sent = snapshot.mails_sent,
        errors = snapshot.errors,
        "Warranty notifier task completed"
    );

    metrics
}
