//! # Telemetry
//!
//! Tracing integration for bulk operations: subscriber initialization for
//! binaries and tests, plus the [`BulkTelemetry`] hook trait the engine
//! notifies at batch and item boundaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};
use uuid::Uuid;

use crate::config::BulkMode;
use crate::outcome::{BatchSummary, ItemFailure};

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for tracing.
    pub service_name: String,
    /// Log level filter.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "chronos-bulk".to_string(),
            log_level: "INFO".to_string(),
        }
    }
}

/// Telemetry guard - must be kept alive for tracing to work.
pub struct TelemetryGuard;

impl TelemetryGuard {
    pub fn shutdown(self) {}
}

/// Initialize tracing for the bulk engine.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::new(&config.log_level);

    Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    TelemetryGuard
}

/// Hooks invoked by the engine as a batch progresses.
///
/// Implementations must be cheap and non-blocking; they run on the worker
/// tasks.
pub trait BulkTelemetry: Send + Sync {
    /// A batch has been admitted and is about to dispatch.
    fn on_batch_start(&self, request_id: Uuid, mode: BulkMode, total: usize);

    /// An item reached a failed terminal outcome.
    fn on_item_failure(&self, request_id: Uuid, index: usize, failure: &ItemFailure);

    /// A compensating delete finished.
    fn on_compensation(&self, request_id: Uuid, index: usize, succeeded: bool);

    /// The batch reached its terminal phase.
    fn on_batch_complete(&self, request_id: Uuid, summary: &BatchSummary);
}

/// Default tracing-backed implementation.
#[derive(Debug, Default)]
pub struct DefaultBulkTelemetry;

impl DefaultBulkTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl BulkTelemetry for DefaultBulkTelemetry {
    fn on_batch_start(&self, request_id: Uuid, mode: BulkMode, total: usize) {
        tracing::info!(request_id = %request_id, mode = %mode, total, "bulk batch started");
    }

    fn on_item_failure(&self, request_id: Uuid, index: usize, failure: &ItemFailure) {
        tracing::warn!(
            request_id = %request_id,
            index,
            kind = %failure.kind,
            error = %failure.message,
            "bulk item failed"
        );
    }

    fn on_compensation(&self, request_id: Uuid, index: usize, succeeded: bool) {
        tracing::info!(request_id = %request_id, index, succeeded, "compensation recorded");
    }

    fn on_batch_complete(&self, request_id: Uuid, summary: &BatchSummary) {
        tracing::info!(
            request_id = %request_id,
            requested = summary.requested,
            succeeded = summary.succeeded,
            failed = summary.failed,
            compensated = summary.compensated,
            rolled_back = summary.rolled_back,
            "bulk batch finished"
        );
    }
}
