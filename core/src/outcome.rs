//! # Outcomes and Aggregate Results
//!
//! Terminal per-item outcomes, compensation records produced during
//! rollback, and the aggregate [`BatchResult`] returned to the caller.
//!
//! An [`ItemOutcome`] is written exactly once. A successful create that is
//! later rolled back keeps its original outcome and gains a separate
//! [`CompensationOutcome`], so the forward result stays auditable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::batch::BatchItem;
use crate::config::BulkMode;
use crate::port::ClientError;

/// Classification of an item-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The remote server refused the operation.
    RemoteRejected,
    /// The target component does not exist.
    NotFound,
    /// Transport-level failure, including connection resolution.
    NetworkError,
    /// The per-item timeout elapsed before the call returned.
    Timeout,
    /// The item was never dispatched because the batch halted first.
    NotAttempted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RemoteRejected => "remote_rejected",
            FailureKind::NotFound => "not_found",
            FailureKind::NetworkError => "network_error",
            FailureKind::Timeout => "timeout",
            FailureKind::NotAttempted => "not_attempted",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified item-level failure with its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ItemFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a protocol client error.
    pub fn from_client(error: &ClientError) -> Self {
        let kind = match error {
            ClientError::Rejected(_) => FailureKind::RemoteRejected,
            ClientError::NotFound(_) => FailureKind::NotFound,
            ClientError::Network(_) => FailureKind::NetworkError,
            ClientError::Timeout(_) => FailureKind::Timeout,
        };
        Self::new(kind, error.to_string())
    }

    /// Failure for an item whose per-item timeout elapsed.
    pub fn timed_out(timeout: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("operation timed out after {:?}", timeout),
        )
    }

    /// Synthetic failure for an item that was never dispatched.
    pub fn not_attempted() -> Self {
        Self::new(
            FailureKind::NotAttempted,
            "batch halted before this item was dispatched",
        )
    }
}

/// Terminal outcome of one item.
///
/// Pending items have no outcome recorded; once recorded the outcome never
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded {
        /// Identifier of the created component; `None` for deletes.
        uid: Option<String>,
        latency: Duration,
        completed_at: DateTime<Utc>,
    },
    Failed {
        failure: ItemFailure,
        latency: Duration,
        completed_at: DateTime<Utc>,
    },
}

impl ItemOutcome {
    pub fn succeeded(uid: Option<String>, latency: Duration) -> Self {
        ItemOutcome::Succeeded {
            uid,
            latency,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(failure: ItemFailure, latency: Duration) -> Self {
        ItemOutcome::Failed {
            failure,
            latency,
            completed_at: Utc::now(),
        }
    }

    pub fn not_attempted() -> Self {
        Self::failed(ItemFailure::not_attempted(), Duration::ZERO)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }

    /// Identifier of the created component, when one exists.
    pub fn uid(&self) -> Option<&str> {
        match self {
            ItemOutcome::Succeeded { uid, .. } => uid.as_deref(),
            ItemOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&ItemFailure> {
        match self {
            ItemOutcome::Failed { failure, .. } => Some(failure),
            ItemOutcome::Succeeded { .. } => None,
        }
    }

    pub fn latency(&self) -> Duration {
        match self {
            ItemOutcome::Succeeded { latency, .. } | ItemOutcome::Failed { latency, .. } => {
                *latency
            }
        }
    }
}

/// Outcome of one compensating delete issued during rollback.
///
/// A failed compensation is recorded and logged but never escalated into
/// the item's original outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CompensationOutcome {
    Succeeded {
        latency: Duration,
    },
    Failed {
        failure: ItemFailure,
        latency: Duration,
    },
}

impl CompensationOutcome {
    pub fn succeeded(latency: Duration) -> Self {
        CompensationOutcome::Succeeded { latency }
    }

    pub fn failed(failure: ItemFailure, latency: Duration) -> Self {
        CompensationOutcome::Failed { failure, latency }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, CompensationOutcome::Succeeded { .. })
    }
}

/// One item with its terminal outcome and, after a rollback, its
/// compensation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item: BatchItem,
    pub outcome: ItemOutcome,
    pub compensation: Option<CompensationOutcome>,
}

/// Summary counts over a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of items submitted.
    pub requested: usize,
    /// Successes still standing after any rollback. Zero when
    /// `rolled_back` is true.
    pub succeeded: usize,
    /// Failed outcomes, including items never dispatched.
    pub failed: usize,
    /// Compensating deletes that succeeded.
    pub compensated: usize,
    /// Whether an atomic batch aborted and undid its creates.
    pub rolled_back: bool,
}

/// Aggregate result of one bulk operation, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub mode: BulkMode,
    pub request_id: Uuid,
    pub records: Vec<ItemRecord>,
    pub summary: BatchSummary,
    pub duration: Duration,
}

impl BatchResult {
    /// Assemble the final result, deriving the summary from the records.
    pub fn new(
        mode: BulkMode,
        request_id: Uuid,
        records: Vec<ItemRecord>,
        rolled_back: bool,
        duration: Duration,
    ) -> Self {
        let requested = records.len();
        let raw_succeeded = records.iter().filter(|r| r.outcome.is_succeeded()).count();
        let failed = records.iter().filter(|r| r.outcome.is_failed()).count();
        let compensated = records
            .iter()
            .filter(|r| matches!(&r.compensation, Some(c) if c.is_succeeded()))
            .count();
        let succeeded = if rolled_back { 0 } else { raw_succeeded };

        Self {
            mode,
            request_id,
            records,
            summary: BatchSummary {
                requested,
                succeeded,
                failed,
                compensated,
                rolled_back,
            },
            duration,
        }
    }

    /// True when every item succeeded and nothing was rolled back.
    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0 && !self.summary.rolled_back
    }

    /// True when the batch finished with a mix of successes and failures.
    pub fn is_partial_success(&self) -> bool {
        self.summary.succeeded > 0 && self.summary.succeeded < self.summary.requested
    }

    /// Percentage of requested items that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.summary.requested == 0 {
            0.0
        } else {
            self.summary.succeeded as f64 / self.summary.requested as f64 * 100.0
        }
    }

    /// Records whose outcome is a failure.
    pub fn failures(&self) -> Vec<&ItemRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_failed())
            .collect()
    }

    /// Records whose outcome is a success.
    pub fn successes(&self) -> Vec<&ItemRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_succeeded())
            .collect()
    }
}
