//! # Bulk Operation Configuration
//!
//! [`BulkOptions`] controls how a batch executes: the consistency mode, the
//! concurrency budget, the per-item timeout and dry-run substitution.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default number of items in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Upper clamp on concurrency, protecting the remote server from overload.
pub const MAX_CONCURRENCY: usize = 20;

/// Default per-item timeout.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors, rejected before any item is dispatched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_concurrency must be greater than zero")]
    ZeroConcurrency,

    #[error("timeout_per_item must be greater than zero")]
    ZeroTimeout,

    #[error("unknown bulk mode: {0} (expected one of: continue, fail_fast, atomic)")]
    UnknownMode(String),
}

/// Consistency policy governing how a batch reacts to a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkMode {
    /// Abort on the first failure and undo every create that succeeded.
    #[serde(rename = "atomic")]
    Atomic,
    /// Stop admitting new items on the first failure; in-flight items
    /// finish, the rest are never attempted.
    #[serde(rename = "fail_fast")]
    FailFast,
    /// Run every item regardless of failures; partial success is an
    /// expected final state.
    #[serde(rename = "continue")]
    ContinueOnError,
}

impl BulkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkMode::Atomic => "atomic",
            BulkMode::FailFast => "fail_fast",
            BulkMode::ContinueOnError => "continue",
        }
    }
}

impl std::fmt::Display for BulkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(BulkMode::Atomic),
            "fail_fast" => Ok(BulkMode::FailFast),
            "continue" => Ok(BulkMode::ContinueOnError),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Options for one bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOptions {
    /// Consistency mode for the batch.
    pub mode: BulkMode,
    /// Maximum items in flight at once.
    pub max_concurrency: usize,
    /// Timeout applied to each individual remote call.
    pub timeout_per_item: Duration,
    /// Run the full orchestration without contacting the remote store.
    pub dry_run: bool,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            mode: BulkMode::ContinueOnError,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_per_item: DEFAULT_ITEM_TIMEOUT,
            dry_run: false,
        }
    }
}

impl BulkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: BulkMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn with_timeout_per_item(mut self, timeout: Duration) -> Self {
        self.timeout_per_item = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate the options and clamp the concurrency budget.
    ///
    /// Zero concurrency or a zero timeout is a configuration error; a
    /// budget above [`MAX_CONCURRENCY`] is clamped rather than rejected.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.timeout_per_item.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_concurrency > MAX_CONCURRENCY {
            tracing::warn!(
                requested = self.max_concurrency,
                clamped = MAX_CONCURRENCY,
                "max_concurrency above the server protection limit, clamping"
            );
            self.max_concurrency = MAX_CONCURRENCY;
        }
        Ok(self)
    }
}
