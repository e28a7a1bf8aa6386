//! # chronos-bulk-core
//!
//! Bulk operation engine for remote calendaring stores. A caller submits an
//! ordered batch of create or delete requests against events, tasks or
//! journal entries, and the engine executes them as one logical unit under
//! a bounded concurrency budget with a configurable consistency mode:
//!
//! - [`BulkMode::Atomic`]: abort on the first failure and undo every create
//!   that already succeeded with compensating deletes.
//! - [`BulkMode::FailFast`]: stop admitting new items on the first failure;
//!   in-flight items finish, the rest are reported as never attempted.
//! - [`BulkMode::ContinueOnError`]: run everything; partial success is an
//!   expected final state.
//!
//! ## Modules
//!
//! - [`batch`]: [`BatchItem`], [`ComponentKind`], [`ComponentDraft`], [`ComponentRef`]
//! - [`outcome`]: [`ItemOutcome`], [`CompensationOutcome`], [`BatchResult`]
//! - [`config`]: [`BulkOptions`], [`BulkMode`]
//! - [`port`]: [`CalendarClient`], [`AccountResolver`] collaborator traits
//! - [`gate`]: [`ConcurrencyGate`] bounding items in flight
//! - [`ledger`]: [`OutcomeLedger`], the write-once outcome table
//! - [`controller`]: [`ModeController`], the batch state machine
//! - [`executor`]: [`ItemExecutor`], one remote call per item
//! - [`rollback`]: [`RollbackCoordinator`], best-effort compensating deletes
//! - [`engine`]: [`BulkEngine`], the public operations
//! - [`telemetry`]: tracing setup and instrumentation hooks
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use chronos_bulk_core::{
//!     AccountResolver, BulkEngine, BulkMode, BulkOptions, CalendarClient, ClientError,
//!     ComponentKind, ResolveError,
//! };
//!
//! struct CaldavClient;
//!
//! #[async_trait]
//! impl CalendarClient for CaldavClient {
//!     async fn create_component(
//!         &self,
//!         _kind: ComponentKind,
//!         _calendar_uid: &str,
//!         _payload: &Value,
//!     ) -> Result<String, ClientError> {
//!         Ok("uid-1".to_string())
//!     }
//!
//!     async fn delete_component(
//!         &self,
//!         _kind: ComponentKind,
//!         _calendar_uid: &str,
//!         _uid: &str,
//!     ) -> Result<(), ClientError> {
//!         Ok(())
//!     }
//! }
//!
//! struct SingleAccount;
//!
//! #[async_trait]
//! impl AccountResolver for SingleAccount {
//!     type Client = CaldavClient;
//!
//!     async fn resolve(&self, _alias: Option<&str>) -> Result<Arc<CaldavClient>, ResolveError> {
//!         Ok(Arc::new(CaldavClient))
//!     }
//! }
//!
//! # async fn demo() -> Result<(), chronos_bulk_core::BulkEngineError> {
//! let engine = BulkEngine::new(Arc::new(SingleAccount));
//! let result = engine
//!     .bulk_create_events(
//!         "team-calendar",
//!         None,
//!         vec![json!({"summary": "standup", "dtstart": "2024-03-01T09:00:00Z"})],
//!         BulkOptions::new()
//!             .with_mode(BulkMode::Atomic)
//!             .with_max_concurrency(4),
//!     )
//!     .await?;
//! assert!(result.all_succeeded());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod controller;
pub mod engine;
pub mod executor;
pub mod gate;
pub mod ledger;
pub mod outcome;
pub mod port;
pub mod rollback;
pub mod telemetry;

pub use batch::{BatchItem, ComponentDraft, ComponentKind, ComponentRef, ItemAction};
pub use config::{
    BulkMode, BulkOptions, ConfigError, DEFAULT_ITEM_TIMEOUT, DEFAULT_MAX_CONCURRENCY,
    MAX_CONCURRENCY,
};
pub use controller::{BatchPhase, ModeController};
pub use engine::{BulkEngine, BulkEngineError};
pub use executor::ItemExecutor;
pub use gate::{ConcurrencyGate, GatePermit};
pub use ledger::{LedgerError, LedgerSnapshot, OutcomeLedger};
pub use outcome::{
    BatchResult, BatchSummary, CompensationOutcome, FailureKind, ItemFailure, ItemOutcome,
    ItemRecord,
};
pub use port::{AccountResolver, CalendarClient, ClientError, ResolveError};
pub use rollback::RollbackCoordinator;
pub use telemetry::{
    init_telemetry, BulkTelemetry, DefaultBulkTelemetry, TelemetryConfig, TelemetryGuard,
};
