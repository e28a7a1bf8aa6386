//! # Bulk Operation Engine
//!
//! The orchestrator behind `bulk_create` / `bulk_delete`. Fans an ordered
//! batch into the concurrency gate, records every terminal outcome in the
//! ledger, lets the mode controller halt admission, and hands aborted
//! atomic batches to the rollback coordinator. The caller always receives a
//! complete [`BatchResult`] for any admitted batch; only configuration
//! errors surface as `Err`.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::batch::{BatchItem, ComponentDraft, ComponentKind, ComponentRef};
use crate::config::{BulkMode, BulkOptions, ConfigError};
use crate::controller::ModeController;
use crate::executor::ItemExecutor;
use crate::gate::ConcurrencyGate;
use crate::ledger::OutcomeLedger;
use crate::outcome::{BatchResult, FailureKind, ItemFailure, ItemOutcome};
use crate::port::{AccountResolver, ResolveError};
use crate::rollback::RollbackCoordinator;
use crate::telemetry::{BulkTelemetry, DefaultBulkTelemetry};

/// Errors surfaced by the public bulk operations.
///
/// Item-level and compensation-level failures are recovered into the
/// result; only misconfiguration rejects the call as a whole.
#[derive(Debug, Error)]
pub enum BulkEngineError {
    #[error("invalid bulk options: {0}")]
    Config(#[from] ConfigError),
}

/// Executes batches of create/delete operations against a remote calendar
/// store under a chosen consistency mode.
pub struct BulkEngine<R>
where
    R: AccountResolver + 'static,
{
    resolver: Arc<R>,
    telemetry: Arc<dyn BulkTelemetry>,
}

impl<R> std::fmt::Debug for BulkEngine<R>
where
    R: AccountResolver + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkEngine").finish()
    }
}

impl<R> BulkEngine<R>
where
    R: AccountResolver + 'static,
{
    /// Create an engine over the given account resolver.
    pub fn new(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            telemetry: Arc::new(DefaultBulkTelemetry),
        }
    }

    /// Replace the telemetry hooks.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn BulkTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Create a batch of components in one logical operation.
    pub async fn bulk_create(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        drafts: Vec<ComponentDraft>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        let items = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| BatchItem::create(index, draft.kind, draft.payload, calendar_uid))
            .collect();
        self.run_batch(items, account, options).await
    }

    /// Delete a batch of components in one logical operation.
    pub async fn bulk_delete(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        refs: Vec<ComponentRef>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        let items = refs
            .into_iter()
            .enumerate()
            .map(|(index, r)| BatchItem::delete(index, r.kind, r.uid, calendar_uid))
            .collect();
        self.run_batch(items, account, options).await
    }

    /// Create multiple events in bulk.
    pub async fn bulk_create_events(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        payloads: Vec<serde_json::Value>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        self.bulk_create_kind(ComponentKind::Event, calendar_uid, account, payloads, options)
            .await
    }

    /// Create multiple tasks in bulk.
    pub async fn bulk_create_tasks(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        payloads: Vec<serde_json::Value>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        self.bulk_create_kind(ComponentKind::Task, calendar_uid, account, payloads, options)
            .await
    }

    /// Create multiple journal entries in bulk.
    pub async fn bulk_create_journals(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        payloads: Vec<serde_json::Value>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        self.bulk_create_kind(
            ComponentKind::Journal,
            calendar_uid,
            account,
            payloads,
            options,
        )
        .await
    }

    /// Delete multiple events in bulk.
    pub async fn bulk_delete_events(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        uids: Vec<String>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        self.bulk_delete_kind(ComponentKind::Event, calendar_uid, account, uids, options)
            .await
    }

    /// Delete multiple tasks in bulk.
    pub async fn bulk_delete_tasks(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        uids: Vec<String>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        self.bulk_delete_kind(ComponentKind::Task, calendar_uid, account, uids, options)
            .await
    }

    /// Delete multiple journal entries in bulk.
    pub async fn bulk_delete_journals(
        &self,
        calendar_uid: &str,
        account: Option<&str>,
        uids: Vec<String>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        self.bulk_delete_kind(ComponentKind::Journal, calendar_uid, account, uids, options)
            .await
    }

    async fn bulk_create_kind(
        &self,
        kind: ComponentKind,
        calendar_uid: &str,
        account: Option<&str>,
        payloads: Vec<serde_json::Value>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        let drafts = payloads
            .into_iter()
            .map(|payload| ComponentDraft::new(kind, payload))
            .collect();
        self.bulk_create(calendar_uid, account, drafts, options).await
    }

    async fn bulk_delete_kind(
        &self,
        kind: ComponentKind,
        calendar_uid: &str,
        account: Option<&str>,
        uids: Vec<String>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        let refs = uids
            .into_iter()
            .map(|uid| ComponentRef::new(kind, uid))
            .collect();
        self.bulk_delete(calendar_uid, account, refs, options).await
    }

    async fn run_batch(
        &self,
        items: Vec<BatchItem>,
        account: Option<&str>,
        options: BulkOptions,
    ) -> Result<BatchResult, BulkEngineError> {
        let options = options.normalized()?;
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        self.telemetry
            .on_batch_start(request_id, options.mode, items.len());

        if items.is_empty() {
            return Ok(self.assemble(
                options.mode,
                request_id,
                items,
                &OutcomeLedger::new(0),
                false,
                started,
            ));
        }

        let gate = Arc::new(ConcurrencyGate::new(options.max_concurrency)?);
        let ledger = Arc::new(OutcomeLedger::new(items.len()));
        let controller = Arc::new(ModeController::new(options.mode));

        // Resolution happens once per batch. Dry runs skip it entirely so
        // the orchestration can be exercised without any network activity.
        let executor: Arc<ItemExecutor<R::Client>> = if options.dry_run {
            Arc::new(ItemExecutor::dry_run())
        } else {
            match self.resolver.resolve(account).await {
                Ok(client) => Arc::new(ItemExecutor::live(client, options.timeout_per_item)),
                Err(error) => {
                    return Ok(self.fail_unresolved(
                        request_id, options.mode, items, &ledger, &error, started,
                    ));
                }
            }
        };

        self.dispatch(&items, request_id, &gate, &ledger, &controller, &executor)
            .await;

        let rolled_back = self
            .maybe_rollback(&items, request_id, &gate, &ledger, &controller, &executor)
            .await;
        controller.complete(rolled_back);

        Ok(self.assemble(options.mode, request_id, items, &ledger, rolled_back, started))
    }

    /// Admit items in submission order, bounded by the gate, and wait for
    /// every dispatched item to reach a terminal outcome.
    async fn dispatch(
        &self,
        items: &[BatchItem],
        request_id: Uuid,
        gate: &Arc<ConcurrencyGate>,
        ledger: &Arc<OutcomeLedger>,
        controller: &Arc<ModeController>,
        executor: &Arc<ItemExecutor<R::Client>>,
    ) {
        let mut workers = JoinSet::new();

        for item in items {
            if !controller.should_admit() {
                Self::record(ledger, item.index, ItemOutcome::not_attempted());
                continue;
            }

            let permit = gate.admit().await;
            // A failure may have landed while this item waited for a slot.
            if !controller.should_admit() {
                drop(permit);
                Self::record(ledger, item.index, ItemOutcome::not_attempted());
                continue;
            }

            let task_item = item.clone();
            let executor = Arc::clone(executor);
            let ledger = Arc::clone(ledger);
            let controller = Arc::clone(controller);
            let telemetry = Arc::clone(&self.telemetry);
            workers.spawn(async move {
                let _permit = permit;
                let outcome = executor.execute(&task_item).await;
                let failure = outcome.failure().cloned();
                Self::record(&ledger, task_item.index, outcome);
                if let Some(failure) = failure {
                    telemetry.on_item_failure(request_id, task_item.index, &failure);
                    controller.observe_failure(task_item.index);
                }
            });
        }

        controller.begin_draining();
        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                tracing::error!(request_id = %request_id, error = %error, "item task aborted");
            }
        }
    }

    /// Roll back an aborted atomic batch. Returns whether a rollback ran.
    ///
    /// Delete batches are never rolled back: a delete has no inverse, so
    /// atomic mode degrades to fail-fast semantics for them.
    async fn maybe_rollback(
        &self,
        items: &[BatchItem],
        request_id: Uuid,
        gate: &Arc<ConcurrencyGate>,
        ledger: &Arc<OutcomeLedger>,
        controller: &Arc<ModeController>,
        executor: &Arc<ItemExecutor<R::Client>>,
    ) -> bool {
        let has_creates = items.iter().any(BatchItem::is_create);
        if controller.mode() != BulkMode::Atomic || !controller.saw_failure() || !has_creates {
            return false;
        }

        controller.begin_abort();
        let snapshot = ledger.snapshot();
        tracing::warn!(
            request_id = %request_id,
            failed = snapshot.failed_count(),
            to_compensate = snapshot.succeeded_count(),
            "atomic batch failed, rolling back succeeded creates"
        );

        controller.begin_rollback();
        let coordinator = RollbackCoordinator::new(Arc::clone(executor), Arc::clone(gate));
        for (index, compensation) in coordinator.run(items, &snapshot).await {
            self.telemetry
                .on_compensation(request_id, index, compensation.is_succeeded());
            if let Err(error) = ledger.record_compensation(index, compensation) {
                tracing::error!(request_id = %request_id, error = %error, "compensation record rejected");
            }
        }
        true
    }

    /// Account resolution failed: every item gets a network-error outcome
    /// and the batch still returns a complete result.
    fn fail_unresolved(
        &self,
        request_id: Uuid,
        mode: BulkMode,
        items: Vec<BatchItem>,
        ledger: &OutcomeLedger,
        error: &ResolveError,
        started: Instant,
    ) -> BatchResult {
        tracing::warn!(
            request_id = %request_id,
            error = %error,
            "account resolution failed, marking every item as a network error"
        );
        let failure = ItemFailure::new(FailureKind::NetworkError, error.to_string());
        for item in &items {
            Self::record(
                ledger,
                item.index,
                ItemOutcome::failed(failure.clone(), Duration::ZERO),
            );
            self.telemetry
                .on_item_failure(request_id, item.index, &failure);
        }
        self.assemble(mode, request_id, items, ledger, false, started)
    }

    fn assemble(
        &self,
        mode: BulkMode,
        request_id: Uuid,
        items: Vec<BatchItem>,
        ledger: &OutcomeLedger,
        rolled_back: bool,
        started: Instant,
    ) -> BatchResult {
        let records = ledger.finish(items);
        let result = BatchResult::new(mode, request_id, records, rolled_back, started.elapsed());
        self.telemetry.on_batch_complete(request_id, &result.summary);
        result
    }

    fn record(ledger: &OutcomeLedger, index: usize, outcome: ItemOutcome) {
        if let Err(error) = ledger.record(index, outcome) {
            tracing::error!(index, error = %error, "outcome ledger rejected a write");
        }
    }
}
