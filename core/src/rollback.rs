//! # Rollback Coordinator
//!
//! Undoes the succeeded creates of an aborted atomic batch by issuing
//! compensating deletes through the same executor and concurrency gate used
//! for forward operations. Compensation is best-effort per item: a failed
//! delete is recorded and logged, never retried, and never stops the pass.
//!
//! Delete-type items are not compensated; a delete has no natural inverse.

use std::sync::Arc;
use tokio::task::JoinSet;

use crate::batch::BatchItem;
use crate::executor::ItemExecutor;
use crate::gate::ConcurrencyGate;
use crate::ledger::LedgerSnapshot;
use crate::outcome::CompensationOutcome;
use crate::port::CalendarClient;

/// Issues compensating deletes for an aborted batch.
#[derive(Debug)]
pub struct RollbackCoordinator<C: CalendarClient> {
    executor: Arc<ItemExecutor<C>>,
    gate: Arc<ConcurrencyGate>,
}

impl<C: CalendarClient> RollbackCoordinator<C> {
    pub fn new(executor: Arc<ItemExecutor<C>>, gate: Arc<ConcurrencyGate>) -> Self {
        Self { executor, gate }
    }

    /// Compensate every succeeded create in the snapshot.
    ///
    /// Returns one `(index, outcome)` pair per compensation attempt. The
    /// pass always runs to the end of the eligible set regardless of
    /// individual failures.
    pub async fn run(
        &self,
        items: &[BatchItem],
        snapshot: &LedgerSnapshot,
    ) -> Vec<(usize, CompensationOutcome)> {
        let mut tasks = JoinSet::new();

        for (index, uid) in &snapshot.succeeded {
            let Some(uid) = uid else {
                // Succeeded delete: nothing to undo.
                continue;
            };
            let item = &items[*index];
            if !item.is_create() {
                continue;
            }

            let permit = self.gate.admit().await;
            let executor = Arc::clone(&self.executor);
            let item = item.clone();
            let uid = uid.clone();
            let index = *index;
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = executor.compensate(&item, &uid).await;
                (index, outcome)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    match &outcome {
                        CompensationOutcome::Succeeded { .. } => {
                            tracing::debug!(index, "compensating delete succeeded");
                        }
                        CompensationOutcome::Failed { failure, .. } => {
                            tracing::error!(
                                index,
                                error = %failure.message,
                                "compensating delete failed, continuing rollback"
                            );
                        }
                    }
                    outcomes.push((index, outcome));
                }
                Err(error) => {
                    tracing::error!(error = %error, "compensation task aborted");
                }
            }
        }
        outcomes
    }
}
