//! # Item Executor
//!
//! Performs exactly one remote call for one batch item: a create or a
//! delete, bounded by the per-item timeout. No retries, no payload
//! validation; both are handled upstream. The dry-run form never touches a
//! client and reports synthetic success.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::batch::{BatchItem, ItemAction};
use crate::outcome::{CompensationOutcome, ItemFailure, ItemOutcome};
use crate::port::{CalendarClient, ClientError};

#[derive(Debug)]
enum ExecutorMode<C> {
    Live { client: Arc<C>, timeout: Duration },
    DryRun,
}

/// Adapter over the protocol client executing one item at a time.
#[derive(Debug)]
pub struct ItemExecutor<C: CalendarClient> {
    mode: ExecutorMode<C>,
}

impl<C: CalendarClient> ItemExecutor<C> {
    /// Executor backed by a resolved client, with a per-item timeout.
    pub fn live(client: Arc<C>, timeout: Duration) -> Self {
        Self {
            mode: ExecutorMode::Live { client, timeout },
        }
    }

    /// Executor that reports synthetic success without any remote call.
    pub fn dry_run() -> Self {
        Self {
            mode: ExecutorMode::DryRun,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self.mode, ExecutorMode::DryRun)
    }

    /// Run the item's single remote call and classify the result.
    pub async fn execute(&self, item: &BatchItem) -> ItemOutcome {
        match &self.mode {
            ExecutorMode::DryRun => Self::synthetic_success(item),
            ExecutorMode::Live { client, timeout } => {
                let started = Instant::now();
                match tokio::time::timeout(*timeout, Self::dispatch(client.as_ref(), item)).await {
                    Ok(Ok(uid)) => ItemOutcome::succeeded(uid, started.elapsed()),
                    Ok(Err(error)) => {
                        ItemOutcome::failed(ItemFailure::from_client(&error), started.elapsed())
                    }
                    Err(_) => {
                        ItemOutcome::failed(ItemFailure::timed_out(*timeout), started.elapsed())
                    }
                }
            }
        }
    }

    /// Issue the compensating delete for a previously created component.
    pub async fn compensate(&self, item: &BatchItem, created_uid: &str) -> CompensationOutcome {
        match &self.mode {
            ExecutorMode::DryRun => CompensationOutcome::succeeded(Duration::ZERO),
            ExecutorMode::Live { client, timeout } => {
                let started = Instant::now();
                let call = client.delete_component(item.kind, &item.target_calendar, created_uid);
                match tokio::time::timeout(*timeout, call).await {
                    Ok(Ok(())) => CompensationOutcome::succeeded(started.elapsed()),
                    Ok(Err(error)) => CompensationOutcome::failed(
                        ItemFailure::from_client(&error),
                        started.elapsed(),
                    ),
                    Err(_) => CompensationOutcome::failed(
                        ItemFailure::timed_out(*timeout),
                        started.elapsed(),
                    ),
                }
            }
        }
    }

    async fn dispatch(client: &C, item: &BatchItem) -> Result<Option<String>, ClientError> {
        match &item.action {
            ItemAction::Create { payload } => client
                .create_component(item.kind, &item.target_calendar, payload)
                .await
                .map(Some),
            ItemAction::Delete { target_uid } => client
                .delete_component(item.kind, &item.target_calendar, target_uid)
                .await
                .map(|_| None),
        }
    }

    fn synthetic_success(item: &BatchItem) -> ItemOutcome {
        let uid = item
            .is_create()
            .then(|| format!("dry-run-uid-{}", item.index));
        ItemOutcome::succeeded(uid, Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ComponentKind;
    use crate::outcome::FailureKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct ScriptedClient {
        calls: AtomicUsize,
        create_delay: Option<Duration>,
        create_result: Option<ClientError>,
        delete_result: Option<ClientError>,
    }

    #[async_trait]
    impl CalendarClient for ScriptedClient {
        async fn create_component(
            &self,
            _kind: ComponentKind,
            _calendar_uid: &str,
            _payload: &Value,
        ) -> Result<String, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.create_delay {
                tokio::time::sleep(delay).await;
            }
            match &self.create_result {
                Some(error) => Err(error.clone()),
                None => Ok("uid-created".to_string()),
            }
        }

        async fn delete_component(
            &self,
            _kind: ComponentKind,
            _calendar_uid: &str,
            _uid: &str,
        ) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.delete_result {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    fn create_item(index: usize) -> BatchItem {
        BatchItem::create(index, ComponentKind::Event, json!({"summary": "x"}), "cal")
    }

    #[tokio::test]
    async fn test_create_success_carries_uid() {
        let client = Arc::new(ScriptedClient::default());
        let executor = ItemExecutor::live(client, Duration::from_secs(5));

        let outcome = executor.execute(&create_item(0)).await;
        assert!(outcome.is_succeeded());
        assert_eq!(outcome.uid(), Some("uid-created"));
    }

    #[tokio::test]
    async fn test_delete_success_has_no_uid() {
        let client = Arc::new(ScriptedClient::default());
        let executor = ItemExecutor::live(client, Duration::from_secs(5));
        let item = BatchItem::delete(0, ComponentKind::Task, "uid-9", "cal");

        let outcome = executor.execute(&item).await;
        assert!(outcome.is_succeeded());
        assert_eq!(outcome.uid(), None);
    }

    #[tokio::test]
    async fn test_client_error_is_classified() {
        let client = Arc::new(ScriptedClient {
            create_result: Some(ClientError::NotFound("gone".into())),
            ..Default::default()
        });
        let executor = ItemExecutor::live(client, Duration::from_secs(5));

        let outcome = executor.execute(&create_item(0)).await;
        assert_eq!(outcome.failure().unwrap().kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_slow_call_reports_timeout() {
        let client = Arc::new(ScriptedClient {
            create_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let executor = ItemExecutor::live(client, Duration::from_millis(10));

        let outcome = executor.execute(&create_item(0)).await;
        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_client() {
        let executor = ItemExecutor::<ScriptedClient>::dry_run();
        assert!(executor.is_dry_run());

        let outcome = executor.execute(&create_item(4)).await;
        assert!(outcome.is_succeeded());
        assert_eq!(outcome.uid(), Some("dry-run-uid-4"));

        let delete = BatchItem::delete(1, ComponentKind::Event, "uid", "cal");
        let outcome = executor.execute(&delete).await;
        assert_eq!(outcome.uid(), None);
    }

    #[tokio::test]
    async fn test_compensate_failure_is_recorded_not_raised() {
        let client = Arc::new(ScriptedClient {
            delete_result: Some(ClientError::Network("reset".into())),
            ..Default::default()
        });
        let executor = ItemExecutor::live(client, Duration::from_secs(5));

        let outcome = executor.compensate(&create_item(0), "uid-created").await;
        assert!(!outcome.is_succeeded());
    }
}
