use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chronos_bulk_core::{
    AccountResolver, BulkEngine, BulkMode, BulkOptions, CalendarClient, ClientError,
    ComponentDraft, ComponentKind, ComponentRef, FailureKind, ResolveError,
};

// --- Mocks ---

/// In-memory calendar store driven by payload markers:
/// `{"reject": true}` fails the create, `{"delay_ms": n}` delays the call.
#[derive(Debug, Default)]
struct MockClient {
    store: DashMap<String, Value>,
    next_uid: AtomicUsize,
    creates: AtomicUsize,
    deletes: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    latency: Duration,
}

impl MockClient {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    fn seed(&self, uid: &str, payload: Value) {
        self.store.insert(uid.to_string(), payload);
    }

    fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn enter(&self, payload: Option<&Value>) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(delay) = payload
            .and_then(|p| p.get("delay_ms"))
            .and_then(Value::as_u64)
        {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarClient for MockClient {
    async fn create_component(
        &self,
        _kind: ComponentKind,
        _calendar_uid: &str,
        payload: &Value,
    ) -> Result<String, ClientError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.enter(Some(payload)).await;
        let result = if payload.get("reject").and_then(Value::as_bool) == Some(true) {
            Err(ClientError::Rejected("server refused the component".into()))
        } else {
            let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst));
            self.store.insert(uid.clone(), payload.clone());
            Ok(uid)
        };
        self.exit();
        result
    }

    async fn delete_component(
        &self,
        _kind: ComponentKind,
        _calendar_uid: &str,
        uid: &str,
    ) -> Result<(), ClientError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.enter(None).await;
        let result = match self.store.remove(uid) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(uid.to_string())),
        };
        self.exit();
        result
    }
}

#[derive(Debug)]
struct StaticResolver {
    client: Arc<MockClient>,
}

#[async_trait]
impl AccountResolver for StaticResolver {
    type Client = MockClient;

    async fn resolve(&self, _alias: Option<&str>) -> Result<Arc<MockClient>, ResolveError> {
        Ok(Arc::clone(&self.client))
    }
}

fn engine_over(client: &Arc<MockClient>) -> BulkEngine<StaticResolver> {
    BulkEngine::new(Arc::new(StaticResolver {
        client: Arc::clone(client),
    }))
}

fn drafts(n: usize) -> Vec<ComponentDraft> {
    (0..n)
        .map(|i| ComponentDraft::event(json!({"summary": format!("event-{i}")})))
        .collect()
}

// --- Tests ---

#[tokio::test]
async fn test_continue_on_error_runs_every_item() {
    let client = Arc::new(MockClient::default());
    let engine = engine_over(&client);

    let mut batch = drafts(5);
    batch[2] = ComponentDraft::event(json!({"summary": "bad", "reject": true}));

    let result = engine
        .bulk_create("cal", None, batch, BulkOptions::default())
        .await
        .unwrap();

    assert_eq!(result.records.len(), 5);
    assert_eq!(result.summary.requested, 5);
    assert_eq!(result.summary.succeeded, 4);
    assert_eq!(result.summary.failed, 1);
    assert!(!result.summary.rolled_back);
    assert!(result.is_partial_success());

    // No item was skipped: the only failure is the rejected one.
    for record in &result.records {
        if let Some(failure) = record.outcome.failure() {
            assert_eq!(failure.kind, FailureKind::RemoteRejected);
            assert_eq!(record.item.index, 2);
        }
    }
    assert_eq!(client.store.len(), 4);
}

#[tokio::test]
async fn test_fail_fast_stops_admission_after_first_failure() {
    let client = Arc::new(MockClient::default());
    let engine = engine_over(&client);

    let mut batch = drafts(5);
    batch[1] = ComponentDraft::event(json!({"summary": "bad", "reject": true}));

    let result = engine
        .bulk_create(
            "cal",
            None,
            batch,
            BulkOptions::new()
                .with_mode(BulkMode::FailFast)
                .with_max_concurrency(1),
        )
        .await
        .unwrap();

    assert_eq!(result.records.len(), 5);
    assert!(result.records[0].outcome.is_succeeded());
    assert_eq!(
        result.records[1].outcome.failure().unwrap().kind,
        FailureKind::RemoteRejected
    );
    for record in &result.records[2..] {
        assert_eq!(
            record.outcome.failure().unwrap().kind,
            FailureKind::NotAttempted
        );
    }

    // Only the two admitted items ever reached the store.
    assert_eq!(client.creates.load(Ordering::SeqCst), 2);
    assert!(!result.summary.rolled_back);
    assert_eq!(result.summary.succeeded, 1);
    assert_eq!(result.summary.failed, 4);
}

#[tokio::test]
async fn test_atomic_rollback_undoes_succeeded_creates() {
    let client = Arc::new(MockClient::default());
    let engine = engine_over(&client);

    // Item 2 fails slowly so every other item is admitted before the
    // failure lands; 0, 1, 3 and 4 succeed and must all be compensated.
    let mut batch = drafts(5);
    batch[2] = ComponentDraft::event(json!({"summary": "bad", "reject": true, "delay_ms": 100}));

    let result = engine
        .bulk_create(
            "cal",
            None,
            batch,
            BulkOptions::new()
                .with_mode(BulkMode::Atomic)
                .with_max_concurrency(2),
        )
        .await
        .unwrap();

    assert_eq!(result.records.len(), 5);
    assert!(result.summary.rolled_back);
    assert_eq!(result.summary.succeeded, 0);
    assert_eq!(result.summary.compensated, 4);
    assert_eq!(
        result.records[2].outcome.failure().unwrap().kind,
        FailureKind::RemoteRejected
    );
    for record in &result.records {
        if record.outcome.is_succeeded() {
            let compensation = record
                .compensation
                .as_ref()
                .expect("every succeeded create must be compensated");
            assert!(compensation.is_succeeded());
        } else {
            assert!(record.compensation.is_none());
        }
    }

    // All compensating deletes went through: the store is clean again.
    assert_eq!(client.store.len(), 0);
    assert_eq!(client.deletes.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_atomic_all_success_keeps_everything() {
    let client = Arc::new(MockClient::default());
    let engine = engine_over(&client);

    let result = engine
        .bulk_create(
            "cal",
            None,
            drafts(4),
            BulkOptions::new().with_mode(BulkMode::Atomic),
        )
        .await
        .unwrap();

    assert!(result.all_succeeded());
    assert!(!result.summary.rolled_back);
    assert_eq!(result.summary.succeeded, 4);
    assert!(result.records.iter().all(|r| r.compensation.is_none()));
    assert_eq!(client.store.len(), 4);
    assert_eq!(client.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_atomic_deletes_degrade_to_fail_fast() {
    let client = Arc::new(MockClient::default());
    client.seed("uid-a", json!({"summary": "a"}));
    client.seed("uid-c", json!({"summary": "c"}));
    let engine = engine_over(&client);

    let refs = vec![
        ComponentRef::event("uid-a"),
        ComponentRef::event("uid-missing"),
        ComponentRef::event("uid-c"),
    ];
    let result = engine
        .bulk_delete(
            "cal",
            None,
            refs,
            BulkOptions::new()
                .with_mode(BulkMode::Atomic)
                .with_max_concurrency(1),
        )
        .await
        .unwrap();

    assert!(result.records[0].outcome.is_succeeded());
    assert_eq!(
        result.records[1].outcome.failure().unwrap().kind,
        FailureKind::NotFound
    );
    assert_eq!(
        result.records[2].outcome.failure().unwrap().kind,
        FailureKind::NotAttempted
    );

    // No inverse exists for a delete: nothing is compensated and the
    // batch is not reported as rolled back.
    assert!(!result.summary.rolled_back);
    assert!(result.records.iter().all(|r| r.compensation.is_none()));
    assert_eq!(result.summary.succeeded, 1);

    // The succeeded delete stays deleted; the never-attempted one remains.
    assert!(!client.store.contains_key("uid-a"));
    assert!(client.store.contains_key("uid-c"));
}

#[tokio::test]
async fn test_dry_run_never_contacts_the_store() {
    let client = Arc::new(MockClient::default());
    let engine = engine_over(&client);

    let batch = || {
        vec![
            ComponentDraft::event(json!({"summary": "a"})),
            ComponentDraft::event(json!({"summary": "bad", "reject": true})),
            ComponentDraft::event(json!({"summary": "c"})),
        ]
    };
    let options = BulkOptions::new()
        .with_mode(BulkMode::Atomic)
        .with_dry_run(true);

    let first = engine
        .bulk_create("cal", None, batch(), options.clone())
        .await
        .unwrap();
    let second = engine
        .bulk_create("cal", None, batch(), options)
        .await
        .unwrap();

    assert_eq!(client.creates.load(Ordering::SeqCst), 0);
    assert_eq!(client.deletes.load(Ordering::SeqCst), 0);
    assert_eq!(client.store.len(), 0);

    // Synthetic success for every item, structurally identical runs.
    for result in [&first, &second] {
        assert!(result.all_succeeded());
        assert!(!result.summary.rolled_back);
        assert_eq!(result.records[1].outcome.uid(), Some("dry-run-uid-1"));
    }
    for (a, b) in first.records.iter().zip(second.records.iter()) {
        assert_eq!(a.outcome.is_succeeded(), b.outcome.is_succeeded());
        assert_eq!(a.outcome.uid(), b.outcome.uid());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gate_bounds_concurrent_executors() {
    let client = Arc::new(MockClient::with_latency(Duration::from_millis(20)));
    let engine = engine_over(&client);

    let result = engine
        .bulk_create(
            "cal",
            None,
            drafts(12),
            BulkOptions::new().with_max_concurrency(3),
        )
        .await
        .unwrap();

    assert!(result.all_succeeded());
    assert!(
        client.max_concurrent() <= 3,
        "observed {} concurrent executors, limit is 3",
        client.max_concurrent()
    );
}

#[tokio::test]
async fn test_delete_batch_continue_on_error_reports_not_found() {
    let client = Arc::new(MockClient::default());
    client.seed("uid-a", json!({}));
    client.seed("uid-b", json!({}));
    let engine = engine_over(&client);

    let refs = vec![
        ComponentRef::task("uid-a"),
        ComponentRef::task("uid-missing"),
        ComponentRef::task("uid-b"),
    ];
    let result = engine
        .bulk_delete("cal", None, refs, BulkOptions::default())
        .await
        .unwrap();

    assert_eq!(result.summary.succeeded, 2);
    assert_eq!(result.summary.failed, 1);
    assert_eq!(
        result.records[1].outcome.failure().unwrap().kind,
        FailureKind::NotFound
    );
    assert_eq!(client.store.len(), 0);
}

#[tokio::test]
async fn test_empty_batch_makes_no_calls() {
    let client = Arc::new(MockClient::default());
    let engine = engine_over(&client);

    let result = engine
        .bulk_delete("cal", None, Vec::new(), BulkOptions::default())
        .await
        .unwrap();

    assert_eq!(result.summary.requested, 0);
    assert_eq!(result.summary.failed, 0);
    assert_eq!(client.creates.load(Ordering::SeqCst), 0);
    assert_eq!(client.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_every_record_keeps_submission_order() {
    let client = Arc::new(MockClient::with_latency(Duration::from_millis(5)));
    let engine = engine_over(&client);

    let result = engine
        .bulk_create(
            "cal",
            None,
            drafts(8),
            BulkOptions::new().with_max_concurrency(4),
        )
        .await
        .unwrap();

    for (position, record) in result.records.iter().enumerate() {
        assert_eq!(record.item.index, position);
    }
}
