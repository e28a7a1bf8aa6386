//! In-memory implementation of `CalendarClient` for testing.
//!
//! Thread-safe, no network. Supports failure injection by component
//! summary, an optional artificial per-call latency, and a concurrency
//! probe that records the maximum number of simultaneous calls.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use chronos_bulk_core::{CalendarClient, ClientError, ComponentKind};

/// A component held by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredComponent {
    pub kind: ComponentKind,
    pub calendar_uid: String,
    pub payload: Value,
}

/// In-memory calendar client.
///
/// Creates are assigned fresh v4 uids; deletes of absent uids report
/// [`ClientError::NotFound`], matching the protocol client contract.
///
/// # Failure injection
///
/// `reject_summary` marks a summary string; any create whose payload
/// `"summary"` field matches fails with [`ClientError::Rejected`]. This
/// mirrors how a remote server refuses individual components while the
/// rest of the batch proceeds.
#[derive(Debug, Default)]
pub struct InMemoryCalendarClient {
    components: RwLock<HashMap<String, StoredComponent>>,
    rejected_summaries: RwLock<HashSet<String>>,
    latency: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryCalendarClient {
    /// Create an empty in-memory client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an artificial latency to every call, for concurrency tests.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Default::default()
        }
    }

    /// Fail any create whose payload summary equals `summary`.
    pub fn reject_summary(&self, summary: impl Into<String>) {
        self.rejected_summaries.write().insert(summary.into());
    }

    /// Insert a component directly, bypassing the client contract.
    pub fn seed(&self, uid: impl Into<String>, kind: ComponentKind, calendar_uid: &str, payload: Value) {
        self.components.write().insert(
            uid.into(),
            StoredComponent {
                kind,
                calendar_uid: calendar_uid.to_string(),
                payload,
            },
        );
    }

    /// Whether a component with this uid exists.
    pub fn contains(&self, uid: &str) -> bool {
        self.components.read().contains_key(uid)
    }

    /// Number of components currently stored.
    pub fn component_count(&self) -> usize {
        self.components.read().len()
    }

    /// Components stored in the given calendar.
    pub fn components_in(&self, calendar_uid: &str) -> Vec<StoredComponent> {
        self.components
            .read()
            .values()
            .filter(|c| c.calendar_uid == calendar_uid)
            .cloned()
            .collect()
    }

    /// Total create calls observed.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Total delete calls observed.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Clear all data (useful for reusing a client across tests).
    pub fn clear(&self) {
        self.components.write().clear();
        self.rejected_summaries.write().clear();
    }

    async fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn is_rejected(&self, payload: &Value) -> bool {
        match payload.get("summary").and_then(Value::as_str) {
            Some(summary) => self.rejected_summaries.read().contains(summary),
            None => false,
        }
    }
}

#[async_trait]
impl CalendarClient for InMemoryCalendarClient {
    async fn create_component(
        &self,
        kind: ComponentKind,
        calendar_uid: &str,
        payload: &Value,
    ) -> Result<String, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = if self.is_rejected(payload) {
            Err(ClientError::Rejected(format!(
                "server refused {} component",
                kind
            )))
        } else {
            let uid = Uuid::new_v4().to_string();
            self.components.write().insert(
                uid.clone(),
                StoredComponent {
                    kind,
                    calendar_uid: calendar_uid.to_string(),
                    payload: payload.clone(),
                },
            );
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
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = match self.components.write().remove(uid) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(uid.to_string())),
        };
        self.exit();
        result
    }
}
