//! Protocol client port: one remote create or delete per call.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::batch::ComponentKind;

/// Errors from the protocol client, classified before they reach the
/// engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("remote server rejected the operation: {0}")]
    Rejected(String),

    #[error("component not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("remote call timed out: {0}")]
    Timeout(String),
}

/// A client performing single operations against the remote calendar store.
///
/// Implementations perform exactly one round trip per call, no retries.
/// A delete of an already-absent identifier must report
/// [`ClientError::NotFound`] rather than silently succeed, since the
/// consistency modes need an accurate success/failure signal.
#[async_trait]
pub trait CalendarClient: Send + Sync + 'static {
    /// Create a component and return the identifier assigned by the store.
    async fn create_component(
        &self,
        kind: ComponentKind,
        calendar_uid: &str,
        payload: &Value,
    ) -> Result<String, ClientError>;

    /// Delete the component with the given identifier.
    async fn delete_component(
        &self,
        kind: ComponentKind,
        calendar_uid: &str,
        uid: &str,
    ) -> Result<(), ClientError>;
}
