//! Account resolver port: supplies a ready-to-use client handle.
//!
//! The resolver is passed into the engine explicitly rather than looked up
//! from process-wide state, so batches stay independently testable.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::client::CalendarClient;

/// Errors from account/connection resolution.
///
/// The engine folds these into a `network_error` outcome for the affected
/// items; they never fail the bulk call itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown account alias: {0}")]
    UnknownAccount(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Resolves a named account to a connected protocol client.
///
/// `alias = None` selects the default account. The returned handle is a
/// read-only dependency for the duration of a batch; connection lifecycle
/// stays with the resolver.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    type Client: CalendarClient;

    async fn resolve(&self, alias: Option<&str>) -> Result<Arc<Self::Client>, ResolveError>;
}
