//! # Concurrency Gate
//!
//! Bounds how many item executions are active at once. Admission is
//! FIFO-fair with respect to the order `admit` is called; completion order
//! is unconstrained. The permit releases its slot on every exit path,
//! including panics, because release happens on drop.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ConfigError;

/// A slot in the gate, held for the duration of one guarded unit of work.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

/// Bounded admission over a fair semaphore.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `limit` units at once.
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    /// Block until a slot is free, then take it.
    pub async fn admit(&self) -> GatePermit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed");
        GatePermit { _permit: permit }
    }

    /// Configured concurrency limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_limit_rejected() {
        let err = ConcurrencyGate::new(0).unwrap_err();
        assert_eq!(err, ConfigError::ZeroConcurrency);
    }

    #[tokio::test]
    async fn test_permit_frees_slot_on_drop() {
        let gate = ConcurrencyGate::new(2).unwrap();
        assert_eq!(gate.available(), 2);

        let first = gate.admit().await;
        let second = gate.admit().await;
        assert_eq!(gate.available(), 0);

        drop(first);
        assert_eq!(gate.available(), 1);
        drop(second);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ceiling_holds_under_load() {
        let gate = Arc::new(ConcurrencyGate::new(3).unwrap());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let gate = Arc::clone(&gate);
            let active = Arc::clone(&active);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _permit = gate.admit().await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }
}
