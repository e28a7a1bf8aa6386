//! # Outcome Ledger
//!
//! Per-batch bookkeeping shared by every concurrent unit of work. One lock
//! guards a slot table indexed by submission position; outcomes are
//! write-once and snapshots are point-in-time consistent.

use std::sync::Mutex;
use thiserror::Error;

use crate::batch::BatchItem;
use crate::outcome::{CompensationOutcome, ItemOutcome, ItemRecord};

/// Ledger misuse errors. These indicate a bug in the orchestration, not a
/// runtime condition, and never reach the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("index {index} is outside the batch (size {size})")]
    OutOfBounds { index: usize, size: usize },

    #[error("outcome for index {0} was already recorded")]
    AlreadyRecorded(usize),

    #[error("compensation for index {0} was already recorded")]
    CompensationAlreadyRecorded(usize),

    #[error("compensation for index {0} requires a recorded outcome")]
    CompensationBeforeOutcome(usize),
}

#[derive(Debug, Default, Clone)]
struct Slot {
    outcome: Option<ItemOutcome>,
    compensation: Option<CompensationOutcome>,
}

/// Point-in-time view of the ledger, partitioned by state.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    /// Succeeded indices with the created identifier, when one exists.
    pub succeeded: Vec<(usize, Option<String>)>,
    /// Indices with a failed outcome.
    pub failed: Vec<usize>,
    /// Indices with no outcome yet.
    pub pending: Vec<usize>,
}

impl LedgerSnapshot {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True once every item has a terminal outcome.
    pub fn is_fully_terminal(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Thread-safe, write-once outcome table for one batch.
#[derive(Debug)]
pub struct OutcomeLedger {
    slots: Mutex<Vec<Slot>>,
}

impl OutcomeLedger {
    /// Create a ledger with one pending slot per batch item.
    pub fn new(size: usize) -> Self {
        Self {
            slots: Mutex::new(vec![Slot::default(); size]),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }

    /// Record the terminal outcome for an item. Write-once per index.
    pub fn record(&self, index: usize, outcome: ItemOutcome) -> Result<(), LedgerError> {
        let mut slots = self.slots.lock().unwrap();
        let size = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(LedgerError::OutOfBounds { index, size })?;
        if slot.outcome.is_some() {
            return Err(LedgerError::AlreadyRecorded(index));
        }
        slot.outcome = Some(outcome);
        Ok(())
    }

    /// Record the compensation outcome for an item during rollback.
    pub fn record_compensation(
        &self,
        index: usize,
        compensation: CompensationOutcome,
    ) -> Result<(), LedgerError> {
        let mut slots = self.slots.lock().unwrap();
        let size = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(LedgerError::OutOfBounds { index, size })?;
        if slot.outcome.is_none() {
            return Err(LedgerError::CompensationBeforeOutcome(index));
        }
        if slot.compensation.is_some() {
            return Err(LedgerError::CompensationAlreadyRecorded(index));
        }
        slot.compensation = Some(compensation);
        Ok(())
    }

    /// Consistent point-in-time view across all indices.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let slots = self.slots.lock().unwrap();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut pending = Vec::new();
        for (index, slot) in slots.iter().enumerate() {
            match &slot.outcome {
                Some(outcome) if outcome.is_succeeded() => {
                    succeeded.push((index, outcome.uid().map(str::to_string)));
                }
                Some(_) => failed.push(index),
                None => pending.push(index),
            }
        }
        LedgerSnapshot {
            succeeded,
            failed,
            pending,
        }
    }

    /// Pair each item with its recorded outcome, in submission order.
    ///
    /// Ledger totality is enforced here: a slot left without an outcome is
    /// reported as `not_attempted` so the caller always receives a complete
    /// result, and the gap is logged as an internal error.
    pub fn finish(&self, items: Vec<BatchItem>) -> Vec<ItemRecord> {
        let slots = self.slots.lock().unwrap();
        debug_assert_eq!(slots.len(), items.len());
        items
            .into_iter()
            .zip(slots.iter())
            .map(|(item, slot)| {
                let outcome = match &slot.outcome {
                    Some(outcome) => outcome.clone(),
                    None => {
                        tracing::error!(
                            index = item.index,
                            "item finished without a terminal outcome, marking not attempted"
                        );
                        ItemOutcome::not_attempted()
                    }
                };
                ItemRecord {
                    item,
                    outcome,
                    compensation: slot.compensation.clone(),
                }
            })
            .collect()
    }
}
