//! # Mode Controller
//!
//! Tracks the batch-level state machine and decides, as outcomes land,
//! whether new items may still be admitted.
//!
//! Phases: `Admitting → Draining → (Completed | Aborting → RollingBack →
//! Aborted)`. Under `FailFast` and `Atomic` the controller reacts to the
//! first failure the ledger observes; when several items fail concurrently,
//! completion order decides which one trips the halt. That is a documented
//! non-determinism, not a bug.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::config::BulkMode;

/// Lifecycle phase of a batch as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    /// New items are still being dispatched.
    Admitting,
    /// Admission finished or halted; in-flight items are completing.
    Draining,
    /// An atomic batch failed and is about to roll back.
    Aborting,
    /// Compensating deletes are in flight.
    RollingBack,
    /// Terminal: batch finished without rollback.
    Completed,
    /// Terminal: batch finished after rollback.
    Aborted,
}

/// Interprets the ledger against the selected consistency mode.
#[derive(Debug)]
pub struct ModeController {
    mode: BulkMode,
    halted: AtomicBool,
    first_failure: Mutex<Option<usize>>,
    phase: Mutex<BatchPhase>,
}

impl ModeController {
    pub fn new(mode: BulkMode) -> Self {
        Self {
            mode,
            halted: AtomicBool::new(false),
            first_failure: Mutex::new(None),
            phase: Mutex::new(BatchPhase::Admitting),
        }
    }

    pub fn mode(&self) -> BulkMode {
        self.mode
    }

    /// Whether a not-yet-dispatched item may still be admitted.
    pub fn should_admit(&self) -> bool {
        !self.halted.load(Ordering::SeqCst)
    }

    /// Called by a worker after its failed outcome has been recorded.
    ///
    /// Latches the first failure observed and, outside of
    /// `ContinueOnError`, stops further admission. In-flight items are
    /// never cancelled; they run to completion and are recorded.
    pub fn observe_failure(&self, index: usize) {
        {
            let mut first = self.first_failure.lock().unwrap();
            if first.is_none() {
                *first = Some(index);
            }
        }
        if self.mode != BulkMode::ContinueOnError {
            self.halted.store(true, Ordering::SeqCst);
        }
    }

    /// Whether any failure has been observed so far.
    pub fn saw_failure(&self) -> bool {
        self.first_failure.lock().unwrap().is_some()
    }

    /// Index of the first failure observed, by completion order.
    pub fn first_failure(&self) -> Option<usize> {
        *self.first_failure.lock().unwrap()
    }

    pub fn phase(&self) -> BatchPhase {
        *self.phase.lock().unwrap()
    }

    /// Admission is over; in-flight items are draining.
    pub fn begin_draining(&self) {
        *self.phase.lock().unwrap() = BatchPhase::Draining;
    }

    /// An atomic batch failed; control passes to the rollback coordinator.
    pub fn begin_abort(&self) {
        *self.phase.lock().unwrap() = BatchPhase::Aborting;
    }

    /// Compensating deletes are being issued.
    pub fn begin_rollback(&self) {
        *self.phase.lock().unwrap() = BatchPhase::RollingBack;
    }

    /// Move to the terminal phase.
    pub fn complete(&self, rolled_back: bool) {
        *self.phase.lock().unwrap() = if rolled_back {
            BatchPhase::Aborted
        } else {
            BatchPhase::Completed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_on_error_never_halts() {
        let controller = ModeController::new(BulkMode::ContinueOnError);
        controller.observe_failure(3);
        controller.observe_failure(1);

        assert!(controller.should_admit());
        assert!(controller.saw_failure());
        assert_eq!(controller.first_failure(), Some(3));
    }

    #[test]
    fn test_fail_fast_halts_on_first_failure() {
        let controller = ModeController::new(BulkMode::FailFast);
        assert!(controller.should_admit());

        controller.observe_failure(2);
        assert!(!controller.should_admit());
        assert_eq!(controller.first_failure(), Some(2));
    }

    #[test]
    fn test_atomic_halts_like_fail_fast() {
        let controller = ModeController::new(BulkMode::Atomic);
        controller.observe_failure(0);
        assert!(!controller.should_admit());
    }

    #[test]
    fn test_first_failure_latches_by_observation_order() {
        let controller = ModeController::new(BulkMode::FailFast);
        controller.observe_failure(7);
        controller.observe_failure(0);
        assert_eq!(controller.first_failure(), Some(7));
    }

    #[test]
    fn test_phase_transitions() {
        let controller = ModeController::new(BulkMode::Atomic);
        assert_eq!(controller.phase(), BatchPhase::Admitting);

        controller.begin_draining();
        assert_eq!(controller.phase(), BatchPhase::Draining);

        controller.begin_abort();
        assert_eq!(controller.phase(), BatchPhase::Aborting);

        controller.begin_rollback();
        assert_eq!(controller.phase(), BatchPhase::RollingBack);

        controller.complete(true);
        assert_eq!(controller.phase(), BatchPhase::Aborted);
    }

    #[test]
    fn test_completed_without_rollback() {
        let controller = ModeController::new(BulkMode::ContinueOnError);
        controller.begin_draining();
        controller.complete(false);
        assert_eq!(controller.phase(), BatchPhase::Completed);
    }
}
