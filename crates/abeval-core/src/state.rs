//! The single active-run slot shared between the controller and whichever
//! driver (sequencer or poller) currently owns execution.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::accumulator::ProgressAccumulator;
use crate::domain::outcome::InvocationOutcome;
use crate::domain::run::BatchRunState;
use crate::domain::summary::{BatchSummary, HistoryEntry};

/// Everything the coordinator tracks for the one active (or last) run.
///
/// There is never more than one writer at a time — the controller rejects
/// `start()` while a run is active — so the mutex only guards against
/// concurrent presentation-layer reads.
#[derive(Debug, Default)]
pub struct RunShared {
    /// Sole mutator of the live run state.
    pub accumulator: ProgressAccumulator,

    /// Recorded outcomes, strictly in item (or fetch) order.
    pub outcomes: Vec<InvocationOutcome>,

    /// Digest of the item catalog for client-sequenced runs.
    pub catalog_digest: Option<String>,

    /// Final summary, set on the terminal transition.
    pub summary: Option<BatchSummary>,

    /// History cache refreshed by reconciliation.
    pub history: Vec<HistoryEntry>,
}

impl RunShared {
    /// Discard everything back to the idle baseline.
    pub fn clear(&mut self) {
        self.accumulator.reset();
        self.outcomes.clear();
        self.catalog_digest = None;
        self.summary = None;
        // history survives reset: it mirrors the external store, not the run
    }
}

/// Cheap-to-clone handle on the active-run slot.
#[derive(Debug, Clone, Default)]
pub struct SharedRun(Arc<Mutex<RunShared>>);

impl SharedRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the slot for a short, non-await-holding critical section.
    pub fn lock(&self) -> MutexGuard<'_, RunShared> {
        self.0.lock().unwrap()
    }

    /// Read-only state snapshot for the presentation layer.
    pub fn snapshot(&self) -> BatchRunState {
        self.lock().accumulator.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::{BatchMode, BatchStatus, RunId};
    use chrono::Utc;

    #[test]
    fn test_clear_keeps_history_cache() {
        let shared = SharedRun::new();
        {
            let mut run = shared.lock();
            run.accumulator
                .begin(RunId::new(), BatchMode::ClientSequenced, 2, Utc::now());
            run.outcomes.push(
                crate::domain::outcome::InvocationOutcome::verdict("a", true, 0.5, 10),
            );
            run.history.push(HistoryEntry {
                entry_id: "e-1".to_string(),
                item_id: "a".to_string(),
                mode: crate::domain::run::EvalMode::ModeA,
                passed: true,
                score: 0.5,
                batch_id: None,
                created_at: Utc::now(),
            });
            run.clear();
        }

        let state = shared.snapshot();
        assert_eq!(state.status, BatchStatus::Idle);
        assert!(shared.lock().outcomes.is_empty());
        assert_eq!(shared.lock().history.len(), 1);
    }
}
