//! Pure progress state: counts, running average, derived snapshot.
//!
//! The accumulator is the only writer of [`BatchRunState`]. It performs no
//! I/O and owns no clock; callers feed it outcomes, remote snapshots, and
//! elapsed-time updates.

use chrono::{DateTime, Utc};

use crate::domain::outcome::InvocationOutcome;
use crate::domain::progress::ProgressRecord;
use crate::domain::run::{BatchMode, BatchRunState, BatchStatus, RunId};

/// Accumulates per-item outcomes (or remote snapshots) into the live run
/// state.
///
/// The running score average is maintained incrementally
/// (`avg += (x - avg) / n`) rather than summed and divided at the end, so
/// a snapshot is always consistent mid-run; the two formulations agree
/// within floating-point tolerance.
#[derive(Debug, Default)]
pub struct ProgressAccumulator {
    state: BatchRunState,
    scored: u64,
}

impl ProgressAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition `Idle → Running` for a fresh run, zeroing all counters.
    pub fn begin(
        &mut self,
        run_id: RunId,
        mode: BatchMode,
        total: u64,
        started_at: DateTime<Utc>,
    ) {
        self.state = BatchRunState {
            run_id: Some(run_id),
            mode: Some(mode),
            status: BatchStatus::Running,
            total,
            started_at: Some(started_at),
            ..BatchRunState::default()
        };
        self.scored = 0;
    }

    /// O(1) count and running-average update for one recorded outcome.
    pub fn record(&mut self, outcome: &InvocationOutcome) {
        self.state.completed_count += 1;
        if outcome.counts_as_passed() {
            self.state.passed_count += 1;
        } else {
            self.state.failed_count += 1;
        }

        if let Some(score) = outcome.score {
            self.scored += 1;
            let n = self.scored as f64;
            self.state.running_avg_score += (score - self.state.running_avg_score) / n;
        }

        debug_assert!(self.state.invariant_holds());
    }

    /// Overwrite counters from an authoritative remote snapshot.
    ///
    /// Identity fields (`run_id`, `mode`, `status`, `started_at`) stay
    /// local; termination is decided by the poller, not here.
    pub fn absorb(&mut self, record: &ProgressRecord) {
        self.state.total = record.total;
        self.state.completed_count = record.completed_count;
        self.state.passed_count = record.passed_count;
        self.state.failed_count = record.failed_count;
        self.state.running_avg_score = record.running_avg_score;

        debug_assert!(self.state.invariant_holds());
    }

    /// Refresh the live elapsed counter from the caller-owned clock.
    pub fn touch_elapsed(&mut self, elapsed_ms: u64) {
        self.state.elapsed_ms = elapsed_ms;
    }

    /// Terminal (or paused) transition.
    pub fn finish(&mut self, status: BatchStatus, elapsed_ms: u64) {
        self.state.status = status;
        self.state.elapsed_ms = elapsed_ms;
    }

    /// Immutable copy of the current run state.
    pub fn snapshot(&self) -> BatchRunState {
        self.state.clone()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> BatchStatus {
        self.state.status
    }

    /// Zero all counters and clear status back to `Idle`.
    pub fn reset(&mut self) {
        self.state = BatchRunState::default();
        self.scored = 0;
    }
}
