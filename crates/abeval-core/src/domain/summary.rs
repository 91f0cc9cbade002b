//! Terminal run aggregates and persisted history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::run::{BatchRunState, EvalMode};

/// Aggregate computed when a run reaches a terminal state.
///
/// Computed once on the terminal transition, displayed, then retained only
/// as part of history. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    /// Fraction of attempted items that passed (0.0–1.0).
    pub pass_rate: f64,

    /// Mean score delta across scored items.
    pub avg_score: f64,

    /// Number of items in the batch.
    pub total: u64,

    /// Total wall-clock time of the run.
    pub wall_clock_ms: u64,
}

impl BatchSummary {
    /// Derive a summary from a terminal run state.
    ///
    /// Pass rate is computed over attempted items, which equals `total`
    /// for naturally completed runs and stays meaningful for paused ones.
    pub fn from_state(state: &BatchRunState) -> Self {
        let pass_rate = if state.completed_count == 0 {
            0.0
        } else {
            state.passed_count as f64 / state.completed_count as f64
        };
        Self {
            pass_rate,
            avg_score: state.running_avg_score,
            total: state.total,
            wall_clock_ms: state.elapsed_ms,
        }
    }
}

/// A persisted per-item result from the external history store.
///
/// The store is the sole writer; the coordinator only reads these back
/// during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Identifier assigned by the history store.
    pub entry_id: String,

    /// Item this result belongs to.
    pub item_id: String,

    /// Comparison arm the item was evaluated under.
    pub mode: EvalMode,

    /// Recorded verdict.
    pub passed: bool,

    /// Recorded score delta.
    pub score: f64,

    /// Batch the result was produced in, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,

    /// When the store persisted this result.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::{BatchMode, BatchStatus, RunId};

    fn terminal_state() -> BatchRunState {
        BatchRunState {
            run_id: Some(RunId::new()),
            mode: Some(BatchMode::ClientSequenced),
            status: BatchStatus::Completed,
            total: 5,
            completed_count: 5,
            passed_count: 4,
            failed_count: 1,
            running_avg_score: 0.37,
            started_at: Some(Utc::now()),
            elapsed_ms: 9_200,
        }
    }

    #[test]
    fn test_summary_from_state() {
        let summary = BatchSummary::from_state(&terminal_state());
        assert!((summary.pass_rate - 0.8).abs() < 1e-12);
        assert!((summary.avg_score - 0.37).abs() < 1e-12);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.wall_clock_ms, 9_200);
    }

    #[test]
    fn test_summary_from_empty_state_has_zero_pass_rate() {
        let summary = BatchSummary::from_state(&BatchRunState::default());
        assert_eq!(summary.pass_rate, 0.0);
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn test_history_entry_serde_roundtrip() {
        let entry = HistoryEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            item_id: "q-12".to_string(),
            mode: EvalMode::ModeB,
            passed: true,
            score: 0.44,
            batch_id: Some("batch-3".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&entry).expect("serialize");
        let deserialized: HistoryEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(entry, deserialized);
    }
}
