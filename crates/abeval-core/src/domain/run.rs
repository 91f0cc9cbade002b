//! Run identity, status, and the coordinator's live view of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a coordinator run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId.
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the comparison a batch exercises.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    ModeA,
    ModeB,
}

impl EvalMode {
    /// Wire/display name for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalMode::ModeA => "mode_a",
            EvalMode::ModeB => "mode_b",
        }
    }
}

impl std::fmt::Display for EvalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where sequencing authority lives for a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// The coordinator iterates items and invokes the scoring service itself.
    ClientSequenced,

    /// A remote runner executes the batch; the coordinator only polls status.
    ServerDelegated,
}

impl BatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMode::ClientSequenced => "client_sequenced",
            BatchMode::ServerDelegated => "server_delegated",
        }
    }
}

/// Lifecycle status of a run.
///
/// Transitions: `Idle → Running → {Paused, Completed, Failed} → Idle`
/// (via reset). No transition skips `Running`; `Paused` is reachable only
/// from `Running` in client-sequenced mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
}

impl BatchStatus {
    /// Whether no further automatic transitions occur from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

/// The coordinator's live view of a run.
///
/// # Invariants
///
/// `completed_count == passed_count + failed_count <= total`, always.
/// Mutated only by the Progress Accumulator in response to outcomes or
/// poll snapshots; exactly one exists per active run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchRunState {
    /// Identifier of the active run (None when idle).
    pub run_id: Option<RunId>,

    /// Sequencing mode of the active run (None when idle).
    pub mode: Option<BatchMode>,

    /// Current lifecycle status.
    pub status: BatchStatus,

    /// Number of items in the batch.
    pub total: u64,

    /// Items attempted so far.
    pub completed_count: u64,

    /// Items that completed with a pass verdict.
    pub passed_count: u64,

    /// Items that failed (fail verdict or invocation error).
    pub failed_count: u64,

    /// Incrementally maintained mean of recorded scores (0.0 when none).
    pub running_avg_score: f64,

    /// When the run started (None when idle).
    pub started_at: Option<DateTime<Utc>>,

    /// Wall-clock time since start, refreshed by the caller-owned clock.
    pub elapsed_ms: u64,
}

impl Default for BatchRunState {
    fn default() -> Self {
        Self {
            run_id: None,
            mode: None,
            status: BatchStatus::Idle,
            total: 0,
            completed_count: 0,
            passed_count: 0,
            failed_count: 0,
            running_avg_score: 0.0,
            started_at: None,
            elapsed_ms: 0,
        }
    }
}

impl BatchRunState {
    /// Check the counting invariant.
    pub fn invariant_holds(&self) -> bool {
        self.completed_count == self.passed_count + self.failed_count
            && self.completed_count <= self.total
    }

    /// Completion as a fraction of `total` (0.0 when the batch is empty).
    pub fn progress_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed_count as f64 / self.total as f64
        }
    }
}
