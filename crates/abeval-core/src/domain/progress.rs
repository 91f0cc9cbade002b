//! Remote progress records for server-delegated batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::summary::BatchSummary;

/// Status reported by the remote batch runner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemoteBatchStatus {
    Running,
    Completed,
    Failed,
}

impl RemoteBatchStatus {
    /// Polling terminates exactly when the fetched status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteBatchStatus::Completed | RemoteBatchStatus::Failed)
    }
}

/// Authoritative remote mirror of a delegated batch's progress.
///
/// The remote runner exclusively owns writes; the coordinator only caches
/// the latest fetched snapshot and overwrites its local view from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressRecord {
    /// Identifier assigned by the remote runner at submission.
    pub batch_id: String,

    /// Remote execution status.
    pub status: RemoteBatchStatus,

    /// Number of items in the remote batch.
    pub total: u64,

    /// Items the remote runner has attempted.
    pub completed_count: u64,

    /// Items that passed.
    pub passed_count: u64,

    /// Items that failed.
    pub failed_count: u64,

    /// Remote running mean of recorded scores.
    pub running_avg_score: f64,

    /// Terminal summary, present on some completed records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,

    /// When the remote runner last updated this record.
    pub updated_at: DateTime<Utc>,
}
