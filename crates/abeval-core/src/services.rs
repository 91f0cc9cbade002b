//! Collaborator service trait definitions.
//!
//! These traits define the narrow seams to the external collaborators:
//! - `EvalService`: one scoring invocation per test item
//! - `BatchRunner`: remote batch submission and progress fetches
//! - `HistoryStore`: read-only persisted result history
//!
//! All traits are async and transport-agnostic. In-memory fakes are
//! provided for testing via the `fakes` module; HTTP implementations live
//! in the `abeval-client` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BatchConfig;
use crate::domain::progress::ProgressRecord;
use crate::domain::run::EvalMode;
use crate::domain::summary::HistoryEntry;
use crate::error::ServiceResult;

// ---------------------------------------------------------------------------
// EvalService — per-item scoring invocation
// ---------------------------------------------------------------------------

/// Verdict returned by the scoring service for one invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Successful response from one evaluation invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalResponse {
    /// Pass/fail verdict.
    pub verdict: Verdict,

    /// Quality/performance delta for this item.
    pub score: f64,

    /// Remote-reported invocation duration.
    pub duration_ms: u64,
}

/// Scoring service invoked once per test item.
///
/// Treated as a black box: any shape violation surfaces as a
/// `ServiceError` and is recorded as a failed outcome by the caller. No
/// coordinator-imposed timeout applies; whatever the service itself
/// enforces governs.
#[async_trait]
pub trait EvalService: Send + Sync {
    /// Readiness probe checked once before a client-sequenced run starts.
    ///
    /// The default implementation reports ready; transports that can
    /// detect an unreachable backend cheaply should override it.
    async fn ready(&self) -> ServiceResult<()> {
        Ok(())
    }

    /// Evaluate a single item under the given comparison arm.
    async fn evaluate(
        &self,
        item_id: &str,
        input: &str,
        mode: EvalMode,
    ) -> ServiceResult<EvalResponse>;
}

// ---------------------------------------------------------------------------
// BatchRunner — server-delegated execution
// ---------------------------------------------------------------------------

/// Acknowledgement from a batch submission.
///
/// The runner returns either an inline progress record (polling starts
/// immediately) or just a batch id (the coordinator waits briefly, then
/// fetches by id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitAck {
    /// Identifier for later progress fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,

    /// Inline first progress record, when the runner provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressRecord>,
}

/// Remote batch runner.
///
/// Owns execution and all writes to the progress record; the coordinator
/// only submits and reads.
#[async_trait]
pub trait BatchRunner: Send + Sync {
    /// Submit a batch of `count` items for remote execution.
    async fn submit_batch(&self, count: u64, config: &BatchConfig) -> ServiceResult<SubmitAck>;

    /// Fetch the progress record for a batch.
    async fn get_progress(&self, batch_id: &str) -> ServiceResult<ProgressRecord>;

    /// Most-recent-record fallback used when a direct fetch fails.
    async fn latest_progress(&self) -> ServiceResult<Option<ProgressRecord>>;
}

// ---------------------------------------------------------------------------
// HistoryStore — persisted result history
// ---------------------------------------------------------------------------

/// Sort order for history queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistorySort {
    NewestFirst,
    OldestFirst,
}

/// Read-only view of the authoritative result history.
///
/// The external store is the sole writer; reconciliation only re-reads it
/// after a propagation delay, so duplicate reloads cannot duplicate
/// entries.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// List persisted results.
    async fn list_results(
        &self,
        sort: HistorySort,
        limit: usize,
    ) -> ServiceResult<Vec<HistoryEntry>>;
}
