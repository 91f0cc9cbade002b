//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `ScriptedEvalService`, `ScriptedBatchRunner`, and
//! `MemoryHistoryStore` that satisfy the trait contracts without any
//! external dependencies. The scripted fakes replay pre-seeded responses
//! in order, so tests can drive every failure path deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::BatchConfig;
use crate::domain::progress::ProgressRecord;
use crate::domain::run::EvalMode;
use crate::domain::summary::HistoryEntry;
use crate::error::{ServiceError, ServiceResult};
use crate::sequencer::CancelFlag;
use crate::services::*;

// ---------------------------------------------------------------------------
// ScriptedEvalService
// ---------------------------------------------------------------------------

/// Scoring service fake that replays pre-seeded responses in call order.
#[derive(Default)]
pub struct ScriptedEvalService {
    script: Mutex<VecDeque<ServiceResult<EvalResponse>>>,
    calls: Mutex<Vec<String>>,
    ready_error: Mutex<Option<ServiceError>>,
    cancel_after: Mutex<Option<(usize, CancelFlag)>>,
}

impl ScriptedEvalService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pass verdict with the given score.
    pub fn push_pass(&self, score: f64) {
        self.script.lock().unwrap().push_back(Ok(EvalResponse {
            verdict: Verdict::Pass,
            score,
            duration_ms: 100,
        }));
    }

    /// Seed a fail verdict with the given score.
    pub fn push_fail(&self, score: f64) {
        self.script.lock().unwrap().push_back(Ok(EvalResponse {
            verdict: Verdict::Fail,
            score,
            duration_ms: 100,
        }));
    }

    /// Seed an invocation-level error.
    pub fn push_error(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(ServiceError::Transport(message.to_string())));
    }

    /// Make the readiness probe fail with the given error.
    pub fn fail_ready(&self, error: ServiceError) {
        *self.ready_error.lock().unwrap() = Some(error);
    }

    /// Request cancellation on `flag` once `count` evaluations completed.
    ///
    /// Lets tests pause a run at an exact item boundary without racing the
    /// sequencer loop.
    pub fn cancel_after(&self, count: usize, flag: CancelFlag) {
        *self.cancel_after.lock().unwrap() = Some((count, flag));
    }

    /// Item ids evaluated so far, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvalService for ScriptedEvalService {
    async fn ready(&self) -> ServiceResult<()> {
        match self.ready_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn evaluate(
        &self,
        item_id: &str,
        _input: &str,
        _mode: EvalMode,
    ) -> ServiceResult<EvalResponse> {
        let call_count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(item_id.to_string());
            calls.len()
        };

        let response = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("script exhausted".to_string())));

        if let Some((count, flag)) = self.cancel_after.lock().unwrap().as_ref() {
            if call_count == *count {
                flag.request();
            }
        }

        response
    }
}

// ---------------------------------------------------------------------------
// ScriptedBatchRunner
// ---------------------------------------------------------------------------

/// Remote batch runner fake with a scripted progress sequence.
///
/// When the progress script runs dry, the last successfully fetched record
/// is replayed, so a never-terminal remote batch is easy to simulate.
#[derive(Default)]
pub struct ScriptedBatchRunner {
    ack: Mutex<Option<ServiceResult<SubmitAck>>>,
    progress: Mutex<VecDeque<ServiceResult<ProgressRecord>>>,
    sticky: Mutex<Option<ProgressRecord>>,
    latest: Mutex<Option<ProgressRecord>>,
    fetches: AtomicUsize,
    latest_queries: AtomicUsize,
}

impl ScriptedBatchRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the submission acknowledgement.
    pub fn ack_with(&self, ack: ServiceResult<SubmitAck>) {
        *self.ack.lock().unwrap() = Some(ack);
    }

    /// Seed the next progress fetch result.
    pub fn push_progress(&self, result: ServiceResult<ProgressRecord>) {
        self.progress.lock().unwrap().push_back(result);
    }

    /// Seed the most-recent-record fallback response.
    pub fn set_latest(&self, record: ProgressRecord) {
        *self.latest.lock().unwrap() = Some(record);
    }

    /// Number of direct progress fetches served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of most-recent fallback queries served.
    pub fn latest_query_count(&self) -> usize {
        self.latest_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchRunner for ScriptedBatchRunner {
    async fn submit_batch(&self, _count: u64, _config: &BatchConfig) -> ServiceResult<SubmitAck> {
        self.ack
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ServiceError::Rejected("no ack scripted".to_string())))
    }

    async fn get_progress(&self, batch_id: &str) -> ServiceResult<ProgressRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let next = self.progress.lock().unwrap().pop_front();
        match next {
            Some(Ok(record)) => {
                *self.sticky.lock().unwrap() = Some(record.clone());
                Ok(record)
            }
            Some(Err(err)) => Err(err),
            None => self
                .sticky
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ServiceError::NotFound(batch_id.to_string())),
        }
    }

    async fn latest_progress(&self) -> ServiceResult<Option<ProgressRecord>> {
        self.latest_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.latest.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryHistoryStore
// ---------------------------------------------------------------------------

/// In-memory history store backed by a `Vec<HistoryEntry>`.
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
    loads: AtomicUsize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a persisted entry (simulates the external writer).
    pub fn push(&self, entry: HistoryEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    /// Number of `list_results` calls served, for exactly-once assertions.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn list_results(
        &self,
        sort: HistorySort,
        limit: usize,
    ) -> ServiceResult<Vec<HistoryEntry>> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let mut entries = self.entries.lock().unwrap().clone();
        match sort {
            HistorySort::NewestFirst => entries.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            HistorySort::OldestFirst => entries.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        entries.truncate(limit);
        Ok(entries)
    }
}
