//! Top-level batch lifecycle orchestration.
//!
//! One parametrized controller replaces the near-identical coordinator
//! logic the dashboard pages would otherwise each carry: the evaluation
//! service, batch runner, and history store are injected, and each
//! presentation surface becomes a thin consumer of the lifecycle methods
//! and read-only snapshots exposed here.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::{BatchConfig, CoordinatorConfig};
use crate::domain::item::{catalog_digest, TestItem};
use crate::domain::outcome::InvocationOutcome;
use crate::domain::run::{BatchMode, BatchRunState, BatchStatus, RunId};
use crate::domain::summary::{BatchSummary, HistoryEntry};
use crate::error::{CoordinatorError, Result};
use crate::obs;
use crate::poller::ProgressPoller;
use crate::reconcile::ReconciliationScheduler;
use crate::sequencer::{CancelFlag, Sequencer};
use crate::services::{BatchRunner, EvalService, HistorySort, HistoryStore};
use crate::state::SharedRun;

/// What to run: local item payloads select client-sequenced mode, a bare
/// count delegates execution to the remote runner.
#[derive(Debug, Clone)]
pub enum StartRequest {
    Items(Vec<TestItem>),
    Remote { count: u64 },
}

/// Orchestrates the run lifecycle over the injected collaborators.
///
/// The single active-run slot is the only shared mutable resource; it is
/// guarded by the `RunActive` check under the start gate, so runs never
/// interleave.
pub struct BatchController {
    eval: Arc<dyn EvalService>,
    runner: Arc<dyn BatchRunner>,
    history: Arc<dyn HistoryStore>,
    config: CoordinatorConfig,
    shared: SharedRun,
    cancel: CancelFlag,
    scheduler: Arc<ReconciliationScheduler>,
    start_gate: tokio::sync::Mutex<()>,
    driver: std::sync::Mutex<Option<JoinHandle<BatchStatus>>>,
}

impl BatchController {
    pub fn new(
        eval: Arc<dyn EvalService>,
        runner: Arc<dyn BatchRunner>,
        history: Arc<dyn HistoryStore>,
        config: CoordinatorConfig,
    ) -> Self {
        let shared = SharedRun::new();
        let scheduler = Arc::new(ReconciliationScheduler::new(
            history.clone(),
            shared.clone(),
            config.history_limit,
        ));
        Self {
            eval,
            runner,
            history,
            config,
            shared,
            cancel: CancelFlag::new(),
            scheduler,
            start_gate: tokio::sync::Mutex::new(()),
            driver: std::sync::Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------

    /// Start a new run.
    ///
    /// Rejected with [`CoordinatorError::RunActive`] while a run is
    /// `Running` (no queueing). From `Paused` or a terminal status the new
    /// run replaces the previous state. On a start-time failure the state
    /// is left untouched — no partial run dangles.
    pub async fn start(&self, request: StartRequest, batch: BatchConfig) -> Result<RunId> {
        let _gate = self.start_gate.lock().await;

        if self.shared.snapshot().status == BatchStatus::Running {
            return Err(CoordinatorError::RunActive);
        }

        match request {
            StartRequest::Items(items) => self.start_sequenced(items, batch).await,
            StartRequest::Remote { count } => self.start_delegated(count, batch).await,
        }
    }

    /// Request a cooperative stop of the client-sequenced loop.
    ///
    /// The sequencer observes the flag at the top of its per-item loop, so
    /// an in-flight invocation always completes and is recorded. Returns
    /// whether the request will be honored: in server-delegated mode the
    /// remote side owns execution and this is a logged no-op.
    pub fn pause(&self) -> bool {
        let state = self.shared.snapshot();
        match (state.mode, state.status) {
            (Some(BatchMode::ClientSequenced), BatchStatus::Running) => {
                self.cancel.request();
                true
            }
            (Some(BatchMode::ServerDelegated), BatchStatus::Running) => {
                warn!(
                    event = "pause.ignored",
                    reason = "remote runner owns execution in server-delegated mode",
                );
                false
            }
            _ => {
                warn!(event = "pause.ignored", reason = "no running batch");
                false
            }
        }
    }

    /// Discard the run state back to `Idle`.
    ///
    /// Valid from `Idle`, `Paused`, or a terminal status; explicitly
    /// rejected while `Running`. Idempotent under repeated calls.
    pub fn reset(&self) -> Result<()> {
        let mut run = self.shared.lock();
        if run.accumulator.status() == BatchStatus::Running {
            return Err(CoordinatorError::ResetWhileRunning);
        }
        run.clear();
        self.cancel.clear();
        Ok(())
    }

    /// Serialize the current outcome list into a transportable document.
    ///
    /// Pure read: has no effect on run state.
    pub fn export(&self) -> crate::export::ExportArtifact {
        let run = self.shared.lock();
        crate::export::ExportArtifact {
            schema_version: crate::export::EXPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            run: run.accumulator.snapshot(),
            catalog_digest: run.catalog_digest.clone(),
            summary: run.summary.clone(),
            outcomes: run.outcomes.clone(),
        }
    }

    /// Immediately reload the history cache (operator-initiated refresh).
    ///
    /// Bypasses the reconciliation delay; the reload is read-only, so
    /// refreshing next to an automatic reconciliation cannot duplicate
    /// entries.
    pub async fn refresh_history(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self
            .history
            .list_results(HistorySort::NewestFirst, self.config.history_limit)
            .await?;
        self.shared.lock().history = entries.clone();
        Ok(entries)
    }

    // -----------------------------------------------------------------
    // Read surface for the presentation layer
    // -----------------------------------------------------------------

    /// Read-only snapshot of the live run state.
    pub fn snapshot(&self) -> BatchRunState {
        self.shared.snapshot()
    }

    /// Recorded outcomes, in order.
    pub fn outcomes(&self) -> Vec<InvocationOutcome> {
        self.shared.lock().outcomes.clone()
    }

    /// Final summary of the last terminal run, if any.
    pub fn final_summary(&self) -> Option<BatchSummary> {
        self.shared.lock().summary.clone()
    }

    /// Cached history entries from the last reconciliation or refresh.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.lock().history.clone()
    }

    /// Await the active driver task, returning its final status.
    ///
    /// Used by CLI consumers and tests to block until the run (including
    /// its reconciliation pass) has fully settled.
    pub async fn wait(&self) -> Option<BatchStatus> {
        let handle = self.driver.lock().unwrap().take();
        match handle {
            Some(handle) => handle.await.ok(),
            None => None,
        }
    }

    // -----------------------------------------------------------------
    // Mode-specific start paths
    // -----------------------------------------------------------------

    async fn start_sequenced(&self, items: Vec<TestItem>, batch: BatchConfig) -> Result<RunId> {
        if items.is_empty() {
            return Err(CoordinatorError::EmptyBatch);
        }
        self.eval
            .ready()
            .await
            .map_err(CoordinatorError::NotReady)?;

        let run_id = RunId::new();
        let total = items.len() as u64;
        self.cancel.clear();
        self.scheduler.arm();
        {
            let mut run = self.shared.lock();
            run.clear();
            run.catalog_digest = Some(catalog_digest(&items));
            run.accumulator.begin(
                run_id.clone(),
                BatchMode::ClientSequenced,
                total,
                Utc::now(),
            );
        }
        // no awaits below this point, so the entered span never crosses a
        // suspension
        let _span = obs::RunSpan::enter(&run_id.to_string());
        obs::emit_run_started(
            &run_id.to_string(),
            BatchMode::ClientSequenced.as_str(),
            total,
        );

        let sequencer = Sequencer::new(
            self.eval.clone(),
            self.shared.clone(),
            self.scheduler.clone(),
            self.cancel.clone(),
            self.config.clone(),
        );
        let task_run_id = run_id.clone();
        let mode = batch.mode;
        let handle =
            tokio::spawn(async move { sequencer.run(&task_run_id, &items, mode).await });
        *self.driver.lock().unwrap() = Some(handle);

        Ok(run_id)
    }

    async fn start_delegated(&self, count: u64, batch: BatchConfig) -> Result<RunId> {
        if count == 0 {
            return Err(CoordinatorError::EmptyBatch);
        }

        // Submission failure surfaces here, before any state transition.
        let ack = self
            .runner
            .submit_batch(count, &batch)
            .await
            .map_err(CoordinatorError::Submit)?;

        let run_id = RunId::new();
        self.cancel.clear();
        self.scheduler.arm();
        {
            let mut run = self.shared.lock();
            run.clear();
            run.accumulator.begin(
                run_id.clone(),
                BatchMode::ServerDelegated,
                count,
                Utc::now(),
            );
        }
        let _span = obs::RunSpan::enter(&run_id.to_string());
        obs::emit_run_started(
            &run_id.to_string(),
            BatchMode::ServerDelegated.as_str(),
            count,
        );

        let poller = ProgressPoller::new(
            self.runner.clone(),
            self.shared.clone(),
            self.scheduler.clone(),
            self.config.clone(),
        );
        let shared = self.shared.clone();
        let scheduler = self.scheduler.clone();
        let reconcile_delay = self.config.reconcile_delay_delegated;
        let task_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            match poller.resolve_initial(ack).await {
                Ok(initial) => poller.run(&task_run_id, initial).await,
                Err(err) => {
                    // The submission succeeded but the record never became
                    // visible: terminal failure, not a start-time one.
                    warn!(
                        event = "poll.initial_record_unavailable",
                        run_id = %task_run_id,
                        error = %err,
                    );
                    shared
                        .lock()
                        .accumulator
                        .finish(BatchStatus::Failed, 0);
                    scheduler.settle(&task_run_id, reconcile_delay, None).await;
                    BatchStatus::Failed
                }
            }
        });
        *self.driver.lock().unwrap() = Some(handle);

        Ok(run_id)
    }
}
