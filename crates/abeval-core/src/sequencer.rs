//! Client-sequenced batch execution.
//!
//! Drives a fixed, ordered item list one invocation at a time against the
//! scoring service. Per-item failures are recorded and never abort the
//! batch; cancellation is cooperative and observed only at the top of the
//! loop, so an in-flight invocation always completes and its outcome is
//! recorded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::warn;

use crate::config::CoordinatorConfig;
use crate::domain::item::TestItem;
use crate::domain::outcome::InvocationOutcome;
use crate::domain::run::{BatchStatus, EvalMode, RunId};
use crate::domain::summary::BatchSummary;
use crate::obs;
use crate::reconcile::ReconciliationScheduler;
use crate::services::{EvalService, Verdict};
use crate::state::SharedRun;

/// Cooperative cancellation flag observed at the top of the item loop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next loop-top check.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a stale request before a new run.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives client-sequenced execution for one run.
pub struct Sequencer {
    eval: Arc<dyn EvalService>,
    shared: SharedRun,
    scheduler: Arc<ReconciliationScheduler>,
    cancel: CancelFlag,
    config: CoordinatorConfig,
}

impl Sequencer {
    pub fn new(
        eval: Arc<dyn EvalService>,
        shared: SharedRun,
        scheduler: Arc<ReconciliationScheduler>,
        cancel: CancelFlag,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            eval,
            shared,
            scheduler,
            cancel,
            config,
        }
    }

    /// Execute the full item list in order, then reconcile.
    ///
    /// Returns `Completed` when every item was attempted, `Paused` when
    /// the cancel flag stopped the loop early. The caller must already
    /// have transitioned the run state to `Running`.
    pub async fn run(&self, run_id: &RunId, items: &[TestItem], mode: EvalMode) -> BatchStatus {
        let started = Instant::now();
        let mut attempted = 0usize;

        for (idx, item) in items.iter().enumerate() {
            if self.cancel.is_requested() {
                break;
            }

            let outcome = self.invoke(item, mode).await;
            let completed = {
                let mut run = self.shared.lock();
                run.accumulator.record(&outcome);
                run.accumulator
                    .touch_elapsed(started.elapsed().as_millis() as u64);
                run.outcomes.push(outcome.clone());
                run.accumulator.snapshot().completed_count
            };
            obs::emit_outcome_recorded(
                &run_id.to_string(),
                &outcome.item_id,
                outcome.succeeded,
                completed,
            );
            attempted += 1;

            // Deliberate backpressure toward the scoring service.
            if idx + 1 < items.len() {
                tokio::time::sleep(self.config.item_delay).await;
            }
        }

        let status = if attempted == items.len() {
            BatchStatus::Completed
        } else {
            BatchStatus::Paused
        };

        let (snapshot, summary) = {
            let mut run = self.shared.lock();
            run.accumulator
                .finish(status, started.elapsed().as_millis() as u64);
            let snapshot = run.accumulator.snapshot();
            let summary = status
                .is_terminal()
                .then(|| BatchSummary::from_state(&snapshot));
            (snapshot, summary)
        };
        obs::emit_run_finished(
            &run_id.to_string(),
            &format!("{status:?}").to_lowercase(),
            snapshot.completed_count,
            snapshot.elapsed_ms,
        );

        self.scheduler
            .settle(run_id, self.config.reconcile_delay_sequenced, summary)
            .await;

        status
    }

    /// One invocation; errors become failed outcomes instead of aborting.
    async fn invoke(&self, item: &TestItem, mode: EvalMode) -> InvocationOutcome {
        match self.eval.evaluate(&item.item_id, &item.input, mode).await {
            Ok(response) => InvocationOutcome::verdict(
                &item.item_id,
                response.verdict == Verdict::Pass,
                response.score,
                response.duration_ms,
            ),
            Err(err) => {
                warn!(event = "run.item_error", item_id = %item.item_id, error = %err);
                InvocationOutcome::invocation_failed(&item.item_id, &err.to_string())
            }
        }
    }
}
