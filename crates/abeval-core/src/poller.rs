//! Remote progress polling for server-delegated batches.
//!
//! After submission the coordinator owns nothing but reads: it resolves an
//! initial progress record, then fetches at a fixed interval until the
//! remote runner reports a terminal status. Fetch errors are logged and
//! swallowed — transient faults must not kill a healthy remote batch.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

use crate::config::CoordinatorConfig;
use crate::domain::progress::{ProgressRecord, RemoteBatchStatus};
use crate::domain::run::{BatchStatus, RunId};
use crate::error::{ServiceError, ServiceResult};
use crate::obs;
use crate::reconcile::ReconciliationScheduler;
use crate::services::{BatchRunner, SubmitAck};
use crate::state::SharedRun;

/// Tracks an externally-executing batch via periodic polling.
pub struct ProgressPoller {
    runner: Arc<dyn BatchRunner>,
    shared: SharedRun,
    scheduler: Arc<ReconciliationScheduler>,
    config: CoordinatorConfig,
}

impl ProgressPoller {
    pub fn new(
        runner: Arc<dyn BatchRunner>,
        shared: SharedRun,
        scheduler: Arc<ReconciliationScheduler>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            runner,
            shared,
            scheduler,
            config,
        }
    }

    /// Resolve the first progress record after submission.
    ///
    /// An inline record means polling can start immediately. A bare batch
    /// id means the remote record may not exist yet: wait briefly, fetch
    /// directly, and fall back to the most-recent-record query if the
    /// direct fetch fails.
    pub async fn resolve_initial(&self, ack: SubmitAck) -> ServiceResult<ProgressRecord> {
        if let Some(record) = ack.progress {
            return Ok(record);
        }

        let batch_id = ack.batch_id.ok_or_else(|| {
            ServiceError::Malformed(
                "submission returned neither a batch id nor a progress record".to_string(),
            )
        })?;

        tokio::time::sleep(self.config.submit_settle).await;

        match self.runner.get_progress(&batch_id).await {
            Ok(record) => Ok(record),
            Err(err) => {
                warn!(
                    event = "poll.initial_fetch_error",
                    batch_id = %batch_id,
                    error = %err,
                );
                self.runner
                    .latest_progress()
                    .await?
                    .ok_or(ServiceError::NotFound(batch_id))
            }
        }
    }

    /// Poll at a fixed interval until the remote batch is terminal, then
    /// reconcile exactly once.
    ///
    /// Each successful fetch overwrites the cached run state. With a
    /// `stall_timeout` configured, a batch that never reaches a terminal
    /// remote status is forced to `Failed` once the bound is exceeded;
    /// without one, polling continues indefinitely.
    pub async fn run(&self, run_id: &RunId, initial: ProgressRecord) -> BatchStatus {
        let started = Instant::now();
        let ticker = spawn_elapsed_ticker(self.shared.clone(), started, &self.config);

        let batch_id = initial.batch_id.clone();
        let mut latest = initial;
        let mut stalled = false;

        let status = loop {
            {
                let mut run = self.shared.lock();
                run.accumulator.absorb(&latest);
                run.accumulator
                    .touch_elapsed(started.elapsed().as_millis() as u64);
            }
            obs::emit_poll_snapshot(
                &batch_id,
                &format!("{:?}", latest.status).to_lowercase(),
                latest.completed_count,
                latest.total,
            );

            if latest.status.is_terminal() {
                break match latest.status {
                    RemoteBatchStatus::Completed => BatchStatus::Completed,
                    _ => BatchStatus::Failed,
                };
            }

            if let Some(bound) = self.config.stall_timeout {
                if started.elapsed() >= bound {
                    warn!(
                        event = "poll.stalled",
                        batch_id = %batch_id,
                        waited_ms = started.elapsed().as_millis() as u64,
                    );
                    stalled = true;
                    break BatchStatus::Failed;
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;

            match self.runner.get_progress(&batch_id).await {
                Ok(record) => latest = record,
                // Transient fault: keep the previous snapshot and poll on.
                Err(err) => obs::emit_poll_error(&batch_id, &err),
            }
        };

        ticker.abort();

        let snapshot = {
            let mut run = self.shared.lock();
            run.accumulator
                .finish(status, started.elapsed().as_millis() as u64);
            run.accumulator.snapshot()
        };
        obs::emit_run_finished(
            &run_id.to_string(),
            &format!("{status:?}").to_lowercase(),
            snapshot.completed_count,
            snapshot.elapsed_ms,
        );

        // A stalled batch has no trustworthy terminal record.
        let summary = if stalled { None } else { latest.summary.clone() };
        self.scheduler
            .settle(run_id, self.config.reconcile_delay_delegated, summary)
            .await;

        status
    }
}

/// Spawn the 500 ms elapsed-display ticker.
///
/// Independent of the poll cadence; it only refreshes `elapsed_ms` for the
/// presentation layer and exits on its own once the run leaves `Running`.
pub fn spawn_elapsed_ticker(
    shared: SharedRun,
    started: Instant,
    config: &CoordinatorConfig,
) -> JoinHandle<()> {
    let period = config.ticker_interval;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            let mut run = shared.lock();
            if run.accumulator.status() != BatchStatus::Running {
                break;
            }
            run.accumulator
                .touch_elapsed(started.elapsed().as_millis() as u64);
        }
    })
}
