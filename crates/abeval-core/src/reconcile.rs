//! Delayed history reconciliation after terminal transitions.
//!
//! The authoritative history store is eventually consistent: results a run
//! just produced may not be readable immediately after the terminal
//! transition. The scheduler waits out a fixed propagation delay, then
//! reloads history exactly once per run. The reload is read-only and the
//! store is the sole writer, so a duplicate settle attempt can never
//! duplicate visible entries — it is simply skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::run::RunId;
use crate::domain::summary::BatchSummary;
use crate::obs;
use crate::services::{HistorySort, HistoryStore};
use crate::state::SharedRun;

/// Schedules the one post-run history reload.
pub struct ReconciliationScheduler {
    history: Arc<dyn HistoryStore>,
    shared: SharedRun,
    limit: usize,
    armed: AtomicBool,
}

impl ReconciliationScheduler {
    pub fn new(history: Arc<dyn HistoryStore>, shared: SharedRun, limit: usize) -> Self {
        Self {
            history,
            shared,
            limit,
            armed: AtomicBool::new(false),
        }
    }

    /// Re-arm for a new run. Called by the controller on every `start()`.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Publish the final summary, wait out the propagation delay, then
    /// reload history.
    ///
    /// Idempotent per run: only the first call after `arm()` performs the
    /// reload; later calls (e.g. a manual refresh racing the driver's
    /// completion path) are logged and skipped.
    pub async fn settle(&self, run_id: &RunId, delay: Duration, summary: Option<BatchSummary>) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            obs::emit_reconcile_skipped(&run_id.to_string());
            return;
        }

        // The summary is visible to the presentation layer immediately;
        // only the history reload waits for storage propagation.
        self.shared.lock().summary = summary;

        obs::emit_reconcile_scheduled(&run_id.to_string(), delay.as_millis() as u64);
        tokio::time::sleep(delay).await;

        match self.history.list_results(HistorySort::NewestFirst, self.limit).await {
            Ok(entries) => {
                obs::emit_reconcile_fired(&run_id.to_string(), entries.len());
                self.shared.lock().history = entries;
            }
            Err(err) => {
                // Reload failure leaves the previous cache in place; a
                // later manual refresh can repair it.
                warn!(event = "reconcile.reload_error", run_id = %run_id, error = %err);
            }
        }
    }
}
