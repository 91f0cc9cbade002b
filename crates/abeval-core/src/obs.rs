//! Structured observability hooks for coordinator run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `RunSpan` RAII guard
//! - Emission functions for key lifecycle events: start, outcome recorded,
//!   poll snapshot/error, finish, reconciliation
//!
//! Events are emitted at `info!` level; transient poll failures at `warn!`.

use tracing::{info, warn};

/// RAII guard that enters a run-scoped tracing span for the duration of a
/// run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("abeval.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, mode: &str, total: u64) {
    info!(event = "run.started", run_id = %run_id, mode = %mode, total = total);
}

/// Emit event: one item's outcome recorded.
pub fn emit_outcome_recorded(run_id: &str, item_id: &str, succeeded: bool, completed: u64) {
    info!(
        event = "run.outcome_recorded",
        run_id = %run_id,
        item_id = %item_id,
        succeeded = succeeded,
        completed = completed,
    );
}

/// Emit event: remote progress snapshot absorbed.
pub fn emit_poll_snapshot(batch_id: &str, status: &str, completed: u64, total: u64) {
    info!(
        event = "poll.snapshot",
        batch_id = %batch_id,
        status = %status,
        completed = completed,
        total = total,
    );
}

/// Emit event: transient poll failure (warning level, polling continues).
pub fn emit_poll_error(batch_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "poll.fetch_error", batch_id = %batch_id, error = %error);
}

/// Emit event: run reached a terminal (or paused) status.
pub fn emit_run_finished(run_id: &str, status: &str, completed: u64, elapsed_ms: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        status = %status,
        completed = completed,
        elapsed_ms = elapsed_ms,
    );
}

/// Emit event: reconciliation scheduled after a terminal transition.
pub fn emit_reconcile_scheduled(run_id: &str, delay_ms: u64) {
    info!(event = "reconcile.scheduled", run_id = %run_id, delay_ms = delay_ms);
}

/// Emit event: history reloaded by reconciliation.
pub fn emit_reconcile_fired(run_id: &str, reloaded: usize) {
    info!(event = "reconcile.fired", run_id = %run_id, reloaded = reloaded);
}

/// Emit event: duplicate reconciliation attempt skipped (warning level).
pub fn emit_reconcile_skipped(run_id: &str) {
    warn!(event = "reconcile.skipped_duplicate", run_id = %run_id);
}
