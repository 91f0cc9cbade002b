//! Server-delegated polling scenarios driven through the ProgressPoller
//! with a scripted batch runner.

use std::sync::Arc;
use std::time::Duration;

use abeval_core::fakes::{MemoryHistoryStore, ScriptedBatchRunner};
use abeval_core::{
    BatchMode, BatchStatus, BatchSummary, CoordinatorConfig, ProgressPoller, ProgressRecord,
    ReconciliationScheduler, RemoteBatchStatus, RunId, ServiceError, SharedRun, SubmitAck,
};
use chrono::Utc;

fn record(status: RemoteBatchStatus, completed: u64) -> ProgressRecord {
    ProgressRecord {
        batch_id: "batch-1".to_string(),
        status,
        total: 6,
        completed_count: completed,
        passed_count: completed.saturating_sub(1),
        failed_count: completed.min(1),
        running_avg_score: 0.5,
        summary: None,
        updated_at: Utc::now(),
    }
}

fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig::default().with_reconcile_delays(
        Duration::from_millis(50),
        Duration::from_millis(50),
    )
}

struct Harness {
    runner: Arc<ScriptedBatchRunner>,
    history: Arc<MemoryHistoryStore>,
    shared: SharedRun,
    poller: ProgressPoller,
    run_id: RunId,
}

fn harness(config: CoordinatorConfig) -> Harness {
    let runner = Arc::new(ScriptedBatchRunner::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let shared = SharedRun::new();
    let scheduler = Arc::new(ReconciliationScheduler::new(
        history.clone(),
        shared.clone(),
        10,
    ));
    let poller = ProgressPoller::new(runner.clone(), shared.clone(), scheduler.clone(), config);

    let run_id = RunId::new();
    shared
        .lock()
        .accumulator
        .begin(run_id.clone(), BatchMode::ServerDelegated, 6, Utc::now());
    scheduler.arm();

    Harness {
        runner,
        history,
        shared,
        poller,
        run_id,
    }
}

#[tokio::test(start_paused = true)]
async fn polling_stops_on_terminal_record_and_reconciles_once() {
    let h = harness(fast_config());
    h.runner
        .push_progress(Ok(record(RemoteBatchStatus::Running, 3)));
    h.runner
        .push_progress(Ok(record(RemoteBatchStatus::Completed, 6)));

    let status = h
        .poller
        .run(&h.run_id, record(RemoteBatchStatus::Running, 1))
        .await;

    assert_eq!(status, BatchStatus::Completed);
    // one fetch per interval after the initial record, none after terminal
    assert_eq!(h.runner.fetch_count(), 2);
    assert_eq!(h.history.load_count(), 1);

    let state = h.shared.snapshot();
    assert_eq!(state.status, BatchStatus::Completed);
    assert_eq!(state.completed_count, 6);
    assert!(state.invariant_holds());
}

#[tokio::test(start_paused = true)]
async fn transient_fetch_errors_do_not_stop_polling() {
    let h = harness(fast_config());
    h.runner
        .push_progress(Err(ServiceError::Transport("gateway hiccup".to_string())));
    h.runner
        .push_progress(Ok(record(RemoteBatchStatus::Running, 4)));
    h.runner
        .push_progress(Err(ServiceError::Transport("another hiccup".to_string())));
    h.runner
        .push_progress(Ok(record(RemoteBatchStatus::Completed, 6)));

    let status = h
        .poller
        .run(&h.run_id, record(RemoteBatchStatus::Running, 1))
        .await;

    assert_eq!(status, BatchStatus::Completed);
    assert_eq!(h.runner.fetch_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn remote_failure_propagates_as_failed_run() {
    let h = harness(fast_config());
    h.runner
        .push_progress(Ok(record(RemoteBatchStatus::Failed, 2)));

    let status = h
        .poller
        .run(&h.run_id, record(RemoteBatchStatus::Running, 0))
        .await;

    assert_eq!(status, BatchStatus::Failed);
    assert_eq!(h.shared.snapshot().status, BatchStatus::Failed);
    // reconciliation still fires, with no summary to publish
    assert_eq!(h.history.load_count(), 1);
    assert!(h.shared.lock().summary.is_none());
}

#[tokio::test(start_paused = true)]
async fn terminal_summary_is_published_when_present() {
    let h = harness(fast_config());
    let mut terminal = record(RemoteBatchStatus::Completed, 6);
    terminal.summary = Some(BatchSummary {
        pass_rate: 5.0 / 6.0,
        avg_score: 0.5,
        total: 6,
        wall_clock_ms: 12_000,
    });
    h.runner.push_progress(Ok(terminal.clone()));

    h.poller
        .run(&h.run_id, record(RemoteBatchStatus::Running, 5))
        .await;

    assert_eq!(h.shared.lock().summary, terminal.summary);
}

#[tokio::test(start_paused = true)]
async fn stall_timeout_forces_failed_state() {
    // remote never reaches a terminal status; the configured bound trips
    let config = fast_config().with_stall_timeout(Duration::from_secs(10));
    let h = harness(config);

    let status = h
        .poller
        .run(&h.run_id, record(RemoteBatchStatus::Running, 2))
        .await;

    assert_eq!(status, BatchStatus::Failed);
    assert_eq!(h.shared.snapshot().status, BatchStatus::Failed);
    assert!(h.shared.lock().summary.is_none());
    assert_eq!(h.history.load_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn resolve_initial_prefers_inline_record() {
    let h = harness(fast_config());
    let inline = record(RemoteBatchStatus::Running, 0);

    let resolved = h
        .poller
        .resolve_initial(SubmitAck {
            batch_id: None,
            progress: Some(inline.clone()),
        })
        .await
        .expect("inline record");

    assert_eq!(resolved, inline);
    assert_eq!(h.runner.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn resolve_initial_falls_back_to_latest_record() {
    let h = harness(fast_config());
    h.runner
        .push_progress(Err(ServiceError::NotFound("batch-1".to_string())));
    h.runner.set_latest(record(RemoteBatchStatus::Running, 1));

    let resolved = h
        .poller
        .resolve_initial(SubmitAck {
            batch_id: Some("batch-1".to_string()),
            progress: None,
        })
        .await
        .expect("fallback record");

    assert_eq!(resolved.completed_count, 1);
    assert_eq!(h.runner.fetch_count(), 1);
    assert_eq!(h.runner.latest_query_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn resolve_initial_without_id_or_record_is_malformed() {
    let h = harness(fast_config());

    let err = h
        .poller
        .resolve_initial(SubmitAck {
            batch_id: None,
            progress: None,
        })
        .await
        .expect_err("neither shape");

    assert!(matches!(err, ServiceError::Malformed(_)));
}
