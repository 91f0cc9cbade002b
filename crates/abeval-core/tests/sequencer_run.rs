//! Client-sequenced execution scenarios driven through the Sequencer with
//! scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use abeval_core::fakes::{MemoryHistoryStore, ScriptedEvalService};
use abeval_core::{
    BatchMode, BatchStatus, CancelFlag, CoordinatorConfig, EvalMode, ReconciliationScheduler,
    RunId, Sequencer, SharedRun, TestItem,
};
use chrono::Utc;

fn items(n: usize) -> Vec<TestItem> {
    (1..=n)
        .map(|i| TestItem::new(&format!("q-{i}"), &format!("payload {i}")))
        .collect()
}

fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_item_delay(Duration::from_millis(50))
        .with_reconcile_delays(Duration::from_millis(50), Duration::from_millis(50))
}

struct Harness {
    eval: Arc<ScriptedEvalService>,
    history: Arc<MemoryHistoryStore>,
    shared: SharedRun,
    scheduler: Arc<ReconciliationScheduler>,
    cancel: CancelFlag,
    sequencer: Sequencer,
    run_id: RunId,
}

fn harness(total: u64) -> Harness {
    let eval = Arc::new(ScriptedEvalService::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let shared = SharedRun::new();
    let scheduler = Arc::new(ReconciliationScheduler::new(
        history.clone(),
        shared.clone(),
        10,
    ));
    let cancel = CancelFlag::new();
    let sequencer = Sequencer::new(
        eval.clone(),
        shared.clone(),
        scheduler.clone(),
        cancel.clone(),
        fast_config(),
    );

    let run_id = RunId::new();
    shared.lock().accumulator.begin(
        run_id.clone(),
        BatchMode::ClientSequenced,
        total,
        Utc::now(),
    );
    scheduler.arm();

    Harness {
        eval,
        history,
        shared,
        scheduler,
        cancel,
        sequencer,
        run_id,
    }
}

#[tokio::test(start_paused = true)]
async fn five_items_with_one_error_still_complete() {
    let h = harness(5);
    h.eval.push_pass(0.9);
    h.eval.push_pass(0.8);
    h.eval.push_error("remote evaluation error");
    h.eval.push_pass(0.7);
    h.eval.push_pass(0.6);

    let status = h
        .sequencer
        .run(&h.run_id, &items(5), EvalMode::ModeA)
        .await;

    assert_eq!(status, BatchStatus::Completed);
    let state = h.shared.snapshot();
    assert_eq!(state.total, 5);
    assert_eq!(state.completed_count, 5);
    assert_eq!(state.passed_count, 4);
    assert_eq!(state.failed_count, 1);
    assert!(state.invariant_holds());
}

#[tokio::test(start_paused = true)]
async fn every_item_attempted_exactly_once_despite_errors() {
    let h = harness(4);
    h.eval.push_error("boom 1");
    h.eval.push_error("boom 2");
    h.eval.push_pass(0.5);
    h.eval.push_fail(0.1);

    let status = h
        .sequencer
        .run(&h.run_id, &items(4), EvalMode::ModeB)
        .await;

    assert_eq!(status, BatchStatus::Completed);
    assert_eq!(
        h.eval.calls(),
        vec!["q-1", "q-2", "q-3", "q-4"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
    assert_eq!(h.shared.snapshot().completed_count, 4);
}

#[tokio::test(start_paused = true)]
async fn outcomes_are_recorded_in_item_order() {
    let h = harness(3);
    h.eval.push_pass(0.1);
    h.eval.push_error("mid-batch failure");
    h.eval.push_pass(0.3);

    h.sequencer.run(&h.run_id, &items(3), EvalMode::ModeA).await;

    let outcomes = h.shared.lock().outcomes.clone();
    let ids: Vec<_> = outcomes.iter().map(|o| o.item_id.as_str()).collect();
    assert_eq!(ids, vec!["q-1", "q-2", "q-3"]);
    assert!(outcomes[0].succeeded);
    assert!(!outcomes[1].succeeded);
    assert_eq!(
        outcomes[1].error.as_deref(),
        Some("transport error: mid-batch failure")
    );
}

#[tokio::test(start_paused = true)]
async fn pause_after_second_item_stops_at_item_boundary() {
    let h = harness(5);
    for _ in 0..5 {
        h.eval.push_pass(0.5);
    }
    // flag raised while item 2's invocation is in flight: its outcome is
    // still recorded, and the loop stops before item 3
    h.eval.cancel_after(2, h.cancel.clone());

    let status = h
        .sequencer
        .run(&h.run_id, &items(5), EvalMode::ModeA)
        .await;

    assert_eq!(status, BatchStatus::Paused);
    let state = h.shared.snapshot();
    assert_eq!(state.status, BatchStatus::Paused);
    assert_eq!(state.completed_count, 2);
    assert_eq!(h.eval.calls().len(), 2);
    assert_eq!(h.shared.lock().outcomes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn completion_reconciles_history_exactly_once() {
    let h = harness(2);
    h.eval.push_pass(0.9);
    h.eval.push_pass(0.7);

    h.sequencer.run(&h.run_id, &items(2), EvalMode::ModeA).await;
    assert_eq!(h.history.load_count(), 1);

    // duplicate settle (e.g. a racing manual path) is skipped
    h.scheduler
        .settle(&h.run_id, Duration::from_millis(50), None)
        .await;
    assert_eq!(h.history.load_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn completed_run_publishes_summary() {
    let h = harness(2);
    h.eval.push_pass(1.0);
    h.eval.push_fail(0.0);

    h.sequencer.run(&h.run_id, &items(2), EvalMode::ModeA).await;

    let summary = h.shared.lock().summary.clone().expect("terminal summary");
    assert!((summary.pass_rate - 0.5).abs() < 1e-9);
    assert!((summary.avg_score - 0.5).abs() < 1e-9);
    assert_eq!(summary.total, 2);
}

#[tokio::test(start_paused = true)]
async fn paused_run_still_reconciles_without_summary() {
    let h = harness(3);
    h.eval.push_pass(0.5);
    h.eval.push_pass(0.5);
    h.eval.push_pass(0.5);
    h.eval.cancel_after(1, h.cancel.clone());

    let status = h
        .sequencer
        .run(&h.run_id, &items(3), EvalMode::ModeA)
        .await;

    assert_eq!(status, BatchStatus::Paused);
    assert_eq!(h.history.load_count(), 1);
    assert!(h.shared.lock().summary.is_none());
}
