//! Abeval Core Library
//!
//! Batch execution coordinator for comparative ("Mode A vs Mode B")
//! evaluation runs: client-sequenced item driving, server-delegated
//! progress polling, live progress accumulation, and post-run history
//! reconciliation. Scoring, batch execution, and result persistence live
//! behind the collaborator traits in [`services`].

pub mod accumulator;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod export;
pub mod fakes;
pub mod obs;
pub mod poller;
pub mod reconcile;
pub mod sequencer;
pub mod services;
pub mod state;
pub mod telemetry;

pub use accumulator::ProgressAccumulator;
pub use config::{BatchConfig, CoordinatorConfig};
pub use controller::{BatchController, StartRequest};
pub use domain::{
    catalog_digest, BatchMode, BatchRunState, BatchStatus, BatchSummary, EvalMode, HistoryEntry,
    InvocationOutcome, ProgressRecord, RemoteBatchStatus, RunId, TestItem,
};
pub use error::{CoordinatorError, Result, ServiceError, ServiceResult};
pub use export::{write_export_json, ExportArtifact, EXPORT_SCHEMA_VERSION};
pub use poller::ProgressPoller;
pub use reconcile::ReconciliationScheduler;
pub use sequencer::{CancelFlag, Sequencer};
pub use services::{
    BatchRunner, EvalResponse, EvalService, HistorySort, HistoryStore, SubmitAck, Verdict,
};
pub use state::{RunShared, SharedRun};
pub use telemetry::init_tracing;

/// Abeval version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
