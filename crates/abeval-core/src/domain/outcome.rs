//! Per-item invocation outcomes.

use serde::{Deserialize, Serialize};

/// The recorded result of one item's evaluation attempt.
///
/// Created once per item, immutable, appended in order to the run's
/// outcome list. `succeeded = false` means the invocation itself failed
/// (network or remote error); `passed` is only meaningful when
/// `succeeded` is true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvocationOutcome {
    /// Identifier of the item this outcome belongs to.
    pub item_id: String,

    /// Whether the invocation itself completed.
    pub succeeded: bool,

    /// Verdict from the scoring service, when the invocation completed.
    pub passed: Option<bool>,

    /// Quality/performance delta reported by the scoring service.
    pub score: Option<f64>,

    /// Remote-reported invocation duration.
    pub duration_ms: Option<u64>,

    /// Error description when `succeeded` is false.
    pub error: Option<String>,
}

impl InvocationOutcome {
    /// Outcome for a completed invocation with a verdict.
    pub fn verdict(item_id: &str, passed: bool, score: f64, duration_ms: u64) -> Self {
        Self {
            item_id: item_id.to_string(),
            succeeded: true,
            passed: Some(passed),
            score: Some(score),
            duration_ms: Some(duration_ms),
            error: None,
        }
    }

    /// Outcome for an invocation that itself failed.
    ///
    /// Counts toward `failed_count`; the batch does not abort.
    pub fn invocation_failed(item_id: &str, error: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            succeeded: false,
            passed: None,
            score: None,
            duration_ms: None,
            error: Some(error.to_string()),
        }
    }

    /// Whether this outcome counts toward `passed_count`.
    pub fn counts_as_passed(&self) -> bool {
        self.succeeded && self.passed == Some(true)
    }
}
