//! Coordinator timing policy and per-batch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::run::EvalMode;

/// Timing policy for the coordinator.
///
/// The inter-item delay is a deliberate backpressure policy toward the
/// scoring service, not a performance accident. The poll interval and the
/// elapsed ticker are independent cadences.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Fixed delay between client-sequenced items.
    pub item_delay: Duration,

    /// Fixed interval between remote progress fetches.
    pub poll_interval: Duration,

    /// Settle delay before the first fetch when submission returns only a
    /// batch id (the remote record may not exist yet).
    pub submit_settle: Duration,

    /// Elapsed-display ticker period. Carries no state-machine weight.
    pub ticker_interval: Duration,

    /// History reload delay after a client-sequenced run ends.
    pub reconcile_delay_sequenced: Duration,

    /// History reload delay after a server-delegated run ends.
    pub reconcile_delay_delegated: Duration,

    /// Optional bound on total polling time. `None` polls until the remote
    /// batch reports a terminal status, however long that takes.
    pub stall_timeout: Option<Duration>,

    /// Page size for reconciliation history reloads.
    pub history_limit: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(1_500),
            poll_interval: Duration::from_secs(2),
            submit_settle: Duration::from_millis(500),
            ticker_interval: Duration::from_millis(500),
            reconcile_delay_sequenced: Duration::from_millis(1_500),
            reconcile_delay_delegated: Duration::from_millis(3_000),
            stall_timeout: None,
            history_limit: 50,
        }
    }
}

impl CoordinatorConfig {
    /// Override the inter-item delay.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound total polling time; the run fails with a stall warning when
    /// exceeded.
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = Some(timeout);
        self
    }

    /// Override both reconciliation delays at once.
    pub fn with_reconcile_delays(mut self, sequenced: Duration, delegated: Duration) -> Self {
        self.reconcile_delay_sequenced = sequenced;
        self.reconcile_delay_delegated = delegated;
        self
    }
}

/// Per-run configuration submitted with a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchConfig {
    /// Comparison arm this batch exercises.
    pub mode: EvalMode,

    /// Optional operator-supplied label for dashboards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BatchConfig {
    /// Create a config for the given mode.
    pub fn new(mode: EvalMode) -> Self {
        Self { mode, label: None }
    }

    /// Attach an operator label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(EvalMode::ModeA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_config_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.item_delay, Duration::from_millis(1_500));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.ticker_interval, Duration::from_millis(500));
        assert!(config.stall_timeout.is_none());
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_coordinator_config_builders() {
        let config = CoordinatorConfig::default()
            .with_item_delay(Duration::from_millis(10))
            .with_poll_interval(Duration::from_millis(20))
            .with_stall_timeout(Duration::from_secs(60));

        assert_eq!(config.item_delay, Duration::from_millis(10));
        assert_eq!(config.poll_interval, Duration::from_millis(20));
        assert_eq!(config.stall_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_batch_config_serde_roundtrip() {
        let config = BatchConfig::new(EvalMode::ModeB).with_label("nightly regression");
        let json = serde_json::to_string(&config).expect("serialize");
        let deserialized: BatchConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_batch_config_label_omitted_when_absent() {
        let json = serde_json::to_string(&BatchConfig::default()).expect("serialize");
        assert!(!json.contains("label"));
    }
}
