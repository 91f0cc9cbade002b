//! Results export artifacts.
//!
//! A transportable, versioned document of one run's recorded outcomes,
//! written as pretty JSON for download or attachment to a report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::outcome::InvocationOutcome;
use crate::domain::run::BatchRunState;
use crate::domain::summary::BatchSummary;

/// Schema version stamped into every export.
pub const EXPORT_SCHEMA_VERSION: &str = "1.0";

/// Canonical export artifact for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,

    /// Snapshot of the run state at export time.
    pub run: BatchRunState,

    /// Digest of the item catalog (client-sequenced runs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_digest: Option<String>,

    /// Final summary, when the run reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,

    /// Recorded outcomes, in item (or fetch) order.
    pub outcomes: Vec<InvocationOutcome>,
}

/// Write an export artifact in pretty JSON format.
pub fn write_export_json(path: &Path, artifact: &ExportArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize export artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::BatchStatus;

    fn artifact() -> ExportArtifact {
        ExportArtifact {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            generated_at: DateTime::parse_from_rfc3339("2026-08-01T00:00:00Z")
                .expect("parse RFC3339")
                .with_timezone(&Utc),
            run: BatchRunState {
                status: BatchStatus::Completed,
                total: 1,
                completed_count: 1,
                passed_count: 1,
                ..BatchRunState::default()
            },
            catalog_digest: Some("ab".repeat(32)),
            summary: None,
            outcomes: vec![InvocationOutcome::verdict("q-1", true, 0.8, 120)],
        }
    }

    #[test]
    fn test_export_schema_has_expected_keys() {
        let raw = serde_json::to_value(artifact()).expect("serialize artifact");
        let obj = raw.as_object().expect("artifact object");
        assert!(obj.contains_key("schema_version"));
        assert!(obj.contains_key("generated_at"));
        assert!(obj.contains_key("run"));
        assert!(obj.contains_key("catalog_digest"));
        assert!(obj.contains_key("outcomes"));
        assert_eq!(raw["outcomes"][0]["item_id"], "q-1");
    }

    #[test]
    fn test_write_export_json_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("export.json");

        let original = artifact();
        write_export_json(&path, &original).expect("write");

        let content = std::fs::read_to_string(&path).expect("read back");
        let parsed: ExportArtifact = serde_json::from_str(&content).expect("deserialize");
        assert_eq!(original, parsed);
    }
}
