//! Test catalog items.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An immutable unit of work, produced by the external catalog.
///
/// The coordinator never creates or mutates items; it only iterates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestItem {
    /// Unique identifier within the catalog.
    pub item_id: String,

    /// Input payload handed to the scoring service.
    pub input: String,

    /// Optional classification (e.g. "reasoning", "retrieval").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Optional difficulty label (e.g. "easy", "hard").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl TestItem {
    /// Create a new item with no classification metadata.
    pub fn new(item_id: &str, input: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            input: input.to_string(),
            category: None,
            difficulty: None,
        }
    }

    /// Set the category label.
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Set the difficulty label.
    pub fn with_difficulty(mut self, difficulty: &str) -> Self {
        self.difficulty = Some(difficulty.to_string());
        self
    }
}

/// SHA-256 hex digest over the ordered item identifiers and payloads.
///
/// Tags exported results so two exports can be compared for catalog
/// equality without shipping the catalog itself. Identifier and payload
/// are NUL-separated so `("a", "bc")` and `("ab", "c")` hash differently.
pub fn catalog_digest(items: &[TestItem]) -> String {
    let mut hasher = Sha256::new();
    for item in items {
        hasher.update(item.item_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(item.input.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
