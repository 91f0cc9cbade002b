//! HTTP collaborator adapters for the abeval coordinator.
//!
//! Implements the `abeval-core` service traits against a JSON-over-HTTP
//! scoring backend. The coordinator core stays transport-agnostic; all
//! wire framing lives here.

mod error;
pub mod http;

pub use http::{ScoringApiClient, ScoringApiConfig};
