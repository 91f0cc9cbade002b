//! JSON-over-HTTP implementations of the collaborator traits.
//!
//! One client serves all three seams — evaluation invocation, batch
//! submission/progress, and history listing — since dashboards typically
//! talk to a single scoring backend. Endpoints:
//!
//! - `GET  /api/health`                — readiness probe
//! - `POST /api/evaluate`              — one scoring invocation
//! - `POST /api/batches`               — submit a delegated batch
//! - `GET  /api/batches/{id}/progress` — progress fetch
//! - `GET  /api/batches/latest`        — most-recent-record fallback
//! - `GET  /api/results`               — persisted result history

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use abeval_core::{
    BatchConfig, BatchRunner, EvalMode, EvalResponse, EvalService, HistoryEntry, HistorySort,
    HistoryStore, ProgressRecord, ServiceError, ServiceResult, SubmitAck, Verdict,
};

use crate::error::{check_status, service_error};

/// Scoring backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringApiConfig {
    /// Base URL of the scoring service.
    pub base_url: String,

    /// Bearer token (optional for open deployments).
    pub token: Option<String>,
}

impl Default for ScoringApiConfig {
    fn default() -> Self {
        ScoringApiConfig {
            base_url: std::env::var("ABEVAL_API_URL")
                .unwrap_or_else(|_| "http://localhost:8787".to_string()),
            token: std::env::var("ABEVAL_API_TOKEN").ok(),
        }
    }
}

impl ScoringApiConfig {
    /// Create a new config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific server.
    pub fn new(base_url: &str) -> Self {
        ScoringApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Set authentication token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// HTTP client implementing all three collaborator traits.
pub struct ScoringApiClient {
    config: ScoringApiConfig,
    http_client: reqwest::Client,
}

impl ScoringApiClient {
    /// Create a new client.
    pub fn new(config: ScoringApiConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("abeval-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        ScoringApiClient {
            config,
            http_client,
        }
    }

    /// Create client from environment variables.
    pub fn from_env() -> Self {
        Self::new(ScoringApiConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let response = self
            .authorize(self.http_client.get(self.url(path)))
            .send()
            .await
            .map_err(service_error)?;
        check_status(response)?.json::<T>().await.map_err(service_error)
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<T> {
        let response = self
            .authorize(self.http_client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(service_error)?;
        check_status(response)?.json::<T>().await.map_err(service_error)
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EvaluateWireRequest<'a> {
    item_id: &'a str,
    input: &'a str,
    mode: EvalMode,
}

#[derive(Debug, Deserialize)]
struct EvaluateWireResponse {
    success: bool,
    #[serde(default)]
    verdict: Option<Verdict>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Validate the wire shape; any violation becomes a `ServiceError` and
/// hence a failed outcome at the sequencer.
fn map_evaluate_response(wire: EvaluateWireResponse) -> ServiceResult<EvalResponse> {
    if !wire.success {
        return Err(ServiceError::Rejected(
            wire.error
                .unwrap_or_else(|| "evaluation reported failure".to_string()),
        ));
    }
    match (wire.verdict, wire.score, wire.duration_ms) {
        (Some(verdict), Some(score), Some(duration_ms)) => Ok(EvalResponse {
            verdict,
            score,
            duration_ms,
        }),
        _ => Err(ServiceError::Malformed(
            "successful evaluation missing verdict, score, or duration".to_string(),
        )),
    }
}

#[derive(Debug, Serialize)]
struct SubmitWireRequest<'a> {
    count: u64,
    config: &'a BatchConfig,
}

fn sort_param(sort: HistorySort) -> &'static str {
    match sort {
        HistorySort::NewestFirst => "newest_first",
        HistorySort::OldestFirst => "oldest_first",
    }
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl EvalService for ScoringApiClient {
    async fn ready(&self) -> ServiceResult<()> {
        let response = self
            .authorize(self.http_client.get(self.url("/api/health")))
            .send()
            .await
            .map_err(service_error)?;
        check_status(response).map(|_| ())
    }

    async fn evaluate(
        &self,
        item_id: &str,
        input: &str,
        mode: EvalMode,
    ) -> ServiceResult<EvalResponse> {
        debug!(item_id = %item_id, mode = %mode, "dispatching evaluation");
        let wire: EvaluateWireResponse = self
            .post_json(
                "/api/evaluate",
                &EvaluateWireRequest {
                    item_id,
                    input,
                    mode,
                },
            )
            .await?;
        map_evaluate_response(wire)
    }
}

#[async_trait]
impl BatchRunner for ScoringApiClient {
    async fn submit_batch(&self, count: u64, config: &BatchConfig) -> ServiceResult<SubmitAck> {
        debug!(count = count, mode = %config.mode, "submitting delegated batch");
        self.post_json("/api/batches", &SubmitWireRequest { count, config })
            .await
    }

    async fn get_progress(&self, batch_id: &str) -> ServiceResult<ProgressRecord> {
        self.get_json(&format!("/api/batches/{batch_id}/progress"))
            .await
    }

    async fn latest_progress(&self) -> ServiceResult<Option<ProgressRecord>> {
        match self.get_json::<ProgressRecord>("/api/batches/latest").await {
            Ok(record) => Ok(Some(record)),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl HistoryStore for ScoringApiClient {
    async fn list_results(
        &self,
        sort: HistorySort,
        limit: usize,
    ) -> ServiceResult<Vec<HistoryEntry>> {
        self.get_json(&format!(
            "/api/results?sort={}&limit={}",
            sort_param(sort),
            limit
        ))
        .await
    }
}
