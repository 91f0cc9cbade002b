//! Error taxonomy for the batch coordinator.
//!
//! Two layers: [`ServiceError`] for failures surfaced by external
//! collaborators (scoring service, batch runner, history store), and
//! [`CoordinatorError`] for lifecycle violations and start-time failures.
//! Item-level and poll-level failures never appear here — they are recorded
//! as outcomes or logged and swallowed, and the run continues.

/// Errors surfaced by external collaborator services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Coordinator lifecycle errors.
///
/// Everything here is either a start-time failure (the run never leaves
/// `Idle`) or an invalid operation for the current status.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("a run is already active")]
    RunActive,

    #[error("reset is not valid while a run is active")]
    ResetWhileRunning,

    #[error("batch has no items")]
    EmptyBatch,

    #[error("evaluation service is not ready: {0}")]
    NotReady(ServiceError),

    #[error("batch submission failed: {0}")]
    Submit(ServiceError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Result type for collaborator service calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_error_display() {
        let err = CoordinatorError::RunActive;
        assert!(err.to_string().contains("already active"));

        let err = CoordinatorError::EmptyBatch;
        assert!(err.to_string().contains("no items"));

        let err = CoordinatorError::Submit(ServiceError::Rejected("quota exceeded".to_string()));
        let msg = err.to_string();
        assert!(msg.contains("submission failed"));
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn test_service_error_from() {
        let err: CoordinatorError = ServiceError::Transport("connection refused".to_string()).into();
        assert!(err.to_string().contains("connection refused"));
    }
}
