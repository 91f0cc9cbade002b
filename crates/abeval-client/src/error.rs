//! Mapping of transport-layer failures into service errors.
//!
//! The coordinator treats collaborators as black boxes: anything that goes
//! wrong on the wire must surface as a [`ServiceError`] so the caller can
//! record a failed outcome or swallow a transient poll fault. Nothing in
//! this crate defines its own error type.

use abeval_core::{ServiceError, ServiceResult};
use reqwest::StatusCode;

/// Classify a reqwest failure: body-decode problems are shape violations,
/// everything else is transport.
pub(crate) fn service_error(err: reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::Malformed(err.to_string())
    } else {
        ServiceError::Transport(err.to_string())
    }
}

/// Reject non-2xx responses before decoding.
pub(crate) fn check_status(response: reqwest::Response) -> ServiceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::NOT_FOUND {
        Err(ServiceError::NotFound(response.url().path().to_string()))
    } else {
        Err(ServiceError::Rejected(format!(
            "{} returned {}",
            response.url().path(),
            status
        )))
    }
}
