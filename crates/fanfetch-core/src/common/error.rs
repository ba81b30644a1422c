//! Error types for the URL collection service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of a batch. It implements [`IntoResponse`] so handlers
//! can return it directly and have it rendered with the right status code.
//!
//! ## Error Cases
//! - `InvalidBatchSize`: The batch holds more URLs than allowed.
//! - `InvalidUrl`: One or more URLs failed syntactic validation. All offending
//!   URLs are reported together.
//! - `InvalidRequest`: The request body could not be decoded.
//! - `Transport`: A fetch failed at the connection, timeout, or body-read level.
//! - `CapacityExceeded`: The admission gate rejected the batch.
//! - `RequestCancelled`: A fetch was cancelled before it completed.
//! - `ServiceShutdown`: The batch arrived or was running while the service was
//!   shutting down.
//! - `MethodNotAllowed`: The collect endpoint was called with a method other
//!   than `POST`.
//! - `Internal`: A worker task failed to report (e.g. it panicked).

use crate::types::ErrorBody;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the URL collection service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The batch exceeded the maximum number of URLs.
    #[error("length of urls array must be less or equal {max}")]
    InvalidBatchSize { len: usize, max: usize },

    /// At least one URL is malformed. `reason` lists every offender.
    #[error("{reason}")]
    InvalidUrl { reason: String },

    /// The request body was not a valid batch document.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The fetch of `resource` failed below the HTTP status layer.
    #[error("failed to fetch {resource}: {reason}")]
    Transport { resource: String, reason: String },

    /// Too many batches are already in flight.
    #[error("Too Many Requests")]
    CapacityExceeded,

    /// The fetch was cancelled before it completed.
    #[error("Request cancelled")]
    RequestCancelled,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// Only `POST` is routed on the collect endpoint.
    #[error("only supported post method by this uri")]
    MethodNotAllowed,

    /// A worker task died without producing a result.
    #[error("Internal error: {context}")]
    Internal { context: String },
}

impl Error {
    /// HTTP status code this error is reported with.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBatchSize { .. }
            | Self::InvalidUrl { .. }
            | Self::InvalidRequest { .. }
            | Self::Transport { .. }
            | Self::MethodNotAllowed => StatusCode::BAD_REQUEST,
            Self::CapacityExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::RequestCancelled | Self::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // Capacity rejections carry the bare status text, not JSON.
            Self::CapacityExceeded => {
                (status, status.canonical_reason().unwrap_or_default()).into_response()
            }
            err => (
                status,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn validation_and_fetch_errors_are_bad_requests() {
        let errors = [
            Error::InvalidBatchSize { len: 21, max: 20 },
            Error::InvalidUrl {
                reason: "url x not valid: relative URL without a base".to_string(),
            },
            Error::InvalidRequest {
                reason: "EOF".to_string(),
            },
            Error::Transport {
                resource: "http://a.test".to_string(),
                reason: "connection refused".to_string(),
            },
            Error::MethodNotAllowed,
        ];
        for err in errors {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{err}");
        }
    }

    #[test]
    fn capacity_and_shutdown_statuses() {
        assert_eq!(
            Error::CapacityExceeded.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            Error::ServiceShutdown.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::RequestCancelled.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn batch_size_message() {
        let err = Error::InvalidBatchSize { len: 21, max: 20 };
        assert_eq!(err.to_string(), "length of urls array must be less or equal 20");
    }

    #[tokio::test]
    async fn json_error_envelope() {
        let response = Error::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.error, "only supported post method by this uri");
    }

    #[tokio::test]
    async fn capacity_exceeded_is_plain_status_text() {
        let response = Error::CapacityExceeded.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_text(response).await, "Too Many Requests");
    }
}
