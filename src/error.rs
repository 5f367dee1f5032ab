//! Error taxonomy and the JSON error envelope.
//!
//! # Responsibilities
//! - Classify every failure a request can hit (client, routing, upstream)
//! - Map each class to a single HTTP status
//! - Render `{"error": "..."}` so nothing escapes as a protocol-level failure
//!
//! # Design Decisions
//! - 400 for client-caused errors, 404 for routing and missing resources
//! - 502 for anything the upstream got wrong, 504 when the request deadline
//!   passes, 500 only for our own bugs
//! - CORS headers are added by the outer layer, not here

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the request pipeline.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A required query parameter was absent or blank.
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    /// A query parameter was present but malformed.
    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The upstream could not be reached (connect, timeout, TLS).
    #[error("upstream request failed: {0}")]
    UpstreamRequest(String),

    /// The upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    /// The upstream body was not JSON or not the expected shape.
    #[error("invalid upstream response: {0}")]
    UpstreamParse(String),

    /// The request deadline passed before the upstream answered.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The upstream body reported an error of its own.
    #[error("upstream reported an error: {0}")]
    UpstreamLogical(String),

    /// The download URL does not belong to a supported platform.
    #[error("unsupported platform for url '{0}'")]
    UnsupportedPlatform(String),

    /// A detail lookup returned nothing.
    #[error("{0} not found")]
    ResourceNotFound(String),

    #[error("no route for path '{0}'")]
    RouteNotFound(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status for this error class.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter(_)
            | ProxyError::InvalidParameter { .. }
            | ProxyError::UnsupportedPlatform(_) => StatusCode::BAD_REQUEST,
            ProxyError::ResourceNotFound(_) | ProxyError::RouteNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::UpstreamRequest(_)
            | ProxyError::UpstreamStatus { .. }
            | ProxyError::UpstreamParse(_)
            | ProxyError::UpstreamLogical(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure originated upstream.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self.status(),
            StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT
        )
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProxyError::UpstreamStatus {
                status: status.as_u16(),
            },
            None => ProxyError::UpstreamRequest(err.to_string()),
        }
    }
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            error: self.to_string(),
        };
        (self.status(), Json(envelope)).into_response()
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
