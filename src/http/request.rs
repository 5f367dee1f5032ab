//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Decode the query string into a `ProxyRequest`
//! - Enforce required parameters before any upstream is contacted
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Blank parameters are treated as missing

use std::collections::HashMap;

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::{ProxyError, ProxyResult};

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Path and decoded query parameters of one inbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    path: String,
    params: HashMap<String, String>,
}

impl ProxyRequest {
    /// Build from a path and raw (still encoded) query string.
    ///
    /// When a key repeats, the first occurrence wins.
    pub fn new(path: &str, query: Option<&str>) -> Self {
        let mut params = HashMap::new();
        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params
                    .entry(key.into_owned())
                    .or_insert_with(|| value.into_owned());
            }
        }
        Self {
            path: path.to_string(),
            params,
        }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(request.uri().path(), request.uri().query())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Trimmed parameter value, `None` when absent or blank.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &'static str) -> ProxyResult<&str> {
        self.param(name).ok_or(ProxyError::MissingParameter(name))
    }
}
