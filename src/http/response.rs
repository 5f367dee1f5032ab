//! Response shaping.
//!
//! # Responsibilities
//! - Answer CORS preflight (`OPTIONS`) on any path
//! - Render success bodies and the `{"error": ...}` envelope
//!
//! # Design Decisions
//! - Preflight never reaches routing, so unknown paths still get CORS headers
//! - `Access-Control-Allow-Origin` is stamped on every response by an outer layer

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::error::{ErrorEnvelope, ProxyError};

pub const ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, X-Request-Id";
pub const PREFLIGHT_MAX_AGE: &str = "86400";

/// Short-circuit `OPTIONS` with an empty preflight response.
pub async fn cors_preflight(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight_response();
    }
    next.run(request).await
}

pub fn preflight_response() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

pub fn success_response(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// Error envelope; upstream failures are prefixed with the operation name.
pub fn error_response(err: &ProxyError, operation: Option<&str>) -> Response {
    let message = match operation {
        Some(op) if err.is_upstream() => format!("failed to fetch {}: {}", op, err),
        _ => err.to_string(),
    };
    (err.status(), Json(ErrorEnvelope { error: message })).into_response()
}
