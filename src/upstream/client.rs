//! Upstream HTTP client with optional response caching.
//!
//! # Responsibilities
//! - Issue the outbound call described by an `UpstreamRequest`
//! - Serve repeated identical requests from the TTL cache
//! - Turn transport failures, non-2xx statuses and non-JSON bodies into errors
//!
//! # Design Decisions
//! - Only parsed, successful responses are stored
//! - No retries: a failed call surfaces immediately

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;

use crate::config::{CacheConfig, TimeoutConfig, UpstreamConfig};
use crate::error::{ProxyError, ProxyResult};
use crate::observability::metrics;
use crate::upstream::cache::{Clock, ResponseCache};
use crate::upstream::request::UpstreamRequest;

/// Client for every upstream the proxy talks to.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    cache: Option<Arc<ResponseCache>>,
}

impl UpstreamClient {
    /// Build a client from configuration.
    pub fn new(
        upstreams: &UpstreamConfig,
        timeouts: &TimeoutConfig,
        cache: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> ProxyResult<Self> {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .user_agent(user_agent);
        if !upstreams.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let cache = cache.enabled.then(|| {
            Arc::new(ResponseCache::new(
                Duration::from_secs(cache.ttl_secs),
                clock,
            ))
        });

        Ok(Self { http, cache })
    }

    /// The response cache, when caching is enabled.
    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// Fetch and parse the JSON body for `request`, consulting the cache first.
    pub async fn fetch_json(&self, request: &UpstreamRequest) -> ProxyResult<Value> {
        let key = request.cache_key();

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                tracing::debug!(upstream = request.upstream, cache = "hit", "Serving cached upstream response");
                return Ok(hit);
            }
        }

        let value = self.send(request).await?;

        if let Some(cache) = &self.cache {
            cache.insert(key, value.clone());
        }
        Ok(value)
    }

    async fn send(&self, request: &UpstreamRequest) -> ProxyResult<Value> {
        let start = Instant::now();
        let mut builder = self.http.request(request.method.clone(), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            upstream = request.upstream,
            method = %request.method,
            url = %request.url,
            "Calling upstream"
        );

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(upstream = request.upstream, error = %e, "Upstream unreachable");
                metrics::record_upstream(request.upstream, "transport_error", start);
                return Err(e.into());
            }
        };

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            metrics::record_upstream(request.upstream, "transport_error", start);
            ProxyError::UpstreamRequest(e.to_string())
        })?;

        if !status.is_success() {
            tracing::warn!(
                upstream = request.upstream,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&bytes[..bytes.len().min(256)]),
                "Upstream returned error status"
            );
            metrics::record_upstream(request.upstream, "bad_status", start);
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => {
                metrics::record_upstream(request.upstream, "ok", start);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(upstream = request.upstream, error = %e, "Upstream body is not JSON");
                metrics::record_upstream(request.upstream, "parse_error", start);
                Err(ProxyError::UpstreamParse(e.to_string()))
            }
        }
    }
}
