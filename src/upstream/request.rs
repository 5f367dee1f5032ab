//! Outbound request description.

use reqwest::Method;
use serde_json::Value;

/// A single outbound call, described before it is made.
///
/// The same description is used to issue the call and to key the cache, so
/// two requests share a cache entry only if they are byte-for-byte the same.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    /// Label used in logs and metrics (e.g. "anilist", "tiktok").
    pub upstream: &'static str,
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn get(upstream: &'static str, url: impl Into<String>) -> Self {
        Self {
            upstream,
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(upstream: &'static str, url: impl Into<String>, body: Value) -> Self {
        Self {
            upstream,
            method: Method::POST,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Build a GraphQL POST with `{query, variables}`.
    pub fn graphql(url: impl Into<String>, query: &str, variables: Value) -> Self {
        Self::post_json(
            "anilist",
            url,
            serde_json::json!({ "query": query, "variables": variables }),
        )
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// URL including the encoded query string.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, sep, encoded)
    }

    /// Exact request signature: method, full URL and serialized body.
    pub fn cache_key(&self) -> String {
        let body = self
            .body
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        format!("{} {} {}", self.method, self.full_url(), body)
    }
}
