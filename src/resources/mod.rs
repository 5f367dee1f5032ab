//! Resource pipeline.
//!
//! # Data Flow
//! ```text
//! Endpoint + ProxyRequest
//!     → Operation::resolve (validate parameters, resolve platform)
//!     → Operation::upstream_request (anime.rs / media.rs builders)
//!     → UpstreamClient::fetch_json (cached)
//!     → Operation::normalize (anime.rs / media.rs mappers)
//!     → JSON value for the response body
//! ```
//!
//! # Design Decisions
//! - Every route is one {request builder, mapper} pair; no per-route handler
//! - Parameters are validated before any upstream is contacted

pub mod anime;
pub mod fallback;
pub mod media;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::{EditorialConfig, UpstreamConfig};
use crate::error::{ProxyError, ProxyResult};
use crate::http::request::ProxyRequest;
use crate::routing::Endpoint;
use crate::upstream::{Clock, UpstreamClient, UpstreamRequest};

pub use anime::Ranking;
pub use media::{DownloadTarget, Platform};

/// A fully validated unit of work for one inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    SearchAnime { query: String },
    SearchVideos { query: String },
    AnimeDetail { id: i64 },
    Schedule,
    Ranked(Ranking),
    Download(DownloadTarget),
}

impl Operation {
    /// Validate the request parameters for `endpoint`.
    pub fn resolve(
        endpoint: Endpoint,
        request: &ProxyRequest,
        editorial: &EditorialConfig,
    ) -> ProxyResult<Self> {
        match endpoint {
            Endpoint::Search => {
                let query = request.require("q")?.to_string();
                match request.param("source").unwrap_or("anime") {
                    "anime" => Ok(Operation::SearchAnime { query }),
                    "video" => Ok(Operation::SearchVideos { query }),
                    other => Err(ProxyError::InvalidParameter {
                        name: "source",
                        reason: format!("expected 'anime' or 'video', got '{}'", other),
                    }),
                }
            }
            Endpoint::Anime => {
                let raw = request.require("id")?;
                let id = raw
                    .parse::<i64>()
                    .ok()
                    .filter(|id| *id > 0)
                    .ok_or_else(|| ProxyError::InvalidParameter {
                        name: "id",
                        reason: format!("'{}' is not a positive integer", raw),
                    })?;
                Ok(Operation::AnimeDetail { id })
            }
            Endpoint::Schedule => Ok(Operation::Schedule),
            Endpoint::Trending => Ok(Operation::Ranked(Ranking::Trending)),
            Endpoint::Popular => Ok(Operation::Ranked(Ranking::Popular)),
            Endpoint::Editorial => Ok(Operation::Ranked(Ranking::Editorial {
                season: editorial.season,
                year: editorial.season_year,
            })),
            Endpoint::Download => {
                let url = request.require("url")?;
                Ok(Operation::Download(DownloadTarget::new(
                    url,
                    request.param("format"),
                )?))
            }
        }
    }

    /// Name used in logs, metrics and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::SearchAnime { .. } => "search",
            Operation::SearchVideos { .. } => "video_search",
            Operation::AnimeDetail { .. } => "anime",
            Operation::Schedule => "schedule",
            Operation::Ranked(ranking) => ranking.label(),
            Operation::Download(_) => "download",
        }
    }

    /// Describe the outbound call. `now_secs` anchors the schedule window.
    pub fn upstream_request(&self, upstreams: &UpstreamConfig, now_secs: i64) -> UpstreamRequest {
        let anilist = upstreams.anilist_url.as_str();
        match self {
            Operation::SearchAnime { query } => anime::search_request(anilist, query),
            Operation::SearchVideos { query } => media::video_search_request(upstreams, query),
            Operation::AnimeDetail { id } => anime::detail_request(anilist, *id),
            Operation::Schedule => anime::schedule_request(anilist, now_secs, 1),
            Operation::Ranked(ranking) => anime::ranked_request(anilist, *ranking),
            Operation::Download(target) => target.upstream_request(upstreams),
        }
    }

    /// Map the upstream body into this operation's output shape.
    pub fn normalize(&self, body: Value) -> ProxyResult<Value> {
        match self {
            Operation::SearchAnime { .. } => to_json(anime::normalize_search(body)?),
            Operation::SearchVideos { .. } => to_json(media::normalize_video_search(body)?),
            Operation::AnimeDetail { id } => to_json(anime::normalize_detail(body, *id)?),
            Operation::Schedule => to_json(anime::normalize_schedule(body)?),
            Operation::Ranked(_) => to_json(anime::normalize_ranked(body)?),
            Operation::Download(target) => to_json(target.normalize(body)?),
        }
    }
}

fn to_json<T: Serialize>(value: T) -> ProxyResult<Value> {
    serde_json::to_value(value).map_err(|e| ProxyError::Internal(e.to_string()))
}

/// Runs operations against the configured upstreams.
pub struct Pipeline {
    client: UpstreamClient,
    upstreams: UpstreamConfig,
    editorial: EditorialConfig,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        client: UpstreamClient,
        upstreams: UpstreamConfig,
        editorial: EditorialConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            upstreams,
            editorial,
            clock,
        }
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub fn resolve(&self, endpoint: Endpoint, request: &ProxyRequest) -> ProxyResult<Operation> {
        Operation::resolve(endpoint, request, &self.editorial)
    }

    /// Fetch and normalize the response for `operation`.
    pub async fn execute(&self, operation: &Operation) -> ProxyResult<Value> {
        let now_secs = self.clock.now().as_secs() as i64;
        if let Operation::Schedule = operation {
            return self.execute_schedule(now_secs).await;
        }
        let request = operation.upstream_request(&self.upstreams, now_secs);

        let body = match self.client.fetch_json(&request).await {
            Ok(body) => body,
            // AniList answers unknown ids with HTTP 404
            Err(ProxyError::UpstreamStatus { status: 404 }) => {
                if let Operation::AnimeDetail { id } = operation {
                    return Err(ProxyError::ResourceNotFound(format!("anime {}", id)));
                }
                return Err(ProxyError::UpstreamStatus { status: 404 });
            }
            Err(e) => return Err(e),
        };

        operation.normalize(body)
    }

    /// Collect every page of the schedule window, each page cached on its own.
    async fn execute_schedule(&self, now_secs: i64) -> ProxyResult<Value> {
        let anilist = self.upstreams.anilist_url.as_str();
        let mut entries = Vec::new();
        for page in 1..=anime::MAX_SCHEDULE_PAGES {
            let request = anime::schedule_request(anilist, now_secs, page);
            let body = self.client.fetch_json(&request).await?;
            let (mut slots, has_next) = anime::normalize_schedule_page(body)?;
            entries.append(&mut slots);
            if !has_next {
                break;
            }
            if page == anime::MAX_SCHEDULE_PAGES {
                tracing::warn!(pages = page, "Schedule truncated at page limit");
            }
        }
        to_json(entries)
    }
}
