//! Video search and media-download resources.
//!
//! # Responsibilities
//! - Resolve a download URL to a `Platform` once, at the boundary
//! - Build the extraction call for that platform
//! - Map each platform's own response schema to one `DownloadResult`
//!
//! # Design Decisions
//! - Platform detection parses the URL and matches the host, never substrings
//!   of the whole string
//! - An upstream `error` field (or non-zero `code`) is a logical failure even
//!   when the HTTP status was 2xx
//! - Extractor schemas are undocumented: a field of the wrong type reads as
//!   absent instead of failing the whole response

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnError};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::resources::fallback::{
    first_present, whole, LenientNumber, DEFAULT_TITLE, PLACEHOLDER_IMAGE,
};
use crate::upstream::UpstreamRequest;

/// Audio format requested when the caller does not pick one.
pub const DEFAULT_FORMAT: &str = "mp3";

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Platforms the download endpoint can extract from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Long-form video hosting (YouTube).
    VideoHost,
    /// Short-form video (TikTok).
    ShortVideo,
    /// Photo/video social network (Instagram).
    Social,
}

impl Platform {
    /// Resolve the platform from the host of `raw_url`.
    pub fn detect(raw_url: &str) -> ProxyResult<Self> {
        let unsupported = || ProxyError::UnsupportedPlatform(raw_url.to_string());

        let url = Url::parse(raw_url.trim()).map_err(|e| ProxyError::InvalidParameter {
            name: "url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(unsupported());
        }
        let host = url.host_str().ok_or_else(unsupported)?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let host = host.strip_prefix("m.").unwrap_or(host);

        let is = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if is("youtube.com") || is("youtu.be") || is("youtube-nocookie.com") {
            Ok(Platform::VideoHost)
        } else if is("tiktok.com") {
            Ok(Platform::ShortVideo)
        } else if is("instagram.com") || is("instagr.am") {
            Ok(Platform::Social)
        } else {
            Err(unsupported())
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::VideoHost => "youtube",
            Platform::ShortVideo => "tiktok",
            Platform::Social => "instagram",
        }
    }
}

/// A validated download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub platform: Platform,
    pub url: String,
    pub format: String,
}

impl DownloadTarget {
    pub fn new(url: &str, format: Option<&str>) -> ProxyResult<Self> {
        let platform = Platform::detect(url)?;
        let format = format
            .map(|f| f.trim().to_ascii_lowercase())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
        if !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ProxyError::InvalidParameter {
                name: "format",
                reason: format!("'{}' is not a media format", format),
            });
        }
        Ok(Self {
            platform,
            url: url.trim().to_string(),
            format,
        })
    }

    pub fn upstream_request(&self, upstreams: &UpstreamConfig) -> UpstreamRequest {
        match self.platform {
            Platform::VideoHost => UpstreamRequest::get("youtube", &upstreams.youtube_url)
                .with_query("url", &self.url)
                .with_query("format", &self.format),
            Platform::ShortVideo => UpstreamRequest::get("tiktok", &upstreams.tiktok_url)
                .with_query("url", &self.url)
                .with_query("hd", "1"),
            Platform::Social => UpstreamRequest::get("instagram", &upstreams.instagram_url)
                .with_query("url", &self.url),
        }
    }

    pub fn normalize(&self, body: Value) -> ProxyResult<DownloadResult> {
        match self.platform {
            Platform::VideoHost => normalize_video_host(body, &self.format),
            Platform::ShortVideo => normalize_short_video(body),
            Platform::Social => normalize_social(body),
        }
    }
}

/// Common shape of every download response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadResult {
    pub success: bool,
    pub title: String,
    pub thumbnail: String,
    pub audio_url: String,
    pub video_url: String,
    /// Length in seconds.
    pub duration: u64,
    pub views: u64,
}

/// One video search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoResult {
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub duration: u64,
    pub views: u64,
    pub channel: String,
}

// ---------------------------------------------------------------------------
// Video host: {title, thumbnail, duration, views, formats: [{type, ext, url}]}
// ---------------------------------------------------------------------------

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoHostResponse {
    #[serde_as(deserialize_as = "DefaultOnError")]
    error: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    title: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    thumbnail: Option<String>,
    #[serde_as(deserialize_as = "LenientNumber")]
    duration: Option<f64>,
    #[serde_as(deserialize_as = "LenientNumber")]
    views: Option<f64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    formats: Option<Vec<VideoHostFormat>>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoHostFormat {
    #[serde(rename = "type")]
    #[serde_as(deserialize_as = "DefaultOnError")]
    kind: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    ext: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    url: Option<String>,
}

fn normalize_video_host(body: Value, format: &str) -> ProxyResult<DownloadResult> {
    let parsed: VideoHostResponse =
        serde_json::from_value(body).map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;
    if let Some(err) = parsed.error.filter(|e| !e.is_empty()) {
        return Err(ProxyError::UpstreamLogical(err));
    }

    let formats = parsed.formats.unwrap_or_default();
    let pick = |kind: &str| -> String {
        let of_kind = || formats.iter().filter(|f| f.kind.as_deref() == Some(kind));
        of_kind()
            .find(|f| f.ext.as_deref() == Some(format))
            .or_else(|| of_kind().next())
            .and_then(|f| f.url.clone())
            .unwrap_or_default()
    };

    Ok(DownloadResult {
        success: true,
        title: first_present([parsed.title.as_deref()])
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        thumbnail: first_present([parsed.thumbnail.as_deref()])
            .unwrap_or(PLACEHOLDER_IMAGE)
            .to_string(),
        audio_url: pick("audio"),
        video_url: pick("video"),
        duration: whole(parsed.duration),
        views: whole(parsed.views),
    })
}

// ---------------------------------------------------------------------------
// Short video: {code, msg, data: {title, cover, origin_cover, music, play, hdplay, duration, play_count}}
// ---------------------------------------------------------------------------

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShortVideoResponse {
    #[serde_as(deserialize_as = "LenientNumber")]
    code: Option<f64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    msg: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    data: Option<ShortVideoData>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShortVideoData {
    #[serde_as(deserialize_as = "DefaultOnError")]
    title: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    cover: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    origin_cover: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    music: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    play: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    hdplay: Option<String>,
    #[serde_as(deserialize_as = "LenientNumber")]
    duration: Option<f64>,
    #[serde_as(deserialize_as = "LenientNumber")]
    play_count: Option<f64>,
}

fn normalize_short_video(body: Value) -> ProxyResult<DownloadResult> {
    let parsed: ShortVideoResponse =
        serde_json::from_value(body).map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;
    if parsed.code.unwrap_or(0.0) != 0.0 {
        return Err(ProxyError::UpstreamLogical(
            parsed.msg.unwrap_or_else(|| "extraction failed".to_string()),
        ));
    }
    let data = parsed
        .data
        .ok_or_else(|| ProxyError::UpstreamParse("response has no data".into()))?;

    Ok(DownloadResult {
        success: true,
        title: first_present([data.title.as_deref()])
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        thumbnail: first_present([data.cover.as_deref(), data.origin_cover.as_deref()])
            .unwrap_or(PLACEHOLDER_IMAGE)
            .to_string(),
        audio_url: data.music.unwrap_or_default(),
        video_url: first_present([data.hdplay.as_deref(), data.play.as_deref()])
            .unwrap_or_default()
            .to_string(),
        duration: whole(data.duration),
        views: whole(data.play_count),
    })
}

// ---------------------------------------------------------------------------
// Social: {success, error, result: {caption, thumbnail_url, video_url, audio_url, video_duration, video_view_count}}
// ---------------------------------------------------------------------------

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SocialResponse {
    #[serde_as(deserialize_as = "DefaultOnError")]
    success: Option<bool>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    error: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    result: Option<SocialResult>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SocialResult {
    #[serde_as(deserialize_as = "DefaultOnError")]
    caption: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    thumbnail_url: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    video_url: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    audio_url: Option<String>,
    #[serde_as(deserialize_as = "LenientNumber")]
    video_duration: Option<f64>,
    #[serde_as(deserialize_as = "LenientNumber")]
    video_view_count: Option<f64>,
}

fn normalize_social(body: Value) -> ProxyResult<DownloadResult> {
    let parsed: SocialResponse =
        serde_json::from_value(body).map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;
    if let Some(err) = parsed.error.filter(|e| !e.is_empty()) {
        return Err(ProxyError::UpstreamLogical(err));
    }
    if parsed.success == Some(false) {
        return Err(ProxyError::UpstreamLogical("extraction failed".into()));
    }
    let result = parsed
        .result
        .ok_or_else(|| ProxyError::UpstreamParse("response has no result".into()))?;

    // Captions can be long; the first line works as a title.
    let title = result
        .caption
        .as_deref()
        .and_then(|c| c.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or(DEFAULT_TITLE)
        .to_string();

    Ok(DownloadResult {
        success: true,
        title,
        thumbnail: first_present([result.thumbnail_url.as_deref()])
            .unwrap_or(PLACEHOLDER_IMAGE)
            .to_string(),
        audio_url: result.audio_url.unwrap_or_default(),
        video_url: result.video_url.unwrap_or_default(),
        duration: whole(result.video_duration),
        views: whole(result.video_view_count),
    })
}

// ---------------------------------------------------------------------------
// Video search: [{title, videoId, author, lengthSeconds, viewCount, videoThumbnails: [{quality, url}]}]
// ---------------------------------------------------------------------------

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchItem {
    #[serde(rename = "type")]
    #[serde_as(deserialize_as = "DefaultOnError")]
    kind: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    title: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    video_id: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    author: Option<String>,
    #[serde_as(deserialize_as = "LenientNumber")]
    length_seconds: Option<f64>,
    #[serde_as(deserialize_as = "LenientNumber")]
    view_count: Option<f64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    video_thumbnails: Option<Vec<Thumbnail>>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnail {
    #[serde_as(deserialize_as = "DefaultOnError")]
    quality: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    url: Option<String>,
}

pub fn video_search_request(upstreams: &UpstreamConfig, query: &str) -> UpstreamRequest {
    UpstreamRequest::get("video_search", &upstreams.video_search_url)
        .with_query("q", query)
        .with_query("type", "video")
}

pub fn normalize_video_search(body: Value) -> ProxyResult<Vec<VideoResult>> {
    if let Some(err) = body.get("error").and_then(Value::as_str) {
        return Err(ProxyError::UpstreamLogical(err.to_string()));
    }
    let items: Vec<SearchItem> =
        serde_json::from_value(body).map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;

    Ok(items
        .into_iter()
        .filter(|item| item.kind.as_deref().map_or(true, |k| k == "video"))
        .filter_map(|item| {
            let video_id = item.video_id.filter(|id| !id.is_empty())?;
            let thumbnails = item.video_thumbnails.unwrap_or_default();
            let thumbnail = thumbnails
                .iter()
                .find(|t| t.quality.as_deref() == Some("high"))
                .or_else(|| thumbnails.first())
                .and_then(|t| t.url.clone())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

            Some(VideoResult {
                title: first_present([item.title.as_deref()])
                    .unwrap_or(DEFAULT_TITLE)
                    .to_string(),
                url: format!("{}{}", WATCH_URL, video_id),
                thumbnail,
                duration: whole(item.length_seconds),
                views: whole(item.view_count),
                channel: item.author.unwrap_or_default(),
            })
        })
        .collect())
}
