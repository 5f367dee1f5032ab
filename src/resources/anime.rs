//! AniList-backed resources: search, detail, schedule and ranked lists.
//!
//! # Responsibilities
//! - Build the GraphQL payload for each resource
//! - Deserialize the `{data, errors}` envelope with every field optional
//! - Map media records into the default-safe output shapes
//!
//! # Design Decisions
//! - One ranked-list query parameterized by sort and season
//! - The schedule window starts at the current minute so requests made within
//!   the same minute share a cache entry
//! - Schedule pages are followed through `pageInfo.hasNextPage`, up to
//!   `MAX_SCHEDULE_PAGES`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Season;
use crate::error::{ProxyError, ProxyResult};
use crate::resources::fallback::{
    clean_description, pick_image, pick_title, truncate, CoverImage, MediaTitle,
    LIST_DESCRIPTION_CHARS,
};
use crate::upstream::UpstreamRequest;

/// Size of every ranked list.
pub const RANKED_LIST_SIZE: u32 = 10;

const SEARCH_PAGE_SIZE: u32 = 20;
const SCHEDULE_PAGE_SIZE: u32 = 50;
/// Upper bound on schedule pages fetched for one window.
pub const MAX_SCHEDULE_PAGES: u32 = 5;
const SCHEDULE_WINDOW_SECS: i64 = 24 * 60 * 60;

const SEARCH_QUERY: &str = r#"
query ($search: String, $perPage: Int) {
  Page(page: 1, perPage: $perPage) {
    media(search: $search, type: ANIME, sort: SEARCH_MATCH) {
      id
      title { romaji english native }
      coverImage { extraLarge large medium }
      startDate { year }
      averageScore
      genres
    }
  }
}
"#;

const DETAIL_QUERY: &str = r#"
query ($id: Int) {
  Media(id: $id, type: ANIME) {
    id
    title { romaji english native }
    coverImage { extraLarge large medium }
    bannerImage
    description(asHtml: false)
    episodes
    duration
    status
    format
    season
    seasonYear
    startDate { year }
    averageScore
    genres
    studios(isMain: true) { nodes { name } }
    nextAiringEpisode { episode airingAt }
  }
}
"#;

const SCHEDULE_QUERY: &str = r#"
query ($start: Int, $end: Int, $page: Int, $perPage: Int) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { hasNextPage }
    airingSchedules(airingAt_greater: $start, airingAt_lesser: $end, sort: TIME) {
      airingAt
      episode
      media {
        id
        title { romaji english native }
        coverImage { extraLarge large medium }
      }
    }
  }
}
"#;

const RANKED_QUERY: &str = r#"
query ($sort: [MediaSort], $season: MediaSeason, $seasonYear: Int, $perPage: Int) {
  Page(page: 1, perPage: $perPage) {
    media(sort: $sort, type: ANIME, season: $season, seasonYear: $seasonYear) {
      id
      title { romaji english native }
      coverImage { extraLarge large medium }
      description(asHtml: false)
      startDate { year }
      averageScore
    }
  }
}
"#;

/// Which ranked list to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    Trending,
    Popular,
    /// Best-scored titles of one season.
    Editorial { season: Season, year: i32 },
}

impl Ranking {
    fn sort(&self) -> &'static str {
        match self {
            Ranking::Trending => "TRENDING_DESC",
            Ranking::Popular => "POPULARITY_DESC",
            Ranking::Editorial { .. } => "SCORE_DESC",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Ranking::Trending => "trending",
            Ranking::Popular => "popular",
            Ranking::Editorial { .. } => "editorial",
        }
    }
}

// ---------------------------------------------------------------------------
// Upstream schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
    status: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PageData<T> {
    #[serde(rename = "Page")]
    page: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaPage {
    media: Option<Vec<Media>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SchedulePage {
    page_info: Option<PageInfo>,
    airing_schedules: Option<Vec<AiringSchedule>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PageInfo {
    has_next_page: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Media {
    id: Option<i64>,
    title: Option<MediaTitle>,
    cover_image: Option<CoverImage>,
    banner_image: Option<String>,
    description: Option<String>,
    episodes: Option<u32>,
    duration: Option<u32>,
    status: Option<String>,
    format: Option<String>,
    season: Option<String>,
    season_year: Option<i32>,
    start_date: Option<FuzzyDate>,
    average_score: Option<u32>,
    genres: Option<Vec<String>>,
    studios: Option<StudioConnection>,
    next_airing_episode: Option<NextAiring>,
}

impl Media {
    fn year(&self) -> i32 {
        self.start_date
            .as_ref()
            .and_then(|d| d.year)
            .or(self.season_year)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FuzzyDate {
    year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StudioConnection {
    nodes: Option<Vec<Studio>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Studio {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NextAiring {
    episode: Option<u32>,
    airing_at: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AiringSchedule {
    airing_at: Option<i64>,
    episode: Option<u32>,
    media: Option<Media>,
}

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimeSummary {
    pub id: i64,
    pub title: String,
    pub image: String,
    pub year: i32,
    pub score: u32,
    pub genres: Vec<String>,
}

/// One entry of a trending/popular/editorial list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAnime {
    pub id: i64,
    pub title: String,
    pub image: String,
    pub year: i32,
    pub score: u32,
    pub description: String,
}

/// Full record for a single title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimeDetail {
    pub id: i64,
    pub title: String,
    pub title_english: String,
    pub title_native: String,
    pub image: String,
    pub banner: String,
    pub description: String,
    pub episodes: u32,
    pub duration: u32,
    pub status: String,
    pub format: String,
    pub season: String,
    pub year: i32,
    pub score: u32,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    /// Episode number airing next, 0 when nothing is scheduled.
    pub next_episode: u32,
    /// Unix time of the next episode, 0 when nothing is scheduled.
    pub next_airing_at: i64,
}

/// One airing slot inside the schedule window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub title: String,
    pub image: String,
    pub episode: u32,
    pub airing_at: i64,
}

// ---------------------------------------------------------------------------
// Request builders
// ---------------------------------------------------------------------------

pub fn search_request(endpoint: &str, query: &str) -> UpstreamRequest {
    UpstreamRequest::graphql(
        endpoint,
        SEARCH_QUERY,
        json!({ "search": query, "perPage": SEARCH_PAGE_SIZE }),
    )
}

pub fn detail_request(endpoint: &str, id: i64) -> UpstreamRequest {
    UpstreamRequest::graphql(endpoint, DETAIL_QUERY, json!({ "id": id }))
}

/// One page of the airing schedule for the 24 hours following `now_secs`,
/// floored to the minute.
pub fn schedule_request(endpoint: &str, now_secs: i64, page: u32) -> UpstreamRequest {
    let start = now_secs - now_secs.rem_euclid(60);
    UpstreamRequest::graphql(
        endpoint,
        SCHEDULE_QUERY,
        json!({
            "start": start,
            "end": start + SCHEDULE_WINDOW_SECS,
            "page": page,
            "perPage": SCHEDULE_PAGE_SIZE,
        }),
    )
}

pub fn ranked_request(endpoint: &str, ranking: Ranking) -> UpstreamRequest {
    let mut variables = json!({
        "sort": [ranking.sort()],
        "perPage": RANKED_LIST_SIZE,
    });
    if let Ranking::Editorial { season, year } = ranking {
        variables["season"] = json!(season.as_graphql());
        variables["seasonYear"] = json!(year);
    }
    UpstreamRequest::graphql(endpoint, RANKED_QUERY, variables)
}

// ---------------------------------------------------------------------------
// Normalizers
// ---------------------------------------------------------------------------

/// Unwrap the GraphQL envelope, surfacing `errors` as an upstream failure.
fn graphql_data<T: DeserializeOwned>(body: Value) -> ProxyResult<T> {
    let parsed: GraphQlResponse<T> =
        serde_json::from_value(body).map_err(|e| ProxyError::UpstreamParse(e.to_string()))?;

    if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
        let message = errors
            .into_iter()
            .map(|e| match e.status {
                Some(s) => format!("{} (status {})", e.message, s),
                None => e.message,
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ProxyError::UpstreamLogical(message));
    }

    parsed
        .data
        .ok_or_else(|| ProxyError::UpstreamParse("response has no data".into()))
}

fn page_media(body: Value) -> ProxyResult<Vec<Media>> {
    let data: PageData<MediaPage> = graphql_data(body)?;
    Ok(data
        .page
        .and_then(|p| p.media)
        .unwrap_or_default())
}

pub fn normalize_search(body: Value) -> ProxyResult<Vec<AnimeSummary>> {
    Ok(page_media(body)?
        .into_iter()
        .map(|m| AnimeSummary {
            id: m.id.unwrap_or(0),
            title: pick_title(m.title.as_ref()),
            image: pick_image(m.cover_image.as_ref()),
            year: m.year(),
            score: m.average_score.unwrap_or(0),
            genres: m.genres.unwrap_or_default(),
        })
        .collect())
}

pub fn normalize_ranked(body: Value) -> ProxyResult<Vec<RankedAnime>> {
    Ok(page_media(body)?
        .into_iter()
        .map(|m| {
            let description = clean_description(m.description.as_deref());
            RankedAnime {
                id: m.id.unwrap_or(0),
                title: pick_title(m.title.as_ref()),
                image: pick_image(m.cover_image.as_ref()),
                year: m.year(),
                score: m.average_score.unwrap_or(0),
                description: truncate(&description, LIST_DESCRIPTION_CHARS),
            }
        })
        .collect())
}

pub fn normalize_detail(body: Value, id: i64) -> ProxyResult<AnimeDetail> {
    let data: DetailData = match graphql_data(body) {
        Err(ProxyError::UpstreamLogical(msg)) if msg.contains("status 404") => {
            return Err(ProxyError::ResourceNotFound(format!("anime {}", id)));
        }
        other => other?,
    };
    let m = data
        .media
        .ok_or_else(|| ProxyError::ResourceNotFound(format!("anime {}", id)))?;

    let title = m.title.clone().unwrap_or_default();
    let year = m.year();
    let (next_episode, next_airing_at) = m
        .next_airing_episode
        .as_ref()
        .map(|n| (n.episode.unwrap_or(0), n.airing_at.unwrap_or(0)))
        .unwrap_or((0, 0));

    Ok(AnimeDetail {
        id: m.id.unwrap_or(id),
        title: pick_title(m.title.as_ref()),
        title_english: title.english.unwrap_or_default(),
        title_native: title.native.unwrap_or_default(),
        image: pick_image(m.cover_image.as_ref()),
        banner: m.banner_image.unwrap_or_default(),
        description: clean_description(m.description.as_deref()),
        episodes: m.episodes.unwrap_or(0),
        duration: m.duration.unwrap_or(0),
        status: m.status.unwrap_or_default(),
        format: m.format.unwrap_or_default(),
        season: m.season.unwrap_or_default(),
        year,
        score: m.average_score.unwrap_or(0),
        genres: m.genres.unwrap_or_default(),
        studios: m
            .studios
            .and_then(|s| s.nodes)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.name)
            .collect(),
        next_episode,
        next_airing_at,
    })
}

pub fn normalize_schedule(body: Value) -> ProxyResult<Vec<ScheduleEntry>> {
    normalize_schedule_page(body).map(|(entries, _)| entries)
}

/// Entries of one schedule page and whether another page follows.
pub fn normalize_schedule_page(body: Value) -> ProxyResult<(Vec<ScheduleEntry>, bool)> {
    let data: PageData<SchedulePage> = graphql_data(body)?;
    let page = data.page.unwrap_or_default();
    let has_next = page
        .page_info
        .and_then(|info| info.has_next_page)
        .unwrap_or(false);

    let entries = page
        .airing_schedules
        .unwrap_or_default()
        .into_iter()
        .map(|slot| {
            let media = slot.media.unwrap_or_default();
            ScheduleEntry {
                id: media.id.unwrap_or(0),
                title: pick_title(media.title.as_ref()),
                image: pick_image(media.cover_image.as_ref()),
                episode: slot.episode.unwrap_or(0),
                airing_at: slot.airing_at.unwrap_or(0),
            }
        })
        .collect();
    Ok((entries, has_next))
}
