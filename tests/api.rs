//! End-to-end tests of the HTTP surface against mock upstreams.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use media_proxy::config::ProxyConfig;
use media_proxy::upstream::ManualClock;
use media_proxy::{HttpServer, Shutdown};

mod common;

const TRENDING_BODY: &str = r#"{"data":{"Page":{"media":[
    {"id":1,"title":{"romaji":"Sousou no Frieren","english":"Frieren"},"coverImage":{"large":"l1.jpg"},"startDate":{"year":2023},"averageScore":91,"description":"A mage outlives her party."},
    {"id":2,"title":{"romaji":null,"english":"Solo Leveling"},"coverImage":{},"startDate":{"year":null},"averageScore":null}
]}}}"#;

const TIKTOK_BODY: &str = r#"{"code":0,"msg":"success","data":{
    "title":"dance","cover":"https://p16/cover.jpg","play":"https://v16/play.mp4",
    "music":"https://sf16/music.mp3","duration":12,"play_count":4242}}"#;

fn build_app_with_clock(config: ProxyConfig, clock: Arc<ManualClock>) -> Router {
    HttpServer::with_clock(config, clock).unwrap().router()
}

fn build_app(config: ProxyConfig) -> Router {
    build_app_with_clock(
        config,
        Arc::new(ManualClock::new(Duration::from_secs(1_700_000_000))),
    )
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let (status, headers, bytes) = send(app, Method::GET, uri).await;
    let body: Value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("non-JSON body for {}: {} ({:?})", uri, e, bytes));
    (status, headers, body)
}

fn assert_json_cors(headers: &HeaderMap) {
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_search_without_query_skips_upstream() {
    let mock = common::start_mock_upstream(200, TRENDING_BODY).await;
    let app = build_app(common::config_for(&mock));

    let (status, headers, body) = get_json(&app, "/api/search").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_cors(&headers);
    assert_eq!(body["error"], "missing required parameter 'q'");
    assert_eq!(mock.hits(), 0, "upstream must not be contacted");
}

#[tokio::test]
async fn test_unknown_path_is_json_404() {
    let mock = common::start_mock_upstream(200, "{}").await;
    let app = build_app(common::config_for(&mock));

    for path in ["/", "/index.html", "/api/unknown", "/api/search/deeper"] {
        let (status, headers, body) = get_json(&app, path).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
        assert_json_cors(&headers);
        assert!(body["error"].as_str().unwrap().contains("no route"));
    }
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn test_options_preflight_on_any_path() {
    let mock = common::start_mock_upstream(200, "{}").await;
    let app = build_app(common::config_for(&mock));

    for path in ["/api/download", "/does/not/exist"] {
        let (status, headers, body) = send(&app, Method::OPTIONS, path).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn test_non_get_method_rejected() {
    let mock = common::start_mock_upstream(200, TRENDING_BODY).await;
    let app = build_app(common::config_for(&mock));

    let (status, headers, bytes) = send(&app, Method::POST, "/api/trending").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_json_cors(&headers);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn test_trending_is_normalized() {
    let mock = common::start_mock_upstream(200, TRENDING_BODY).await;
    let app = build_app(common::config_for(&mock));

    let (status, headers, body) = get_json(&app, "/api/trending").await;

    assert_eq!(status, StatusCode::OK);
    assert_json_cors(&headers);
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(
        body,
        json!([
            {
                "id": 1,
                "title": "Sousou no Frieren",
                "image": "l1.jpg",
                "year": 2023,
                "score": 91,
                "description": "A mage outlives her party."
            },
            {
                "id": 2,
                "title": "Solo Leveling",
                "image": "https://via.placeholder.com/460x650?text=No+Image",
                "year": 0,
                "score": 0,
                "description": ""
            }
        ])
    );

    let sent = mock.requests();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("POST /graphql"));
    assert!(sent[0].contains("TRENDING_DESC"));
}

#[tokio::test]
async fn test_identical_requests_served_from_cache_until_ttl() {
    let mock = common::start_mock_upstream(200, TRENDING_BODY).await;
    let clock = Arc::new(ManualClock::new(Duration::from_secs(1_700_000_000)));
    let app = build_app_with_clock(common::config_for(&mock), clock.clone());

    let (_, _, first) = send(&app, Method::GET, "/api/popular").await;
    let (_, _, second) = send(&app, Method::GET, "/api/popular").await;
    assert_eq!(mock.hits(), 1, "second call must be a cache hit");
    assert_eq!(first, second);

    clock.advance(Duration::from_secs(299));
    send(&app, Method::GET, "/api/popular").await;
    assert_eq!(mock.hits(), 1);

    clock.advance(Duration::from_secs(2));
    send(&app, Method::GET, "/api/popular").await;
    assert_eq!(mock.hits(), 2, "expired entry must trigger a fresh fetch");
}

#[tokio::test]
async fn test_distinct_queries_do_not_share_cache() {
    let mock = common::start_mock_upstream(200, r#"{"data":{"Page":{"media":[]}}}"#).await;
    let app = build_app(common::config_for(&mock));

    get_json(&app, "/api/search?q=frieren").await;
    get_json(&app, "/api/search?q=mushishi").await;
    get_json(&app, "/api/trending").await;
    get_json(&app, "/api/popular").await;
    assert_eq!(mock.hits(), 4);

    get_json(&app, "/api/search?q=frieren").await;
    assert_eq!(mock.hits(), 4);
}

#[tokio::test]
async fn test_cache_disabled_always_fetches() {
    let mock = common::start_mock_upstream(200, TRENDING_BODY).await;
    let mut config = common::config_for(&mock);
    config.cache.enabled = false;
    let app = build_app(config);

    get_json(&app, "/api/trending").await;
    get_json(&app, "/api/trending").await;
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn test_tiktok_download_uses_short_video_branch() {
    let mock = common::start_programmable_upstream(|raw| {
        if raw.starts_with("GET /tiktok/") {
            (200, TIKTOK_BODY.to_string())
        } else {
            (500, r#"{"error":"wrong upstream"}"#.to_string())
        }
    })
    .await;
    let app = build_app(common::config_for(&mock));

    let (status, headers, body) = get_json(
        &app,
        "/api/download?url=https%3A%2F%2Fwww.tiktok.com%2F%40user%2Fvideo%2F7300000000000000000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_json_cors(&headers);
    assert_eq!(
        body,
        json!({
            "success": true,
            "title": "dance",
            "thumbnail": "https://p16/cover.jpg",
            "audio_url": "https://sf16/music.mp3",
            "video_url": "https://v16/play.mp4",
            "duration": 12,
            "views": 4242
        })
    );

    let sent = mock.requests();
    assert!(sent[0].contains("url=https%3A%2F%2Fwww.tiktok.com"));
}

#[tokio::test]
async fn test_download_rejects_unsupported_platform() {
    let mock = common::start_mock_upstream(200, TIKTOK_BODY).await;
    let app = build_app(common::config_for(&mock));

    let (status, _, body) = get_json(&app, "/api/download?url=https://vimeo.com/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unsupported platform"));

    let (status, _, body) = get_json(&app, "/api/download?format=mp4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing required parameter 'url'");
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn test_download_upstream_error_field() {
    let mock = common::start_mock_upstream(200, r#"{"error":"Private video"}"#).await;
    let app = build_app(common::config_for(&mock));

    let (status, _, body) = get_json(&app, "/api/download?url=https://youtu.be/abc&format=mp4").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["error"],
        "failed to fetch download: upstream reported an error: Private video"
    );
    assert!(mock.requests()[0].starts_with("GET /youtube?url=https%3A%2F%2Fyoutu.be%2Fabc&format=mp4"));
}

#[tokio::test]
async fn test_anime_detail_title_fallback() {
    let mock = common::start_mock_upstream(
        200,
        r#"{"data":{"Media":{"id":99,"title":{"romaji":null,"english":null,"native":"蟲師"}}}}"#,
    )
    .await;
    let app = build_app(common::config_for(&mock));

    let (status, _, body) = get_json(&app, "/api/anime?id=99").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "蟲師");
    assert_eq!(body["episodes"], 0);
    for (key, value) in body.as_object().unwrap() {
        assert!(!value.is_null(), "{} is null", key);
    }
}

#[tokio::test]
async fn test_anime_detail_not_found() {
    let mock = common::start_mock_upstream(
        404,
        r#"{"errors":[{"message":"Not Found.","status":404}],"data":{"Media":null}}"#,
    )
    .await;
    let app = build_app(common::config_for(&mock));

    let (status, headers, body) = get_json(&app, "/api/anime?id=123456789").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_cors(&headers);
    assert_eq!(body["error"], "anime 123456789 not found");
}

#[tokio::test]
async fn test_upstream_failures_map_to_bad_gateway() {
    let mock = common::start_mock_upstream(500, "oops").await;
    let app = build_app(common::config_for(&mock));
    let (status, headers, body) = get_json(&app, "/api/trending").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_json_cors(&headers);
    assert_eq!(
        body["error"],
        "failed to fetch trending: upstream returned HTTP 500"
    );

    let mock = common::start_mock_upstream(200, "<html>not json</html>").await;
    let app = build_app(common::config_for(&mock));
    let (status, _, body) = get_json(&app, "/api/schedule").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("failed to fetch schedule: invalid upstream response"));
}

#[tokio::test]
async fn test_request_deadline_renders_json_error() {
    let mock = common::start_silent_upstream().await;
    let mut config = common::config_for(&mock);
    config.timeouts.request_secs = 1;
    let app = build_app(config);

    let (status, headers, body) = get_json(&app, "/api/trending").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_json_cors(&headers);
    assert_eq!(body["error"], "failed to fetch trending: timed out after 1s");
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn test_wrong_typed_extractor_fields_still_succeed() {
    let mock = common::start_mock_upstream(
        200,
        r#"{"code":0,"data":{"title":"dance","play":"https://v16/play.mp4","duration":12.5,"play_count":"1.2M"}}"#,
    )
    .await;
    let app = build_app(common::config_for(&mock));

    let (status, _, body) =
        get_json(&app, "/api/download?url=https://www.tiktok.com/@u/video/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duration"], 13);
    assert_eq!(body["views"], 0);
    assert_eq!(body["video_url"], "https://v16/play.mp4");
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let mock = common::start_mock_upstream(503, "{}").await;
    let app = build_app(common::config_for(&mock));

    get_json(&app, "/api/editorial").await;
    get_json(&app, "/api/editorial").await;
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn test_video_search() {
    let mock = common::start_mock_upstream(
        200,
        r#"[{"type":"video","title":"Frieren OP","videoId":"abc","author":"Aniplex","lengthSeconds":90,"viewCount":10,"videoThumbnails":[{"quality":"high","url":"https://i/hq.jpg"}]}]"#,
    )
    .await;
    let app = build_app(common::config_for(&mock));

    let (status, _, body) = get_json(&app, "/api/search?q=frieren+op&source=video").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["url"], "https://www.youtube.com/watch?v=abc");
    assert_eq!(body[0]["channel"], "Aniplex");
    assert!(mock.requests()[0].starts_with("GET /api/v1/search?q=frieren+op&type=video"));
}

#[tokio::test]
async fn test_schedule_window_from_clock() {
    let mock = common::start_mock_upstream(200, r#"{"data":{"Page":{"airingSchedules":[]}}}"#).await;
    let clock = Arc::new(ManualClock::new(Duration::from_secs(1_700_000_030)));
    let app = build_app_with_clock(common::config_for(&mock), clock);

    let (status, _, body) = get_json(&app, "/api/schedule").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let sent = &mock.requests()[0];
    assert!(sent.contains(r#""start":1699999980"#));
    assert!(sent.contains(r#""end":1700086380"#));
}

#[tokio::test]
async fn test_schedule_follows_next_pages() {
    let mock = common::start_programmable_upstream(|raw| {
        let body = if raw.contains(r#""page":1"#) {
            r#"{"data":{"Page":{"pageInfo":{"hasNextPage":true},"airingSchedules":[{"airingAt":1700000100,"episode":1,"media":{"id":1}}]}}}"#
        } else {
            r#"{"data":{"Page":{"pageInfo":{"hasNextPage":false},"airingSchedules":[{"airingAt":1700000200,"episode":2,"media":{"id":2}}]}}}"#
        };
        (200, body.to_string())
    })
    .await;
    let app = build_app(common::config_for(&mock));

    let (status, _, body) = get_json(&app, "/api/schedule").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(mock.hits(), 2);
    assert!(mock.requests()[1].contains(r#""page":2"#));
}

#[tokio::test]
async fn test_served_over_tcp() {
    let mock = common::start_mock_upstream(200, TRENDING_BODY).await;
    let server = HttpServer::new(common::config_for(&mock)).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://{}/api/trending", addr))
        .send()
        .await
        .expect("proxy unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);

    drop(client);
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "server should stop after shutdown");
}
