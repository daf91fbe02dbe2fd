//! Integration tests for the YouTube edge proxy
//!
//! Mirrors and the media host are wiremock servers; requests go through the
//! full router so CORS, metrics and request IDs are all in play.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use cinerelay::{
    config::Config,
    handlers::{self, AppState},
};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header as header_matcher, method, path},
};

const VIDEO_ID: &str = "dQw4w9WgXcQ";

fn create_test_config(instances: &[String]) -> Config {
    let instances = instances
        .iter()
        .map(|i| format!("\"{}\"", i))
        .collect::<Vec<_>>()
        .join(", ");
    Config::from_str(&format!(
        r#"
[server]
host = "127.0.0.1"
port = 3000

[upstream]
base_url = "http://localhost:1234/v1"

[proxy]
instances = [{instances}]

[timeouts]
probe = 2
"#
    ))
    .expect("should parse test config")
}

fn video_info(media_url: &str) -> serde_json::Value {
    serde_json::json!({
        "title": "Never Gonna Give You Up",
        "author": "Rick Astley",
        "lengthSeconds": 213,
        "videoThumbnails": [{"quality": "high", "url": "https://mirror/vi/hq.jpg", "width": 480, "height": 360}],
        "formatStreams": [
            {"url": format!("{}/media/18", media_url), "itag": "18", "type": "video/mp4", "quality": "medium"}
        ],
        "adaptiveFormats": [
            {"url": format!("{}/media/137", media_url), "itag": 137, "type": "video/mp4", "qualityLabel": "1080p", "bitrate": "4500000"},
            {"url": format!("{}/media/140", media_url), "itag": "140", "type": "audio/mp4", "audioQuality": "AUDIO_QUALITY_MEDIUM", "bitrate": 130000}
        ]
    })
}

async fn mount_probe(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/api/v1/stats"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn mount_video_info(server: &MockServer, media_url: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/videos/{}", VIDEO_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(video_info(media_url)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// One live mirror that also acts as the media host
async fn live_mirror() -> MockServer {
    let server = MockServer::start().await;
    mount_probe(&server, 200).await;
    let uri = server.uri();
    mount_video_info(&server, &uri, 1).await;
    server
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_no_live_mirror_is_service_unavailable_without_metadata_calls() {
    let dead_a = MockServer::start().await;
    let dead_b = MockServer::start().await;
    for server in [&dead_a, &dead_b] {
        mount_probe(server, 500).await;
        mount_video_info(server, "http://unused", 0).await;
    }

    let state = AppState::new(Arc::new(create_test_config(&[dead_a.uri(), dead_b.uri()]))).unwrap();
    let metrics = state.metrics().clone();

    let response = handlers::router(state)
        .oneshot(get(&format!("/api/youtube-proxy?v={}", VIDEO_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(metrics.mirror_probes_count(&dead_a.uri(), false), 1);
    assert_eq!(metrics.mirror_probes_count(&dead_b.uri(), false), 1);
}

#[tokio::test]
async fn test_first_live_mirror_after_failures_is_used() {
    let dead = MockServer::start().await;
    mount_probe(&dead, 503).await;
    mount_video_info(&dead, "http://unused", 0).await;

    let live = live_mirror().await;

    let later = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&later)
        .await;

    let state = AppState::new(Arc::new(create_test_config(&[
        dead.uri(),
        live.uri(),
        later.uri(),
    ])))
    .unwrap();

    let response = handlers::router(state)
        .oneshot(get(&format!("/api/youtube-proxy?v={}&type=info", VIDEO_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["instance"], live.uri());
}

#[tokio::test]
async fn test_info_rewrites_every_format_to_same_origin_urls() {
    let live = live_mirror().await;
    let state = AppState::new(Arc::new(create_test_config(&[live.uri()]))).unwrap();

    let response = handlers::router(state)
        .oneshot(get(&format!("/api/youtube-proxy?v={}", VIDEO_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let body = json_body(response).await;

    assert_eq!(body["videoId"], VIDEO_ID);
    assert_eq!(body["title"], "Never Gonna Give You Up");
    assert_eq!(body["lengthSeconds"], 213);

    let formats = &body["formats"];
    assert_eq!(
        formats["combined"][0]["url"],
        format!("/api/youtube-proxy?v={}&type=video&itag=18", VIDEO_ID)
    );
    assert_eq!(
        formats["video"][0]["url"],
        format!("/api/youtube-proxy?v={}&type=video&itag=137", VIDEO_ID)
    );
    assert_eq!(formats["video"][0]["quality"], "1080p");
    assert_eq!(
        formats["audio"][0]["url"],
        format!("/api/youtube-proxy?v={}&type=audio&itag=140", VIDEO_ID)
    );
    assert_eq!(formats["audio"][0]["bitrate"], 130000);
    assert_eq!(formats["audio"][0]["directUrl"], format!("{}/media/140", live.uri()));
    assert_eq!(body["best"]["itag"], "18");
}

#[tokio::test]
async fn test_stream_relays_partial_content_for_range_requests() {
    let live = live_mirror().await;
    Mock::given(method("GET"))
        .and(path("/media/140"))
        .and(header_matcher("range", "bytes=0-4"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-type", "audio/mp4")
                .insert_header("content-range", "bytes 0-4/1000")
                .insert_header("accept-ranges", "bytes")
                .set_body_bytes(b"audio".to_vec()),
        )
        .expect(1)
        .mount(&live)
        .await;

    let state = AppState::new(Arc::new(create_test_config(&[live.uri()]))).unwrap();

    let request = Request::builder()
        .uri(format!("/api/youtube-proxy?v={}&type=audio&itag=140", VIDEO_ID))
        .header(header::RANGE, "bytes=0-4")
        .body(Body::empty())
        .unwrap();
    let response = handlers::router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-4/1000");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"audio");
}

#[tokio::test]
async fn test_media_requests_without_itag_are_rejected_before_discovery() {
    let mirror = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mirror)
        .await;

    let state = AppState::new(Arc::new(create_test_config(&[mirror.uri()]))).unwrap();
    let response = handlers::router(state)
        .oneshot(get(&format!("/api/youtube-proxy?v={}&type=video", VIDEO_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_unknown_itag_is_not_found() {
    let live = live_mirror().await;
    let state = AppState::new(Arc::new(create_test_config(&[live.uri()]))).unwrap();

    let response = handlers::router(state)
        .oneshot(get(&format!(
            "/api/youtube-proxy?v={}&type=video&itag=999",
            VIDEO_ID
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_host_refusal_is_bad_gateway() {
    let live = live_mirror().await;
    Mock::given(method("GET"))
        .and(path("/media/18"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&live)
        .await;

    let state = AppState::new(Arc::new(create_test_config(&[live.uri()]))).unwrap();
    let metrics = state.metrics().clone();

    let response = handlers::router(state)
        .oneshot(get(&format!(
            "/api/youtube-proxy?v={}&type=video&itag=18",
            VIDEO_ID
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(metrics.upstream_errors_count("media host"), 1);
}

#[tokio::test]
async fn test_invalid_video_id_is_bad_request() {
    let state = AppState::new(Arc::new(create_test_config(&[
        "http://192.0.2.1".to_string(),
    ])))
    .unwrap();

    let response = handlers::router(state)
        .oneshot(get("/api/youtube-proxy?v=not-an-id"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_query_is_bad_request_with_cors() {
    let state = AppState::new(Arc::new(create_test_config(&[
        "http://192.0.2.1".to_string(),
    ])))
    .unwrap();

    let response = handlers::router(state)
        .oneshot(get(&format!("/api/youtube-proxy?v={}&v={}", VIDEO_ID, VIDEO_ID)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let body = json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_preflight_answers_without_contacting_mirrors() {
    let mirror = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mirror)
        .await;

    let state = AppState::new(Arc::new(create_test_config(&[mirror.uri()]))).unwrap();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/youtube-proxy")
        .body(Body::empty())
        .unwrap();
    let response = handlers::router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, OPTIONS"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");
}
