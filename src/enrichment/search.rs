//! Keyword search via the YouTube Data API

use serde::Deserialize;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::extraction::MAX_EXTRACTED;
use crate::metrics::Metrics;
use crate::models::YoutubeVideoResult;
use crate::shared::http::{ensure_success, send_with_timeout, within_budget};

const SERVICE: &str = "YouTube search API";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best_url(self) -> String {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|t| t.url)
            .unwrap_or_default()
    }
}

/// One relevance-ordered, single-result query
async fn search_one(
    keyword: &str,
    api_key: &str,
    config: &Config,
    client: &reqwest::Client,
) -> AppResult<Option<YoutubeVideoResult>> {
    let builder = client.get(&config.youtube.search_url).query(&[
        ("part", "snippet"),
        ("type", "video"),
        ("order", "relevance"),
        ("maxResults", "1"),
        ("q", keyword),
        ("key", api_key),
    ]);

    let timeout_seconds = config.timeouts.metadata();
    let body = within_budget(SERVICE, timeout_seconds, async {
        let response = send_with_timeout(builder, SERVICE, timeout_seconds).await?;
        let response = ensure_success(response, SERVICE).await?;
        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| AppError::Transport {
                service: SERVICE,
                reason: format!("invalid search body: {}", e),
            })
    })
    .await?;

    Ok(body.items.into_iter().find_map(|item| {
        let id = item.id.video_id?;
        let snippet = item.snippet;
        Some(YoutubeVideoResult {
            id,
            title: snippet.title,
            description: snippet.description,
            thumbnail: snippet.thumbnails.best_url(),
            channel_title: snippet.channel_title,
            published_at: snippet.published_at,
        })
    }))
}

/// Search one video per keyword, sequentially, stopping at four results
///
/// # Errors
/// Returns `AppError::Config` when no search key is configured. Individual
/// keyword failures are logged and skipped, so the result may be empty.
pub async fn search_videos(
    keywords: &[String],
    config: &Config,
    client: &reqwest::Client,
    metrics: &Metrics,
) -> AppResult<Vec<YoutubeVideoResult>> {
    let api_key = config.youtube.api_key().ok_or_else(|| {
        AppError::Config("no API key configured for YouTube search".to_string())
    })?;

    let mut videos = Vec::new();
    for keyword in keywords {
        if videos.len() >= MAX_EXTRACTED {
            break;
        }

        match search_one(keyword, api_key, config, client).await {
            Ok(Some(video)) => videos.push(video),
            Ok(None) => {
                tracing::debug!(keyword = %keyword, "Search returned no video results");
            }
            Err(e) => {
                tracing::warn!(keyword = %keyword, error = %e, "Keyword search failed, skipping");
                metrics.enrichment_failure("youtube_search");
            }
        }
    }

    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn config_for(search_url: &str, api_key: Option<&str>) -> Config {
        let key_line = api_key
            .map(|k| format!("api_key = \"{}\"", k))
            .unwrap_or_default();
        Config::from_str(&format!(
            r#"
[server]
host = "127.0.0.1"
port = 3000

[upstream]
base_url = "http://localhost:1234/v1"

[features]
youtube_search_enabled = true

[youtube]
search_url = "{search_url}"
{key_line}
"#
        ))
        .unwrap()
    }

    fn hit(video_id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "items": [{
                "id": {"kind": "youtube#video", "videoId": video_id},
                "snippet": {
                    "title": title,
                    "description": "desc",
                    "channelTitle": "Channel",
                    "publishedAt": "2020-01-01T00:00:00Z",
                    "thumbnails": {"medium": {"url": "https://img.example/m.jpg"}}
                }
            }]
        })
    }

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let config = config_for("http://127.0.0.1:9/search", None);
        let metrics = Metrics::new().unwrap();
        let result =
            search_videos(&keywords(&["dune"]), &config, &reqwest::Client::new(), &metrics).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_failed_keyword_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "broken"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "dune trailer"))
            .and(query_param("maxResults", "1"))
            .and(query_param("key", "yt-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hit("abcdefghijk", "Dune")))
            .mount(&server)
            .await;

        let config = config_for(&format!("{}/search", server.uri()), Some("yt-key"));
        let metrics = Metrics::new().unwrap();
        let videos = search_videos(
            &keywords(&["broken", "dune trailer"]),
            &config,
            &reqwest::Client::new(),
            &metrics,
        )
        .await
        .unwrap();

        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "abcdefghijk");
        assert_eq!(videos[0].thumbnail, "https://img.example/m.jpg");
        assert_eq!(videos[0].channel_title, "Channel");
        assert_eq!(metrics.enrichment_failures_count("youtube_search"), 1);
    }

    #[tokio::test]
    async fn test_stops_after_four_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hit("abcdefghijk", "x")))
            .expect(4)
            .mount(&server)
            .await;

        let config = config_for(&format!("{}/search", server.uri()), Some("yt-key"));
        let metrics = Metrics::new().unwrap();
        let videos = search_videos(
            &keywords(&["a", "b", "c", "d", "e", "f"]),
            &config,
            &reqwest::Client::new(),
            &metrics,
        )
        .await
        .unwrap();

        assert_eq!(videos.len(), 4);
    }
}
