//! Link metadata via the oEmbed endpoint

use serde::Deserialize;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::extraction::VideoLink;
use crate::metrics::Metrics;
use crate::models::{METADATA_UNAVAILABLE, VideoId, VideoLinkResult};
use crate::shared::http::{ensure_success, send_with_timeout, within_budget};

const SERVICE: &str = "oEmbed endpoint";

/// Title used when metadata could not be fetched
const FALLBACK_TITLE: &str = "YouTube video";

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: String,
}

async fn fetch_oembed(
    video_id: &VideoId,
    config: &Config,
    client: &reqwest::Client,
) -> AppResult<OEmbedResponse> {
    let builder = client
        .get(&config.youtube.oembed_url)
        .query(&[("url", video_id.watch_url().as_str()), ("format", "json")]);

    let timeout_seconds = config.timeouts.metadata();
    within_budget(SERVICE, timeout_seconds, async {
        let response = send_with_timeout(builder, SERVICE, timeout_seconds).await?;
        let response = ensure_success(response, SERVICE).await?;
        response
            .json::<OEmbedResponse>()
            .await
            .map_err(|e| AppError::Transport {
                service: SERVICE,
                reason: format!("invalid oEmbed body: {}", e),
            })
    })
    .await
}

/// Resolve metadata for each link, one at a time, in input order
///
/// A failed lookup yields a non-playable entry carrying an error marker; it
/// never stops the remaining links from being processed.
pub async fn parse_video_links(
    links: &[VideoLink],
    config: &Config,
    client: &reqwest::Client,
    metrics: &Metrics,
) -> Vec<VideoLinkResult> {
    let mut results = Vec::with_capacity(links.len());

    for link in links {
        let video_id = &link.video_id;
        let result = match fetch_oembed(video_id, config, client).await {
            Ok(meta) => VideoLinkResult {
                video_id: video_id.clone(),
                original_url: link.original_url.clone(),
                title: meta.title,
                channel_name: meta.author_name,
                thumbnail: video_id.thumbnail_url(),
                playable: true,
                embed_url: Some(video_id.embed_url()),
                error: None,
            },
            Err(e) => {
                tracing::warn!(
                    video_id = %video_id,
                    error = %e,
                    "Video link metadata lookup failed, returning degraded entry"
                );
                metrics.enrichment_failure("video_link");
                VideoLinkResult {
                    video_id: video_id.clone(),
                    original_url: link.original_url.clone(),
                    title: FALLBACK_TITLE.to_string(),
                    channel_name: String::new(),
                    thumbnail: video_id.thumbnail_url(),
                    playable: false,
                    embed_url: None,
                    error: Some(METADATA_UNAVAILABLE.to_string()),
                }
            }
        };
        results.push(result);
    }

    results
}
