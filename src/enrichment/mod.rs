//! Enrichment fan-out
//!
//! Turns an [`Extraction`] into the structured payload sent to the client.
//! Lookups run sequentially within a request; the extraction cap keeps the
//! number of calls small. Per-item failures degrade or drop that item only.

pub mod oembed;
pub mod search;

pub use oembed::parse_video_links;
pub use search::search_videos;

use crate::config::Config;
use crate::extraction::Extraction;
use crate::metrics::Metrics;
use crate::models::{MovieRecommendation, VideoLinkResult, YoutubeVideoResult};

/// Structured data accompanying a completed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredPayload {
    VideoLinks(Vec<VideoLinkResult>),
    YoutubeVideos(Vec<YoutubeVideoResult>),
    Recommendations(Vec<MovieRecommendation>),
}

impl StructuredPayload {
    /// Value of the `type` discriminator on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            StructuredPayload::VideoLinks(_) => "video_links",
            StructuredPayload::YoutubeVideos(_) => "youtube_videos",
            StructuredPayload::Recommendations(_) => "recommendations",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StructuredPayload::VideoLinks(v) => v.is_empty(),
            StructuredPayload::YoutubeVideos(v) => v.is_empty(),
            StructuredPayload::Recommendations(v) => v.is_empty(),
        }
    }
}

/// Run the lookups the extraction calls for
pub async fn enrich(
    extraction: Extraction,
    config: &Config,
    client: &reqwest::Client,
    metrics: &Metrics,
) -> StructuredPayload {
    match extraction {
        Extraction::VideoLinks(links) => {
            StructuredPayload::VideoLinks(parse_video_links(&links, config, client, metrics).await)
        }
        Extraction::YoutubeKeywords(keywords) => {
            match search_videos(&keywords, config, client, metrics).await {
                Ok(videos) => StructuredPayload::YoutubeVideos(videos),
                Err(e) => {
                    tracing::warn!(error = %e, "YouTube search unavailable, returning no videos");
                    StructuredPayload::YoutubeVideos(Vec::new())
                }
            }
        }
        Extraction::Movies(movies) => StructuredPayload::Recommendations(movies),
    }
}
