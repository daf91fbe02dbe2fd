//! Structured results attached to a completed reply
//!
//! These are the client-facing shapes; field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use super::video_id::VideoId;

/// Placeholder used when a recommendation line has no description
pub const MISSING_DESCRIPTION: &str = "No description available.";

/// Marker placed in `error` when link metadata could not be fetched
pub const METADATA_UNAVAILABLE: &str = "metadata_unavailable";

/// One movie parsed from a reply line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecommendation {
    pub title: String,
    /// Four-digit year
    pub year: String,
    pub genre: String,
    pub description: String,
}

/// One YouTube search hit for a reply keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeVideoResult {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub channel_title: String,
    pub published_at: String,
}

/// Metadata for one video link found in the user's message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoLinkResult {
    pub video_id: VideoId,
    pub original_url: String,
    pub title: String,
    pub channel_name: String,
    pub thumbnail: String,
    pub playable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
