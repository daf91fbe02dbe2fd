//! Video metadata from a mirror's API
//!
//! Mirrors are not consistent about scalar types: `itag` and `bitrate` arrive
//! as strings on some versions and numbers on others. Both are accepted.

use serde::{Deserialize, Deserializer, Serialize};

use super::instances::ProxyInstance;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::VideoId;
use crate::shared::http::{ensure_success, send_with_timeout, within_budget};

pub const SERVICE: &str = "video mirror";

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

fn optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.into_string().trim().parse().ok()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub quality: String,
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Muxed (video and audio) stream
#[derive(Debug, Clone, Deserialize)]
pub struct FormatStream {
    pub url: String,
    #[serde(deserialize_with = "string_or_number")]
    pub itag: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default, deserialize_with = "optional_u64")]
    pub bitrate: Option<u64>,
}

/// Video-only or audio-only stream
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveFormat {
    pub url: String,
    #[serde(deserialize_with = "string_or_number")]
    pub itag: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub quality_label: Option<String>,
    #[serde(default)]
    pub audio_quality: Option<String>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub bitrate: Option<u64>,
}

impl AdaptiveFormat {
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    /// Human-readable quality, whichever field the mirror filled in
    pub fn quality(&self) -> String {
        self.quality_label
            .clone()
            .or_else(|| self.audio_quality.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub length_seconds: u64,
    #[serde(default)]
    pub video_thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    pub format_streams: Vec<FormatStream>,
    #[serde(default)]
    pub adaptive_formats: Vec<AdaptiveFormat>,
}

/// A direct media URL located by format identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFormat {
    pub direct_url: String,
    pub mime_type: String,
}

impl VideoInfo {
    /// Look up `itag` among muxed streams first, then adaptive ones
    pub fn find_format(&self, itag: &str) -> Option<LocatedFormat> {
        self.format_streams
            .iter()
            .find(|f| f.itag == itag)
            .map(|f| LocatedFormat {
                direct_url: f.url.clone(),
                mime_type: f.mime_type.clone(),
            })
            .or_else(|| {
                self.adaptive_formats
                    .iter()
                    .find(|f| f.itag == itag)
                    .map(|f| LocatedFormat {
                        direct_url: f.url.clone(),
                        mime_type: f.mime_type.clone(),
                    })
            })
    }
}

/// Fetch metadata for `video_id` from a live mirror
pub async fn fetch_video_info(
    video_id: &VideoId,
    instance: &ProxyInstance,
    config: &Config,
    client: &reqwest::Client,
) -> AppResult<VideoInfo> {
    let url = instance.url_for(&format!("/api/v1/videos/{}", video_id));

    let timeout_seconds = config.timeouts.metadata();
    within_budget(SERVICE, timeout_seconds, async {
        let response = send_with_timeout(client.get(&url), SERVICE, timeout_seconds).await?;
        let response = ensure_success(response, SERVICE).await?;
        response
            .json::<VideoInfo>()
            .await
            .map_err(|e| AppError::Transport {
                service: SERVICE,
                reason: format!("invalid video metadata body: {}", e),
            })
    })
    .await
}
