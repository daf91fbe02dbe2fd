//! Info mode: client-facing metadata with same-origin stream URLs

use serde::Serialize;

use super::instances::ProxyInstance;
use super::video_info::{Thumbnail, VideoInfo};
use crate::models::VideoId;

/// Value of the `type` query parameter in a rewritten stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// One playable format, reachable through this service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormatDescriptor {
    pub itag: String,
    pub quality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    pub mime_type: String,
    /// Same-origin proxy URL
    pub url: String,
    /// URL on the media host, as resolved by the mirror
    pub direct_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatBuckets {
    pub combined: Vec<StreamFormatDescriptor>,
    pub video: Vec<StreamFormatDescriptor>,
    pub audio: Vec<StreamFormatDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
    pub video_id: VideoId,
    pub title: String,
    pub author: String,
    pub length_seconds: u64,
    pub thumbnails: Vec<Thumbnail>,
    pub instance: String,
    pub formats: FormatBuckets,
    /// First muxed stream, if any
    pub best: Option<StreamFormatDescriptor>,
}

/// `{public_path}?v={id}&type={kind}&itag={itag}`
pub fn proxy_url(public_path: &str, video_id: &VideoId, kind: MediaKind, itag: &str) -> String {
    format!(
        "{}?v={}&type={}&itag={}",
        public_path,
        video_id,
        kind.as_str(),
        itag
    )
}

/// Rewrite every format of `info` into a descriptor served by this proxy
///
/// Muxed streams become `combined`; adaptive ones are split by MIME type,
/// and adaptive entries that are neither video nor audio are dropped.
pub fn build_info(
    video_id: &VideoId,
    info: VideoInfo,
    instance: &ProxyInstance,
    public_path: &str,
) -> VideoInfoResponse {
    let combined: Vec<StreamFormatDescriptor> = info
        .format_streams
        .iter()
        .map(|f| StreamFormatDescriptor {
            url: proxy_url(public_path, video_id, MediaKind::Video, &f.itag),
            itag: f.itag.clone(),
            quality: f.quality.clone(),
            bitrate: f.bitrate,
            mime_type: f.mime_type.clone(),
            direct_url: f.url.clone(),
        })
        .collect();

    let mut video = Vec::new();
    let mut audio = Vec::new();
    for format in &info.adaptive_formats {
        let (kind, bucket) = if format.is_audio() {
            (MediaKind::Audio, &mut audio)
        } else if format.is_video() {
            (MediaKind::Video, &mut video)
        } else {
            continue;
        };
        bucket.push(StreamFormatDescriptor {
            url: proxy_url(public_path, video_id, kind, &format.itag),
            itag: format.itag.clone(),
            quality: format.quality(),
            bitrate: format.bitrate,
            mime_type: format.mime_type.clone(),
            direct_url: format.url.clone(),
        });
    }

    let best = combined.first().cloned();

    VideoInfoResponse {
        video_id: video_id.clone(),
        title: info.title,
        author: info.author,
        length_seconds: info.length_seconds,
        thumbnails: info.video_thumbnails,
        instance: instance.base_url().to_string(),
        formats: FormatBuckets {
            combined,
            video,
            audio,
        },
        best,
    }
}
