//! Events relayed to the client

use axum::response::sse::Event;
use serde::Serialize;

use super::lines::DONE_MARKER;
use crate::enrichment::StructuredPayload;
use crate::models::{MovieRecommendation, VideoLinkResult, YoutubeVideoResult};

/// One server-sent event, serialized as `data: <json>`
///
/// `Done` is the terminal `data: [DONE]` marker and has no JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    Content {
        content: String,
    },
    Recommendations {
        recommendations: Vec<MovieRecommendation>,
    },
    YoutubeVideos {
        #[serde(rename = "youtubeVideos")]
        youtube_videos: Vec<YoutubeVideoResult>,
    },
    VideoLinks {
        #[serde(rename = "videoLinks")]
        video_links: Vec<VideoLinkResult>,
    },
    Error {
        error: String,
    },
    #[serde(skip)]
    Done,
}

impl RelayEvent {
    pub fn content(text: impl Into<String>) -> Self {
        RelayEvent::Content {
            content: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RelayEvent::Error {
            error: message.into(),
        }
    }

    /// Text of the `data` field
    pub fn data(&self) -> String {
        match self {
            RelayEvent::Done => DONE_MARKER.to_string(),
            event => serde_json::to_string(event).unwrap_or_default(),
        }
    }

    pub fn into_sse(self) -> Event {
        Event::default().data(self.data())
    }
}

impl From<StructuredPayload> for RelayEvent {
    fn from(payload: StructuredPayload) -> Self {
        match payload {
            StructuredPayload::VideoLinks(video_links) => RelayEvent::VideoLinks { video_links },
            StructuredPayload::YoutubeVideos(youtube_videos) => {
                RelayEvent::YoutubeVideos { youtube_videos }
            }
            StructuredPayload::Recommendations(recommendations) => {
                RelayEvent::Recommendations { recommendations }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_event_wire_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&RelayEvent::content("Hi").data()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "content", "content": "Hi"}));
    }

    #[test]
    fn test_structured_events_use_camel_case_payload_keys() {
        let event = RelayEvent::from(StructuredPayload::YoutubeVideos(Vec::new()));
        let json: serde_json::Value = serde_json::from_str(&event.data()).unwrap();
        assert_eq!(json["type"], "youtube_videos");
        assert!(json["youtubeVideos"].is_array());

        let event = RelayEvent::from(StructuredPayload::VideoLinks(Vec::new()));
        let json: serde_json::Value = serde_json::from_str(&event.data()).unwrap();
        assert_eq!(json["type"], "video_links");
        assert!(json["videoLinks"].is_array());

        let event = RelayEvent::from(StructuredPayload::Recommendations(vec![
            MovieRecommendation {
                title: "Dune".to_string(),
                year: "2021".to_string(),
                genre: "Sci-Fi".to_string(),
                description: "Spice.".to_string(),
            },
        ]));
        let json: serde_json::Value = serde_json::from_str(&event.data()).unwrap();
        assert_eq!(json["type"], "recommendations");
        assert_eq!(json["recommendations"][0]["title"], "Dune");
    }

    #[test]
    fn test_error_and_done() {
        let json: serde_json::Value =
            serde_json::from_str(&RelayEvent::error("interrupted").data()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "error", "error": "interrupted"}));
        assert_eq!(RelayEvent::Done.data(), "[DONE]");
    }
}
