//! Type-safe YouTube video id
//!
//! A `VideoId` can only be built from exactly 11 URL-safe characters
//! (`[A-Za-z0-9_-]`), so every id that reaches an outbound URL is valid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a YouTube video id
pub const VIDEO_ID_LEN: usize = 11;

/// Whether `c` may appear in a video id
pub fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Validated 11-character video id
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Validate and wrap a video id
    ///
    /// # Errors
    /// Returns a message naming the offending value if it is not exactly 11
    /// characters from `[A-Za-z0-9_-]`.
    pub fn parse(value: &str) -> Result<Self, String> {
        if value.len() == VIDEO_ID_LEN && value.chars().all(is_id_char) {
            Ok(Self(value.to_string()))
        } else {
            Err(format!(
                "'{}' is not a valid video id (expected {} characters from [A-Za-z0-9_-])",
                value, VIDEO_ID_LEN
            ))
        }
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this id
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    /// Embeddable player URL for this id
    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.0)
    }

    /// Deterministic thumbnail URL for this id
    pub fn thumbnail_url(&self) -> String {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.0)
    }
}

impl TryFrom<String> for VideoId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
