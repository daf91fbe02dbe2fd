//! YouTube URL detection in user messages

use regex::Regex;
use std::sync::LazyLock;

use super::MAX_EXTRACTED;
use crate::models::VideoId;
use crate::models::video_id::is_id_char;

/// Recognized URL shapes, scheme optional:
/// `youtube.com/watch?..v=ID`, `youtu.be/ID`, `youtube.com/{embed,shorts,live,v}/ID`,
/// `youtube-nocookie.com/embed/ID`, on `www.`, `m.` and `music.` hosts.
/// The trailing group keeps query/fragment/path text as part of the original URL.
static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^\s#]*?&)?v=|embed/|shorts/|live/|v/)|youtube-nocookie\.com/embed/|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/][^\s<>"'）」》]*)?"#,
    )
    .expect("video URL pattern is valid")
});

/// A video URL found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLink {
    pub video_id: VideoId,
    /// Matched URL text as written by the user
    pub original_url: String,
}

/// Find up to [`MAX_EXTRACTED`] YouTube links in `text`, in order of appearance
///
/// Duplicates are kept and count towards the cap. A candidate whose id runs on past 11 id characters
/// is not a valid link and is skipped. Sentence punctuation trailing the URL
/// is not part of `original_url`.
pub fn find_video_links(text: &str) -> Vec<VideoLink> {
    VIDEO_URL_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?;

            if text[id.end()..].chars().next().is_some_and(is_id_char) {
                return None;
            }

            let video_id = VideoId::parse(id.as_str()).ok()?;
            let original_url = whole
                .as_str()
                .trim_end_matches(['.', ',', '!', '?', ';', ':']);
            Some(VideoLink {
                video_id,
                original_url: original_url.to_string(),
            })
        })
        .take(MAX_EXTRACTED)
        .collect()
}
