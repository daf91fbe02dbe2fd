//! Content extraction engine
//!
//! Turns free text into at most one kind of structured data. Model output is
//! not guaranteed to follow any grammar, so every extractor's failure mode is
//! "nothing found", never an error.
//!
//! Classification is evaluated in priority order and is mutually exclusive:
//!
//! 1. **Video link**: the user's message contains YouTube URLs (reply ignored)
//! 2. **YouTube recommend**: search is active and the reply has `【…】` keywords
//! 3. **Movie recommend**: everything else

pub mod keywords;
pub mod movies;
pub mod video_links;

pub use keywords::extract_keywords;
pub use movies::{extract_movies, parse_movie_line};
pub use video_links::{VideoLink, find_video_links};

use crate::models::MovieRecommendation;

/// Maximum number of recommendations or keywords extracted from one reply
pub const MAX_EXTRACTED: usize = 4;

/// The single categorical outcome for a completed reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    VideoLink,
    YoutubeRecommend,
    MovieRecommend,
}

impl Classification {
    /// Label used for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::VideoLink => "video_link",
            Classification::YoutubeRecommend => "youtube_recommend",
            Classification::MovieRecommend => "movie_recommend",
        }
    }
}

/// Extracted data, tagged by classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    VideoLinks(Vec<VideoLink>),
    YoutubeKeywords(Vec<String>),
    Movies(Vec<MovieRecommendation>),
}

impl Extraction {
    pub fn classification(&self) -> Classification {
        match self {
            Extraction::VideoLinks(_) => Classification::VideoLink,
            Extraction::YoutubeKeywords(_) => Classification::YoutubeRecommend,
            Extraction::Movies(_) => Classification::MovieRecommend,
        }
    }
}

/// Classify a completed exchange and extract its entities
///
/// `user_message` is the message that triggered the reply; `youtube_search_active`
/// is true when the search feature is enabled and a search key is configured.
pub fn classify(user_message: &str, reply: &str, youtube_search_active: bool) -> Extraction {
    let links = find_video_links(user_message);
    if !links.is_empty() {
        return Extraction::VideoLinks(links);
    }

    if youtube_search_active {
        let keywords = extract_keywords(reply);
        if !keywords.is_empty() {
            return Extraction::YoutubeKeywords(keywords);
        }
    }

    Extraction::Movies(extract_movies(reply))
}
