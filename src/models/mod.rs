//! Domain types shared by the relay, the enrichment fan-out and the proxy

pub mod recommendation;
pub mod video_id;

pub use recommendation::{
    METADATA_UNAVAILABLE, MISSING_DESCRIPTION, MovieRecommendation, VideoLinkResult,
    YoutubeVideoResult,
};
pub use video_id::VideoId;
