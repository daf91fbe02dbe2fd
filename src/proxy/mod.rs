//! YouTube edge proxy
//!
//! Finds a live mirror, resolves format descriptors from it and streams media
//! bytes back through this service so the client never talks to a mirror or
//! media host directly.

pub mod info;
pub mod instances;
pub mod stream;
pub mod video_info;

pub use info::{MediaKind, StreamFormatDescriptor, VideoInfoResponse, build_info, proxy_url};
pub use instances::{ProxyInstance, discover_instance};
pub use stream::{open_media, relay_media};
pub use video_info::{LocatedFormat, VideoInfo, fetch_video_info};

use axum::http::{HeaderMap, HeaderValue, header};

/// Preflight cache lifetime in seconds (24 hours)
pub const CORS_MAX_AGE: &str = "86400";

/// CORS headers attached to every proxy response
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Range, Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Length, Content-Range, Accept-Ranges"),
    );
    headers
}

/// CORS headers for a preflight response
pub fn preflight_headers() -> HeaderMap {
    let mut headers = cors_headers();
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(CORS_MAX_AGE),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_adds_max_age() {
        assert!(cors_headers().get(header::ACCESS_CONTROL_MAX_AGE).is_none());
        assert_eq!(
            preflight_headers()[header::ACCESS_CONTROL_MAX_AGE],
            CORS_MAX_AGE
        );
        assert_eq!(preflight_headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
