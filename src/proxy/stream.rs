//! Stream mode: byte pass-through from the media host
//!
//! The response body is relayed chunk by chunk as the client reads it. The
//! media time budget covers the wait for response headers only, so long
//! downloads are not cut off.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};

use super::video_info::LocatedFormat;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::shared::http::send_with_timeout;

pub const SERVICE: &str = "media host";

/// Response headers copied from the media host
pub const RELAYED_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
];

/// Request the media bytes, forwarding the caller's `Range` header verbatim
pub async fn open_media(
    format: &LocatedFormat,
    range: Option<&HeaderValue>,
    config: &Config,
    client: &reqwest::Client,
) -> AppResult<reqwest::Response> {
    let mut builder = client.get(&format.direct_url);
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range.clone());
    }

    let response = send_with_timeout(builder, SERVICE, config.timeouts.media()).await?;
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "Media host refused the request");
        return Err(AppError::Upstream {
            service: SERVICE,
            status: StatusCode::BAD_GATEWAY.as_u16(),
            message: format!("media host returned status {}", status.as_u16()),
        });
    }

    Ok(response)
}

/// Turn the media host's response into ours without buffering the body
pub fn relay_media(upstream: reqwest::Response, format: &LocatedFormat) -> Response {
    let status = upstream.status();
    let mut headers = HeaderMap::new();
    for name in RELAYED_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            headers.insert(name, value.clone());
        }
    }
    if !headers.contains_key(header::CONTENT_TYPE)
        && let Ok(value) = HeaderValue::from_str(&format.mime_type)
    {
        headers.insert(header::CONTENT_TYPE, value);
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
}
