//! YouTube edge proxy endpoint
//!
//! `GET {public_path}?v={id}&type={info|video|audio}&itag={itag}`
//!
//! - `type=info` (default): metadata with every format rewritten to a
//!   same-origin URL of this endpoint
//! - `type=video|audio`: byte pass-through of the format named by `itag`,
//!   honoring the caller's `Range` header
//!
//! Every response, errors included, carries CORS headers.

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::metrics::ProxyMode;
use crate::middleware::RequestId;
use crate::models::VideoId;
use crate::proxy::{
    self, ProxyInstance, VideoInfo, build_info, cors_headers, discover_instance, fetch_video_info,
    open_media, preflight_headers, relay_media,
};

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub itag: Option<String>,
}

/// Parsed and validated proxy request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRequest {
    Info { video_id: VideoId },
    Stream { video_id: VideoId, itag: String },
}

impl ProxyQuery {
    pub fn parse(self) -> AppResult<ProxyRequest> {
        let raw_id = self
            .v
            .ok_or_else(|| AppError::Validation("query parameter 'v' is required".to_string()))?;
        let video_id = VideoId::parse(raw_id.trim()).map_err(AppError::Validation)?;

        match self.kind.as_deref().map(str::trim).unwrap_or("info") {
            "info" => Ok(ProxyRequest::Info { video_id }),
            "video" | "audio" => {
                let itag = self
                    .itag
                    .map(|i| i.trim().to_string())
                    .filter(|i| !i.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "query parameter 'itag' is required for media requests".to_string(),
                        )
                    })?;
                Ok(ProxyRequest::Stream { video_id, itag })
            }
            other => Err(AppError::Validation(format!(
                "unsupported type '{}'; expected info, video or audio",
                other
            ))),
        }
    }
}

/// OPTIONS handler: static CORS preflight answer
pub async fn preflight() -> Response {
    (StatusCode::NO_CONTENT, preflight_headers()).into_response()
}

/// GET handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<ProxyQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let outcome = match query {
        Ok(Query(query)) => serve(&state, request_id, query, &headers).await,
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    };
    let mut response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::info!(request_id = %request_id, error = %e, "Proxy request failed");
            e.into_response()
        }
    };
    response.headers_mut().extend(cors_headers());
    response
}

async fn serve(
    state: &AppState,
    request_id: RequestId,
    query: ProxyQuery,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let request = query.parse()?;
    let (video_id, mode) = match &request {
        ProxyRequest::Info { video_id } => (video_id, ProxyMode::Info),
        ProxyRequest::Stream { video_id, .. } => (video_id, ProxyMode::Stream),
    };
    state.metrics().record_proxy_request(mode);

    let config = state.config_snapshot();
    let instance = discover_instance(&config, state.client(), state.metrics())
        .await
        .ok_or(AppError::NoInstanceAvailable)?;

    tracing::debug!(
        request_id = %request_id,
        video_id = %video_id,
        instance = %instance.base_url(),
        mode = mode.as_str(),
        "Resolving video through mirror"
    );

    let info = load_info(state, video_id, &instance).await?;

    match request {
        ProxyRequest::Info { video_id } => {
            let response = build_info(&video_id, info, &instance, &config.proxy.public_path);
            Ok(Json(response).into_response())
        }
        ProxyRequest::Stream { video_id, itag } => {
            let format = info.find_format(&itag).ok_or_else(|| {
                AppError::NotFound(format!("format {} not available for video {}", itag, video_id))
            })?;

            let upstream = open_media(&format, headers.get(header::RANGE), &config, state.client())
                .await
                .inspect_err(|_| state.metrics().upstream_error(proxy::stream::SERVICE))?;

            tracing::info!(
                request_id = %request_id,
                video_id = %video_id,
                itag = %itag,
                status = upstream.status().as_u16(),
                "Relaying media stream"
            );
            Ok(relay_media(upstream, &format))
        }
    }
}

async fn load_info(
    state: &AppState,
    video_id: &VideoId,
    instance: &ProxyInstance,
) -> AppResult<VideoInfo> {
    fetch_video_info(video_id, instance, state.config(), state.client())
        .await
        .inspect_err(|_| state.metrics().upstream_error(proxy::video_info::SERVICE))
}
