//! Chat relay endpoint
//!
//! Handles `POST /api/chat`. With `streamMode` (the default) the reply is
//! relayed as server-sent events; otherwise one JSON document is returned.
//!
//! # SSE Format
//!
//! ```text
//! data: {"type":"content","content":"..."}
//!
//! data: {"type":"recommendations","recommendations":[...]}
//!
//! data: [DONE]
//!
//! ```
//!
//! Errors detected before the first byte (auth, validation, upstream status)
//! are ordinary HTTP errors. Access is checked from the headers before the
//! body is parsed. Once the event stream has started, an upstream
//! failure becomes a `{"type":"error"}` event followed by `[DONE]`.

use axum::{
    Extension,
    extract::{FromRequestParts, State},
    http::request::Parts,
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::AppState;
use super::extractor::AppJson;
use crate::access::{Identity, authorize};
use crate::cache::cache_key;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::RelayMode;
use crate::middleware::RequestId;
use crate::relay::{CacheSlot, RelayContext, RelayEvent, replay, structure_reply, transcode};
use crate::upstream::{self, ChatMessage, Role, UpstreamRequest};

/// Accepted temperature range
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

/// Request body of `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub max_completion_tokens: Option<u32>,
    #[serde(default = "default_stream_mode", rename = "streamMode")]
    pub stream_mode: bool,
}

fn default_stream_mode() -> bool {
    true
}

impl ChatRequest {
    /// Reject requests the upstream would refuse anyway
    pub fn validate(&self) -> AppResult<()> {
        if self.messages.is_empty() {
            return Err(AppError::Validation(
                "messages must contain at least one message".to_string(),
            ));
        }
        if self.messages.iter().any(|m| m.content.trim().is_empty()) {
            return Err(AppError::Validation(
                "message content must not be empty".to_string(),
            ));
        }
        if let Some(t) = self.temperature
            && !TEMPERATURE_RANGE.contains(&t)
        {
            return Err(AppError::Validation(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                t
            )));
        }
        Ok(())
    }

    /// Model named by the caller, or the configured default
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
    }

    /// Requested token limit before clamping
    pub fn requested_limit(&self, default: u32) -> u32 {
        self.max_completion_tokens
            .or(self.max_tokens)
            .unwrap_or(default)
    }

    /// Text of the most recent user message
    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Caller cleared to use the chat endpoint
///
/// Extracted from the request head, so a refused caller gets 401/403 whatever
/// the body holds. Carries the config snapshot the rest of the request uses.
pub struct ChatAccess {
    pub identity: Identity,
    pub config: Arc<Config>,
}

impl FromRequestParts<AppState> for ChatAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let config = state.config_snapshot();

        if !config.features.chat_enabled {
            return Err(AppError::FeatureDisabled(
                "recommendation chat is disabled".to_string(),
            ));
        }

        let identity = authorize(
            &parts.headers,
            &config.access,
            state.permissions(),
            &config.access.chat_feature,
        )
        .await?;

        Ok(ChatAccess { identity, config })
    }
}

/// POST /api/chat handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ChatAccess { identity, config }: ChatAccess,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Response, AppError> {
    request.validate()?;

    let model = request.model_or(&config.upstream.model).to_string();

    tracing::info!(
        request_id = %request_id,
        identity = %identity,
        model = %model,
        messages_count = request.messages.len(),
        stream = request.stream_mode,
        "Received chat request"
    );

    let key = if config.cache.enabled {
        cache_key(&model, &request.messages, config.cache.max_question_chars)
    } else {
        None
    };

    let mut ctx = RelayContext {
        config: config.clone(),
        client: state.client().clone(),
        metrics: state.metrics().clone(),
        user_message: request.last_user_message().to_string(),
        request_id,
        cache_slot: None,
    };

    if let Some(key) = &key
        && let Some(reply) = state.cache().get(key).await
    {
        tracing::info!(request_id = %request_id, "Serving reply from cache");
        state.metrics().record_relay_request(RelayMode::Cached);
        return Ok(if request.stream_mode {
            sse_response(replay(reply, ctx))
        } else {
            let completion = serde_json::json!({
                "id": format!("cache-{}", request_id),
                "model": model,
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": reply},
                    "finish_reason": "stop"
                }],
                "usage": null
            });
            complete_response(completion, &reply, &ctx).await
        });
    }

    ctx.cache_slot = key.map(|key| CacheSlot {
        cache: state.cache(),
        key,
    });

    let upstream_request = UpstreamRequest::new(
        model,
        upstream::prepare_messages(&request.messages, &config),
        request.requested_limit(config.upstream.max_tokens),
        request.temperature.unwrap_or(config.upstream.temperature),
        request.stream_mode,
    );

    if request.stream_mode {
        relay_stream(&state, &upstream_request, ctx).await
    } else {
        relay_complete(&state, &upstream_request, ctx).await
    }
}

fn record_upstream_failure(state: &AppState, request_id: RequestId, error: &AppError) {
    tracing::warn!(request_id = %request_id, error = %error, "Chat completion request failed");
    if matches!(
        error,
        AppError::Upstream { .. } | AppError::Transport { .. } | AppError::Timeout { .. }
    ) {
        state.metrics().upstream_error(upstream::dispatcher::SERVICE);
    }
}

fn record_duration(state: &AppState, mode: RelayMode, started: Instant) {
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Err(e) = state.metrics().record_upstream_duration(mode, duration_ms) {
        tracing::warn!(error = %e, "Failed to record upstream duration");
    }
}

async fn relay_stream(
    state: &AppState,
    upstream_request: &UpstreamRequest,
    ctx: RelayContext,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let response = upstream::dispatch(state.client(), &ctx.config, upstream_request)
        .await
        .inspect_err(|e| record_upstream_failure(state, ctx.request_id, e))?;
    record_duration(state, RelayMode::Stream, started);
    state.metrics().record_relay_request(RelayMode::Stream);

    tracing::info!(request_id = %ctx.request_id, "Starting streaming relay");
    Ok(sse_response(transcode(response.bytes_stream(), ctx)))
}

async fn relay_complete(
    state: &AppState,
    upstream_request: &UpstreamRequest,
    ctx: RelayContext,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let completion = upstream::complete(state.client(), &ctx.config, upstream_request)
        .await
        .inspect_err(|e| record_upstream_failure(state, ctx.request_id, e))?;
    record_duration(state, RelayMode::Complete, started);
    state.metrics().record_relay_request(RelayMode::Complete);

    let reply = completion.first_content().unwrap_or_default().to_string();
    if let Some(slot) = &ctx.cache_slot {
        slot.cache.set(slot.key.clone(), reply.clone()).await;
    }

    let body = serde_json::to_value(&completion)
        .map_err(|e| AppError::Internal(format!("Failed to encode completion: {}", e)))?;
    Ok(complete_response(body, &reply, &ctx).await)
}

/// Completion fields plus `type` and the structured payload
async fn complete_response(mut body: serde_json::Value, reply: &str, ctx: &RelayContext) -> Response {
    let payload = structure_reply(ctx, reply).await;
    if let (Some(target), Ok(serde_json::Value::Object(extra))) = (
        body.as_object_mut(),
        serde_json::to_value(RelayEvent::from(payload)),
    ) {
        target.extend(extra);
    }
    axum::Json(body).into_response()
}

fn sse_response(events: impl Stream<Item = RelayEvent> + Send + 'static) -> Response {
    let stream = events.map(|event| Ok::<_, Infallible>(event.into_sse()));
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> ChatRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_stream_mode_defaults_to_true() {
        let req = request(serde_json::json!({
            "messages": [{"role": "user", "content": "hi"}]
        }));
        assert!(req.stream_mode);

        let req = request(serde_json::json!({
            "messages": [{"role": "user", "content": "hi"}],
            "streamMode": false
        }));
        assert!(!req.stream_mode);
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        let empty = request(serde_json::json!({"messages": []}));
        assert!(matches!(empty.validate(), Err(AppError::Validation(_))));

        let blank = request(serde_json::json!({
            "messages": [{"role": "user", "content": "  "}]
        }));
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        let hot = request(serde_json::json!({
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 2.5
        }));
        assert!(matches!(hot.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_requested_limit_prefers_completion_field() {
        let req = request(serde_json::json!({
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 100,
            "max_completion_tokens": 5000
        }));
        assert_eq!(req.requested_limit(2000), 5000);

        let req = request(serde_json::json!({
            "messages": [{"role": "user", "content": "hi"}]
        }));
        assert_eq!(req.requested_limit(2000), 2000);
    }

    #[test]
    fn test_model_and_last_user_message() {
        let req = request(serde_json::json!({
            "model": "  ",
            "messages": [
                {"role": "user", "content": "first https://youtu.be/dQw4w9WgXcQ"},
                {"role": "assistant", "content": "reply"},
                {"role": "user", "content": "second"}
            ]
        }));
        assert_eq!(req.model_or("gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(req.last_user_message(), "second");
    }
}
