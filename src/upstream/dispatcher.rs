//! Outbound chat-completion calls
//!
//! Builds the completions URL, injects the mode-specific system prompt and
//! issues the request with the configured credential and time budget.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::shared::http::{ensure_success, send_with_timeout, within_budget};

use super::types::{ChatMessage, Role, UpstreamCompletion, UpstreamRequest};

/// Path suffix of the chat-completion endpoint
pub const COMPLETIONS_PATH: &str = "/chat/completions";

/// Service label used in errors and logs
pub const SERVICE: &str = "chat completion API";

/// Resolve the completions URL from a configured base URL
///
/// A base URL that already ends with the completions path is used verbatim.
pub fn build_endpoint(base_url: &str) -> String {
    if base_url.ends_with(COMPLETIONS_PATH) {
        return base_url.to_string();
    }
    format!("{}{}", base_url.trim_end_matches('/'), COMPLETIONS_PATH)
}

/// Prepend the configured system prompt unless the caller brought one
///
/// The prompt for the active mode tells the model which output grammar the
/// extraction engine expects.
pub fn prepare_messages(messages: &[ChatMessage], config: &Config) -> Vec<ChatMessage> {
    if messages.iter().any(|m| m.role == Role::System) {
        return messages.to_vec();
    }

    let prompt = if config.youtube_search_active() {
        &config.prompts.youtube
    } else {
        &config.prompts.movie
    };

    let mut prepared = Vec::with_capacity(messages.len() + 1);
    prepared.push(ChatMessage::system(prompt.clone()));
    prepared.extend_from_slice(messages);
    prepared
}

/// Issue the request and return the raw 2xx response
///
/// The time budget covers connection setup and response headers. The body is
/// left unread so streaming callers can consume it incrementally.
pub async fn dispatch(
    client: &reqwest::Client,
    config: &Config,
    request: &UpstreamRequest,
) -> AppResult<reqwest::Response> {
    let api_key = config.upstream.api_key().ok_or_else(|| {
        AppError::Config("no API key configured for the chat completion API".to_string())
    })?;

    let url = build_endpoint(&config.upstream.base_url);

    tracing::debug!(
        url = %url,
        model = %request.model(),
        model_class = ?request.model_class(),
        token_limit = request.token_limit(),
        stream = request.is_stream(),
        messages_count = request.messages().len(),
        "Dispatching chat completion request"
    );

    let timeout_seconds = config.timeouts.upstream();
    let builder = client.post(&url).bearer_auth(api_key).json(request);
    within_budget(SERVICE, timeout_seconds, async {
        let response = send_with_timeout(builder, SERVICE, timeout_seconds).await?;
        ensure_success(response, SERVICE).await
    })
    .await
}

/// Non-streaming call: the whole exchange, body included, shares one budget
///
/// Fails unless at least one choice carries non-empty content.
pub async fn complete(
    client: &reqwest::Client,
    config: &Config,
    request: &UpstreamRequest,
) -> AppResult<UpstreamCompletion> {
    let timeout_seconds = config.timeouts.upstream();

    let exchange = async {
        let response = dispatch(client, config, request).await?;
        response
            .json::<UpstreamCompletion>()
            .await
            .map_err(|e| AppError::Transport {
                service: SERVICE,
                reason: format!("invalid completion body: {}", e),
            })
    };

    let completion = within_budget(SERVICE, timeout_seconds, exchange).await?;

    if completion.first_content().is_none() {
        return Err(AppError::Upstream {
            service: SERVICE,
            status: 502,
            message: "completion contained no choices with content".to_string(),
        });
    }

    Ok(completion)
}
