//! Outbound HTTP helpers shared by every dependent-service call
//!
//! Each call site owns a time budget; these helpers turn budget expiry,
//! connection failures and non-2xx statuses into the matching `AppError`.

use crate::error::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Longest upstream error text echoed into logs and messages
const MAX_ERROR_MESSAGE_CHARS: usize = 300;

/// Send a request, bounding the wait for response headers by `timeout_seconds`
///
/// Dropping the returned future (or hitting the deadline) cancels the request.
pub async fn send_with_timeout(
    builder: reqwest::RequestBuilder,
    service: &'static str,
    timeout_seconds: u64,
) -> AppResult<reqwest::Response> {
    match tokio::time::timeout(Duration::from_secs(timeout_seconds), builder.send()).await {
        Err(_) => Err(AppError::Timeout {
            service,
            timeout_seconds,
        }),
        Ok(Err(e)) if e.is_timeout() => Err(AppError::Timeout {
            service,
            timeout_seconds,
        }),
        Ok(Err(e)) => Err(AppError::Transport {
            service,
            reason: e.to_string(),
        }),
        Ok(Ok(response)) => Ok(response),
    }
}

/// Run a whole exchange (send, status check, body read) under one budget
///
/// A host that sends headers and then stalls the body still fails with
/// `AppError::Timeout` once `timeout_seconds` have passed.
pub async fn within_budget<T, F>(
    service: &'static str,
    timeout_seconds: u64,
    exchange: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::time::timeout(Duration::from_secs(timeout_seconds), exchange)
        .await
        .map_err(|_| AppError::Timeout {
            service,
            timeout_seconds,
        })?
}

/// Pass 2xx responses through; turn anything else into `AppError::Upstream`
///
/// The error body is read best-effort to recover a human-readable message.
pub async fn ensure_success(
    response: reqwest::Response,
    service: &'static str,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body);

    tracing::warn!(
        service = service,
        status = status.as_u16(),
        message = %message,
        "Dependent service returned an error status"
    );

    Err(AppError::Upstream {
        service,
        status: status.as_u16(),
        message,
    })
}

/// Best-effort error message from an error response body
///
/// Understands `{"error":{"message":..}}`, `{"error":".."}` and
/// `{"message":".."}`; otherwise returns the (truncated) raw text.
pub fn extract_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let from_json = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .and_then(|m| m.as_str())
            .or_else(|| value.get("error").and_then(|e| e.as_str()))
            .or_else(|| value.get("message").and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return "no error details provided".to_string();
    }
    truncate_chars(&message, MAX_ERROR_MESSAGE_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Local server that answers 200 with a short body, then never finishes it
#[cfg(test)]
pub(crate) async fn stalled_body_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 1000\r\n\r\n{\"title\": \"par",
                    )
                    .await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
                drop(socket);
            });
        }
    });
    format!("http://{}", addr)
}
