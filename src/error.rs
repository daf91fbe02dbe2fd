//! Error types for cinerelay
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied for feature '{feature}'")]
    Forbidden { feature: String },

    #[error("{service} returned HTTP {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Request to {service} failed: {reason}")]
    Transport {
        service: &'static str,
        reason: String,
    },

    #[error("Request to {service} timed out after {timeout_seconds} seconds")]
    Timeout {
        service: &'static str,
        timeout_seconds: u64,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No healthy mirror instance available")]
    NoInstanceAvailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code and client-facing message for an upstream failure
    ///
    /// The raw upstream message is only echoed for 400s, where it tells the
    /// caller what to fix.
    fn upstream_status_and_message(service: &str, status: u16, message: &str) -> (StatusCode, String) {
        match status {
            400 => (
                StatusCode::BAD_REQUEST,
                format!("{} rejected the request: {}", service, message),
            ),
            401 | 403 => (
                StatusCode::BAD_GATEWAY,
                format!(
                    "{} rejected the configured API credential; check the key in the server configuration",
                    service
                ),
            ),
            429 => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("{} is rate limiting requests; try again shortly", service),
            ),
            s if s >= 500 => (
                StatusCode::BAD_GATEWAY,
                format!("{} is temporarily unavailable (HTTP {}); try again later", service, s),
            ),
            s => (
                StatusCode::BAD_GATEWAY,
                format!("{} returned an unexpected status (HTTP {})", service, s),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut hint = None;
        let mut no_store = false;

        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Self::FeatureDisabled(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Unauthenticated => {
                no_store = true;
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            Self::Forbidden { .. } => {
                no_store = true;
                (StatusCode::FORBIDDEN, self.to_string())
            }
            Self::Upstream {
                service,
                status,
                message,
            } => Self::upstream_status_and_message(service, *status, message),
            Self::Transport { service, .. } => (
                StatusCode::BAD_GATEWAY,
                format!("Request to {} failed", service),
            ),
            Self::Timeout { .. } => {
                hint = Some(
                    "The dependent service did not answer within its time budget. \
                    Check network reachability of the configured base URL, or retry with a shorter prompt.",
                );
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::NoInstanceAvailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Unclassified internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = match hint {
            Some(hint) => serde_json::json!({ "error": message, "hint": hint }),
            None => serde_json::json!({ "error": message }),
        };

        let mut response = (status, Json(body)).into_response();
        if no_store {
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }
        response
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
