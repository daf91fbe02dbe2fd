//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers. Mirror
//! liveness is not probed here; it is determined per proxy request.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Number of mirror candidates the proxy can try
    pub mirrors_configured: usize,
    /// Whether replies are classified for YouTube keyword search
    pub search_enabled: bool,
}

/// Health check handler
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let config = state.config();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            mirrors_configured: config.proxy.instances.len(),
            search_enabled: config.youtube_search_active(),
        }),
    )
}
