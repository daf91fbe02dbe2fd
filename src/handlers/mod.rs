//! HTTP request handlers for the Cinerelay API

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::access::{ConfigPermissions, PermissionCheck};
use crate::cache::{DisabledCache, MemoryCache, ResponseCache};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;

pub mod chat;
pub mod extractor;
pub mod health;
pub mod metrics;
pub mod youtube_proxy;

/// Application state shared across all handlers
///
/// Holds the configuration snapshot and the external collaborators. All
/// fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    client: reqwest::Client,
    metrics: Metrics,
    permissions: Arc<dyn PermissionCheck>,
    cache: Arc<dyn ResponseCache>,
}

impl AppState {
    /// Create state with the collaborators described by the configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the metrics registry or the HTTP
    /// client cannot be created.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let permissions = Arc::new(ConfigPermissions::from_config(&config.access));
        let cache: Arc<dyn ResponseCache> = if config.cache.enabled {
            Arc::new(MemoryCache::from_config(&config.cache))
        } else {
            Arc::new(DisabledCache)
        };
        Self::with_collaborators(config, permissions, cache)
    }

    /// Create state with caller-supplied permission and cache backends
    pub fn with_collaborators(
        config: Arc<Config>,
        permissions: Arc<dyn PermissionCheck>,
        cache: Arc<dyn ResponseCache>,
    ) -> AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("Failed to initialize metrics: {}", e)))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("cinerelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            mirrors = config.proxy.instances.len(),
            search_enabled = config.youtube_search_active(),
            cache_enabled = config.cache.enabled,
            "Application state initialized"
        );

        Ok(Self {
            config,
            client,
            metrics,
            permissions,
            cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the configuration, for work that outlives the handler
    pub fn config_snapshot(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn permissions(&self) -> &dyn PermissionCheck {
        self.permissions.as_ref()
    }

    pub fn cache(&self) -> Arc<dyn ResponseCache> {
        self.cache.clone()
    }
}

/// All routes with tracing and request IDs
pub fn router(state: AppState) -> Router {
    let proxy_path = state.config().proxy.public_path.clone();

    Router::new()
        .route("/api/chat", post(chat::handler))
        .route(
            &proxy_path,
            get(youtube_proxy::handler).options(youtube_proxy::preflight),
        )
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}
