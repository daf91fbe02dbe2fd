//! Configuration management for cinerelay
//!
//! Parses TOML configuration files and provides typed access to settings.
//! A loaded `Config` is an immutable snapshot: handlers clone the `Arc` once
//! per request and pass the snapshot explicitly into every downstream call.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Upper bound for any configured timeout, in seconds
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upstream chat-completion API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// API base URL, e.g. `https://api.openai.com/v1`, or the full
    /// `/chat/completions` URL
    pub base_url: String,
    #[serde(default)]
    api_key: Option<String>,
    /// Model used when the request does not name one
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Token limit requested when the caller sends neither `max_tokens` nor
    /// `max_completion_tokens`
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl UpstreamConfig {
    /// Bearer credential for the chat API, if one is configured
    ///
    /// Blank strings count as "not configured".
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

/// Feature flags
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_true")]
    pub chat_enabled: bool,
    /// Switches replies from movie recommendations to YouTube keyword search
    #[serde(default)]
    pub youtube_search_enabled: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            chat_enabled: true,
            youtube_search_enabled: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// YouTube Data API and oEmbed settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_oembed_url")]
    pub oembed_url: String,
}

impl YoutubeConfig {
    /// Data API key used for keyword search, if one is configured
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            search_url: default_search_url(),
            oembed_url: default_oembed_url(),
        }
    }
}

fn default_search_url() -> String {
    "https://www.googleapis.com/youtube/v3/search".to_string()
}

fn default_oembed_url() -> String {
    "https://www.youtube.com/oembed".to_string()
}

/// Edge proxy settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Mirror base URLs, probed in this order on every request
    #[serde(default = "default_instances")]
    pub instances: Vec<String>,
    /// Path appended to a mirror base URL for the liveness probe
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    /// Same-origin path under which this service exposes the proxy endpoint
    #[serde(default = "default_public_path")]
    pub public_path: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            instances: default_instances(),
            probe_path: default_probe_path(),
            public_path: default_public_path(),
        }
    }
}

fn default_instances() -> Vec<String> {
    vec![
        "https://inv.nadeko.net".to_string(),
        "https://invidious.nerdvpn.de".to_string(),
        "https://yewtu.be".to_string(),
    ]
}

fn default_probe_path() -> String {
    "/api/v1/stats".to_string()
}

fn default_public_path() -> String {
    "/api/youtube-proxy".to_string()
}

/// Caller identity and feature grants
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    /// Header carrying the identity already validated by the session layer
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    /// Feature name checked before a chat request is relayed
    #[serde(default = "default_chat_feature")]
    pub chat_feature: String,
    #[serde(default = "default_grants")]
    pub grants: Vec<AccessGrant>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            identity_header: default_identity_header(),
            chat_feature: default_chat_feature(),
            grants: default_grants(),
        }
    }
}

/// One identity (or `*` for everyone) and the features it may use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessGrant {
    pub identity: String,
    pub features: Vec<String>,
}

fn default_identity_header() -> String {
    "x-user-id".to_string()
}

fn default_chat_feature() -> String {
    "recommendation_chat".to_string()
}

fn default_grants() -> Vec<AccessGrant> {
    vec![AccessGrant {
        identity: "*".to_string(),
        features: vec![default_chat_feature()],
    }]
}

/// Short-lived reply cache for single-turn short questions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
            max_question_chars: default_max_question_chars(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_max_question_chars() -> usize {
    100
}

fn default_max_entries() -> usize {
    1024
}

/// System prompts injected when the caller sends no system message
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptsConfig {
    #[serde(default = "default_movie_prompt")]
    pub movie: String,
    #[serde(default = "default_youtube_prompt")]
    pub youtube: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            movie: default_movie_prompt(),
            youtube: default_youtube_prompt(),
        }
    }
}

fn default_movie_prompt() -> String {
    "You are a friendly movie expert. When recommending movies, recommend at most 4 and \
    put each one on its own line in exactly this format:\n\
    《Title》(Year)[Genre] - one or two sentences on why it fits.\n\
    Keep any other commentary short."
        .to_string()
}

fn default_youtube_prompt() -> String {
    "You are a friendly video curator. Suggest at most 4 videos the user could search for \
    on YouTube. Wrap each search phrase in 【】, for example 【Interstellar official trailer】, \
    and add one sentence about each."
        .to_string()
}

/// Per-operation time budgets, in seconds
///
/// # Custom Deserialization
///
/// All values must be in range (0, 300]. Invalid values are rejected during
/// TOML parsing, not later during `Config::validate()`.
#[derive(Debug, Clone, Serialize)]
pub struct TimeoutsConfig {
    /// Upstream chat-completion call
    upstream: u64,
    /// Mirror liveness probe
    probe: u64,
    /// Mirror metadata and oEmbed/search lookups
    metadata: u64,
    /// Media pass-through fetch (time to response headers)
    media: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            upstream: 60,
            probe: 5,
            metadata: 10,
            media: 30,
        }
    }
}

impl TimeoutsConfig {
    /// Create a new TimeoutsConfig with validated timeout values
    ///
    /// # Errors
    ///
    /// Returns an error if any timeout is zero or exceeds 300 seconds.
    pub fn new(
        upstream: u64,
        probe: u64,
        metadata: u64,
        media: u64,
    ) -> crate::error::AppResult<Self> {
        for (name, timeout) in [
            ("upstream", upstream),
            ("probe", probe),
            ("metadata", metadata),
            ("media", media),
        ] {
            if timeout == 0 {
                return Err(crate::error::AppError::Config(format!(
                    "timeouts.{} must be greater than 0, got {}",
                    name, timeout
                )));
            }
            if timeout > MAX_TIMEOUT_SECONDS {
                return Err(crate::error::AppError::Config(format!(
                    "timeouts.{} cannot exceed {} seconds, got {}",
                    name, MAX_TIMEOUT_SECONDS, timeout
                )));
            }
        }
        Ok(Self {
            upstream,
            probe,
            metadata,
            media,
        })
    }

    pub fn upstream(&self) -> u64 {
        self.upstream
    }

    pub fn probe(&self) -> u64 {
        self.probe
    }

    pub fn metadata(&self) -> u64 {
        self.metadata
    }

    pub fn media(&self) -> u64 {
        self.media
    }
}

/// Custom Deserialize implementation for TimeoutsConfig
///
/// Missing fields take their defaults; present fields go through the
/// validated `new()` constructor.
impl<'de> Deserialize<'de> for TimeoutsConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct RawTimeouts {
            upstream: Option<u64>,
            probe: Option<u64>,
            metadata: Option<u64>,
            media: Option<u64>,
        }

        let raw = RawTimeouts::deserialize(deserializer)?;
        let defaults = TimeoutsConfig::default();

        TimeoutsConfig::new(
            raw.upstream.unwrap_or(defaults.upstream),
            raw.probe.unwrap_or(defaults.probe),
            raw.metadata.unwrap_or(defaults.metadata),
            raw.media.unwrap_or(defaults.media),
        )
        .map_err(|e| serde::de::Error::custom(format!("Invalid timeout configuration: {}", e)))
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Whether replies should be classified for YouTube keyword search
    ///
    /// Needs both the feature flag and a Data API key.
    pub fn youtube_search_active(&self) -> bool {
        self.features.youtube_search_enabled && self.youtube.api_key().is_some()
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`, but can
    /// also be called explicitly when constructing Config via other means.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::AppError;

        if !is_http_url(&self.upstream.base_url) {
            return Err(AppError::Config(format!(
                "upstream.base_url '{}' must start with 'http://' or 'https://'",
                self.upstream.base_url
            )));
        }

        let temperature = self.upstream.temperature;
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Config(format!(
                "upstream.temperature must be a finite number between 0.0 and 2.0, got {}",
                temperature
            )));
        }

        if self.upstream.max_tokens == 0 {
            return Err(AppError::Config(
                "upstream.max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.upstream.model.trim().is_empty() {
            return Err(AppError::Config(
                "upstream.model cannot be empty".to_string(),
            ));
        }

        if self.upstream.api_key().is_none() {
            tracing::warn!(
                "upstream.api_key is not set; chat requests will fail until a key is configured"
            );
        }

        for url in [&self.youtube.search_url, &self.youtube.oembed_url] {
            if !is_http_url(url) {
                return Err(AppError::Config(format!(
                    "youtube URL '{}' must start with 'http://' or 'https://'",
                    url
                )));
            }
        }

        if self.features.youtube_search_enabled && self.youtube.api_key().is_none() {
            tracing::warn!(
                "features.youtube_search_enabled is set but youtube.api_key is missing; \
                replies will be classified as movie recommendations"
            );
        }

        for instance in &self.proxy.instances {
            if !is_http_url(instance) {
                return Err(AppError::Config(format!(
                    "proxy instance '{}' must start with 'http://' or 'https://'",
                    instance
                )));
            }
        }

        if !self.proxy.probe_path.starts_with('/') || !self.proxy.public_path.starts_with('/') {
            return Err(AppError::Config(
                "proxy.probe_path and proxy.public_path must start with '/'".to_string(),
            ));
        }

        if axum::http::HeaderName::from_bytes(self.access.identity_header.as_bytes()).is_err() {
            return Err(AppError::Config(format!(
                "access.identity_header '{}' is not a valid HTTP header name",
                self.access.identity_header
            )));
        }

        if self.cache.enabled && (self.cache.ttl_seconds == 0 || self.cache.max_entries == 0) {
            return Err(AppError::Config(
                "cache.ttl_seconds and cache.max_entries must be greater than 0 when the cache is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = crate::error::AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        config.validate()?;
        Ok(config)
    }
}
