//! Command-line interface for Cinerelay
//!
//! Provides argument parsing and subcommand handling for the Cinerelay binary.

use clap::{Parser, Subcommand};

/// Streaming recommendation chat relay with a YouTube edge proxy
#[derive(Parser)]
#[command(name = "cinerelay")]
#[command(version)]
#[command(about = "Streaming recommendation chat relay with a YouTube edge proxy")]
#[command(
    long_about = "Cinerelay relays chat completions to the browser as server-sent events, \
    turns finished replies into movie or video recommendations enriched with YouTube \
    metadata, and proxies video metadata and media through public mirrors."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Cinerelay Configuration
# ========================
#
# This file configures the HTTP server, the chat-completion upstream, reply
# enrichment, the YouTube proxy and observability settings for Cinerelay.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# ─────────────────────────────────────────────────────────────────────────────
# CHAT-COMPLETION UPSTREAM
# ─────────────────────────────────────────────────────────────────────────────

[upstream]
# OpenAI-compatible base URL; "/chat/completions" is appended
base_url = "https://api.openai.com/v1"

# Bearer credential sent to the upstream
api_key = "sk-your-key"

# Default model when the request names none
model = "gpt-4o-mini"

# Default sampling temperature (0.0-2.0)
temperature = 0.7

# Default output-token limit (clamped per model class)
max_tokens = 2000

# ─────────────────────────────────────────────────────────────────────────────
# FEATURES
# ─────────────────────────────────────────────────────────────────────────────

[features]
# Turn the chat endpoint off entirely
chat_enabled = true

# Classify replies for YouTube keyword search (also needs youtube.api_key)
youtube_search_enabled = false

# ─────────────────────────────────────────────────────────────────────────────
# YOUTUBE LOOKUPS
# ─────────────────────────────────────────────────────────────────────────────

[youtube]
# YouTube Data API v3 key, needed for keyword search only
# api_key = "your-youtube-key"
search_url = "https://www.googleapis.com/youtube/v3/search"
oembed_url = "https://www.youtube.com/oembed"

# ─────────────────────────────────────────────────────────────────────────────
# YOUTUBE PROXY
# ─────────────────────────────────────────────────────────────────────────────

[proxy]
# Mirrors tried in order; the first one answering the probe is used
instances = [
    "https://inv.nadeko.net",
    "https://invidious.nerdvpn.de",
    "https://yewtu.be",
]
probe_path = "/api/v1/stats"

# Path this server exposes the proxy on; rewritten format URLs point here
public_path = "/api/youtube-proxy"

# ─────────────────────────────────────────────────────────────────────────────
# ACCESS CONTROL
# ─────────────────────────────────────────────────────────────────────────────

[access]
# Header carrying the caller identity
identity_header = "x-user-id"

# Feature name checked for chat requests
chat_feature = "recommendation_chat"

# "*" matches any identity or any feature
[[access.grants]]
identity = "*"
features = ["recommendation_chat"]

# ─────────────────────────────────────────────────────────────────────────────
# RESPONSE CACHE
# ─────────────────────────────────────────────────────────────────────────────

[cache]
# Short single-question conversations are answered from memory
enabled = true
ttl_seconds = 300
max_question_chars = 100
max_entries = 1024

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port

# ─────────────────────────────────────────────────────────────────────────────
# TIMEOUTS (Optional)
# ─────────────────────────────────────────────────────────────────────────────
#
# Seconds, each in (0, 300].

[timeouts]
upstream = 60   # time to the upstream's first response
probe = 5       # mirror liveness probe
metadata = 10   # mirror metadata, oEmbed and search lookups
media = 30      # time to the media host's response headers
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use clap::CommandFactory;
    use std::str::FromStr;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::parse_from(["cinerelay"]);
        assert_eq!(cli.config, "config.toml");
        assert!(cli.command.is_none());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["cinerelay", "--config", "custom.toml"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["cinerelay", "config", "-o", "my-config.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == "my-config.toml"
        ));
    }

    #[test]
    fn template_loads_as_config() {
        let config = Config::from_str(generate_config_template())
            .expect("template should be a valid configuration");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.proxy.instances.len(), 3);
        assert_eq!(config.access.grants[0].identity, "*");
        assert_eq!(config.timeouts.media(), 30);
    }

    #[test]
    fn template_has_all_sections() {
        let template = generate_config_template();
        for section in [
            "[server]",
            "[upstream]",
            "[features]",
            "[youtube]",
            "[proxy]",
            "[access]",
            "[[access.grants]]",
            "[cache]",
            "[observability]",
            "[timeouts]",
        ] {
            assert!(template.contains(section), "missing {}", section);
        }
    }
}
