//! Cinerelay - streaming recommendation chat relay with a YouTube edge proxy
//!
//! Relays chat completions from an OpenAI-compatible upstream to the caller,
//! extracts movie or video recommendations from the finished reply, enriches
//! them with YouTube metadata, and proxies video metadata and media bytes
//! through a pool of public mirrors.

pub mod access;
pub mod cache;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod extraction;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod proxy;
pub mod relay;
pub mod shared;
pub mod telemetry;
pub mod upstream;
