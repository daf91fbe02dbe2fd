//! Chat relay
//!
//! Streams completion fragments to the client as they arrive, then turns the
//! accumulated reply into one structured event.

pub mod events;
pub mod lines;
pub mod transcoder;

pub use events::RelayEvent;
pub use lines::{DONE_MARKER, LineBuffer, parse_data_line};
pub use transcoder::{INTERRUPTED_MESSAGE, STALLED_MESSAGE, replay, transcode};

use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::enrichment::{StructuredPayload, enrich};
use crate::extraction::classify;
use crate::metrics::Metrics;
use crate::middleware::RequestId;

/// Where a completed reply should be stored
#[derive(Clone)]
pub struct CacheSlot {
    pub cache: Arc<dyn ResponseCache>,
    pub key: String,
}

/// Request-scoped inputs for structuring a reply
#[derive(Clone)]
pub struct RelayContext {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub metrics: Metrics,
    /// Last user message of the conversation, scanned for video links
    pub user_message: String,
    pub request_id: RequestId,
    pub cache_slot: Option<CacheSlot>,
}

/// Classify a completed reply and run the lookups it calls for
pub async fn structure_reply(ctx: &RelayContext, reply: &str) -> StructuredPayload {
    let extraction = classify(
        &ctx.user_message,
        reply,
        ctx.config.youtube_search_active(),
    );
    let classification = extraction.classification();
    ctx.metrics.record_classification(classification);

    tracing::info!(
        request_id = %ctx.request_id,
        classification = classification.as_str(),
        "Reply classified"
    );

    enrich(extraction, &ctx.config, &ctx.client, &ctx.metrics).await
}
