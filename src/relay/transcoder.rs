//! Upstream event stream → client event stream
//!
//! State machine: `Streaming → Finishing → Done`, or `Streaming → Errored →
//! Done` when the upstream transport fails mid-stream or goes quiet for longer
//! than the upstream budget.
//!
//! The transcoder is one pull-driven stream. An upstream read happens only
//! when the consumer polls for the next event, and dropping the stream drops
//! the upstream body with it.

use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use super::events::RelayEvent;
use super::lines::{LineBuffer, parse_data_line};
use super::{RelayContext, structure_reply};

/// Message sent to the client when the upstream stream breaks
pub const INTERRUPTED_MESSAGE: &str = "The response stream was interrupted";

/// Message sent to the client when no upstream data arrives within the budget
pub const STALLED_MESSAGE: &str = "The response stream timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Finishing,
    Errored(&'static str),
    Done,
    Closed,
}

type ByteStream<B, E> = Pin<Box<dyn Stream<Item = Result<B, E>> + Send>>;

struct Transcoder<B, E> {
    upstream: ByteStream<B, E>,
    lines: LineBuffer,
    reply: String,
    pending: VecDeque<RelayEvent>,
    phase: Phase,
    ctx: RelayContext,
}

impl<B, E> Transcoder<B, E>
where
    B: AsRef<[u8]>,
    E: Display,
{
    fn handle_line(&mut self, line: &str) {
        if let Some(fragment) = parse_data_line(line) {
            self.reply.push_str(&fragment);
            self.pending.push_back(RelayEvent::content(fragment));
        }
    }

    /// Longest gap allowed between two upstream reads
    fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.ctx.config.timeouts.upstream())
    }

    /// Advance the state machine until an event is ready or the stream closes
    async fn next_event(&mut self) -> Option<RelayEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            match self.phase {
                Phase::Streaming => match tokio::time::timeout(
                    self.idle_timeout(),
                    self.upstream.next(),
                )
                .await
                {
                    Err(_) => {
                        tracing::warn!(
                            request_id = %self.ctx.request_id,
                            timeout_seconds = self.ctx.config.timeouts.upstream(),
                            reply_len = self.reply.len(),
                            "Upstream stream idle past budget"
                        );
                        self.ctx.metrics.mid_stream_failure();
                        self.phase = Phase::Errored(STALLED_MESSAGE);
                    }
                    Ok(Some(Ok(chunk))) => {
                        self.lines.push(chunk.as_ref());
                        while let Some(line) = self.lines.next_line() {
                            self.handle_line(&line);
                        }
                    }
                    Ok(Some(Err(e))) => {
                        tracing::warn!(
                            request_id = %self.ctx.request_id,
                            error = %e,
                            reply_len = self.reply.len(),
                            "Upstream stream failed mid-relay"
                        );
                        self.ctx.metrics.mid_stream_failure();
                        self.phase = Phase::Errored(INTERRUPTED_MESSAGE);
                    }
                    Ok(None) => {
                        if let Some(rest) = self.lines.take_remaining() {
                            self.handle_line(&rest);
                        }
                        self.phase = Phase::Finishing;
                    }
                },
                Phase::Finishing => {
                    self.finish().await;
                    self.phase = Phase::Done;
                }
                Phase::Errored(message) => {
                    self.pending.push_back(RelayEvent::error(message));
                    self.phase = Phase::Done;
                }
                Phase::Done => {
                    self.phase = Phase::Closed;
                    return Some(RelayEvent::Done);
                }
                Phase::Closed => return None,
            }
        }
    }

    async fn finish(&mut self) {
        tracing::debug!(
            request_id = %self.ctx.request_id,
            reply_len = self.reply.len(),
            "Upstream stream complete, structuring reply"
        );

        if let Some(slot) = &self.ctx.cache_slot
            && !self.reply.trim().is_empty()
        {
            slot.cache.set(slot.key.clone(), self.reply.clone()).await;
        }

        let payload = structure_reply(&self.ctx, &self.reply).await;
        if matches!(payload, crate::enrichment::StructuredPayload::VideoLinks(_))
            || !payload.is_empty()
        {
            self.pending.push_back(RelayEvent::from(payload));
        }
    }
}

fn run<B, E>(transcoder: Transcoder<B, E>) -> impl Stream<Item = RelayEvent> + Send
where
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    stream::unfold(transcoder, |mut transcoder| async move {
        let event = transcoder.next_event().await?;
        Some((event, transcoder))
    })
}

/// Relay an upstream byte stream as client events
///
/// Content fragments are forwarded as they arrive; after upstream end of
/// stream the structured event (if any) and the done marker follow.
pub fn transcode<S, B, E>(upstream: S, ctx: RelayContext) -> impl Stream<Item = RelayEvent> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    run(Transcoder {
        upstream: Box::pin(upstream),
        lines: LineBuffer::new(),
        reply: String::new(),
        pending: VecDeque::new(),
        phase: Phase::Streaming,
        ctx,
    })
}

/// Relay an already complete reply (cache hit) as one content event
pub fn replay(reply: String, ctx: RelayContext) -> impl Stream<Item = RelayEvent> + Send {
    let mut pending = VecDeque::new();
    pending.push_back(RelayEvent::content(reply.clone()));

    run(Transcoder::<Vec<u8>, std::convert::Infallible> {
        upstream: Box::pin(stream::empty()),
        lines: LineBuffer::new(),
        reply,
        pending,
        phase: Phase::Finishing,
        ctx: RelayContext {
            cache_slot: None,
            ..ctx
        },
    })
}
