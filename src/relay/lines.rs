//! Line framing for the upstream event stream
//!
//! Bytes are buffered and split on `\n` before decoding. A newline byte never
//! occurs inside a multi-byte UTF-8 sequence, so a character split across two
//! reads stays in the buffer until its line is complete.

use crate::upstream::types::StreamChunk;

/// Terminal payload of an OpenAI-style event stream
pub const DONE_MARKER: &str = "[DONE]";

/// Rolling buffer of not-yet-terminated bytes
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator (`\n` or `\r\n`)
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        Some(decode_line(line))
    }

    /// The unterminated fragment left at end of stream, if any
    pub fn take_remaining(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(decode_line(std::mem::take(&mut self.pending)))
    }
}

fn decode_line(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    match String::from_utf8(line) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Content fragment carried by one line, if any
///
/// Blank lines, comments, non-`data` fields, the done marker and payloads that
/// are not valid chunk JSON all yield `None`.
pub fn parse_data_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == DONE_MARKER {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk.into_content(),
        Err(e) => {
            tracing::debug!(
                error = %e,
                payload_len = payload.len(),
                "Skipping unparseable stream payload"
            );
            None
        }
    }
}
