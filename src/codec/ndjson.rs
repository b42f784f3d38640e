//! Newline-delimited-JSON framing for Ollama's streaming responses.
//!
//! Unlike SSE there's no `event:`/`data:` envelope: each line is a complete JSON object, and the
//! stream ends when a line decodes with `"done": true` rather than via a sentinel value.

use bytes::{Buf, BytesMut};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: BytesMut,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and drain every complete line it now contains, parsed as JSON. A line that
    /// fails to parse is skipped rather than propagated — matches the original's tolerant
    /// line-based reader, which only ever expects well-formed lines from a trusted upstream.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);
        let mut values = Vec::new();

        loop {
            let text = String::from_utf8_lossy(&self.buffer);
            let Some(newline) = text.find('\n') else { break };
            let line = text[..newline].trim().to_string();
            let consumed = newline + 1;
            drop(text);
            self.buffer.advance(consumed);

            if line.is_empty() {
                continue;
            }
            if let Ok(value) = serde_json::from_str::<Value>(&line) {
                values.push(value);
            }
        }

        values
    }
}

/// Whether a decoded NDJSON line signals the end of the stream.
pub fn is_done(value: &Value) -> bool {
    value.get("done").and_then(Value::as_bool).unwrap_or(false)
}
