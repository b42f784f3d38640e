//! Server-Sent-Events framing, shared by the OpenAI and Anthropic stream codecs.
//!
//! Grounded in `original_source/src/codegate/types/anthropic/_generators.py`'s `get_data_lines`
//! coroutine: an SSE frame is a run of lines terminated by a blank line, and the rest of the
//! gateway only ever cares about the `data:` lines within the run (the `event:` line is parsed
//! separately where a codec needs to dispatch on it).

use bytes::{Buf, Bytes, BytesMut};

/// One logical SSE frame: the event name (absent for OpenAI-style streams, which never send an
/// `event:` line) and the concatenated `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE frame splitter. Feed it raw bytes as they arrive off the wire; it yields
/// complete frames and buffers any trailing partial frame across calls, mirroring how the
/// original's generator buffers partial lines between `yield`s.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and drain every complete frame it now contains. Call with an empty
    /// slice at stream end to flush — any remainder at that point is an incomplete frame, not a
    /// real one, and is discarded rather than returned.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let text = String::from_utf8_lossy(&self.buffer);
            let Some(boundary) = text.find("\n\n").or_else(|| text.find("\r\n\r\n")) else {
                break;
            };
            let sep_len = if text[boundary..].starts_with("\r\n\r\n") { 4 } else { 2 };
            let frame_text = text[..boundary].to_string();
            let consumed = boundary + sep_len;
            drop(text);
            self.buffer.advance(consumed);

            if let Some(frame) = parse_frame(&frame_text) {
                frames.push(frame);
            }
        }

        frames
    }
}

fn parse_frame(block: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start().to_string());
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame { event, data: data_lines.join("\n") })
}

/// Render a single SSE frame back to wire bytes, e.g. after a pipeline step rewrites the payload.
pub fn encode_frame(event: Option<&str>, data: &str) -> Bytes {
    let mut out = String::new();
    if let Some(event) = event {
        out.push_str("event: ");
        out.push_str(event);
        out.push('\n');
    }
    out.push_str("data: ");
    out.push_str(data);
    out.push_str("\n\n");
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_anthropic_style_frame_with_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: message_stop\ndata: {}\n\n");
        assert_eq!(frames, vec![SseFrame { event: Some("message_stop".to_string()), data: "{}".to_string() }]);
    }

    #[test]
    fn decodes_openai_style_frame_without_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: [DONE]\n\n");
        assert_eq!(frames, vec![SseFrame { event: None, data: "[DONE]".to_string() }]);
    }

    #[test]
    fn buffers_partial_frame_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"a\":").is_empty());
        let frames = decoder.feed(b"1}\n\n");
        assert_eq!(frames, vec![SseFrame { event: None, data: "{\"a\":1}".to_string() }]);
    }

    #[test]
    fn joins_multiline_data_with_newline() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: line one\ndata: line two\n\n");
        assert_eq!(frames[0].data, "line one\nline two");
    }

    #[test]
    fn incomplete_trailing_frame_is_discarded_not_returned() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: truncated");
        assert!(frames.is_empty());
    }

    #[test]
    fn encode_frame_roundtrips_through_decoder() {
        let encoded = encode_frame(Some("message_stop"), "{}");
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(&encoded);
        assert_eq!(frames, vec![SseFrame { event: Some("message_stop".to_string()), data: "{}".to_string() }]);
    }
}
