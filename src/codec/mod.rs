//! Stream codecs (§4.A): turn a raw upstream byte stream into a `Stream` of typed protocol
//! events.
//!
//! Grounded in the "coroutine or channel-backed iterator" note in the original spec's design
//! notes and the teacher's `tokio-stream` dependency (`mcp/Cargo.toml`): a background task reads
//! the byte stream incrementally, decodes complete frames with the relevant framing decoder, and
//! pushes typed values onto an `mpsc` channel. `ReceiverStream` turns the receiving half back into
//! a `Stream` for callers, the same role Python's `async for chunk in generator` plays in
//! `_generators.py`.

pub mod ndjson;
pub mod sse;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::GatewayError;
use crate::types::anthropic::StreamEvent as AnthropicEvent;
use crate::types::ollama;
use crate::types::openai::ChatCompletionChunk;

const CHANNEL_CAPACITY: usize = 64;

/// Parse an Anthropic SSE byte stream into typed [`AnthropicEvent`]s. Stops at the first terminal
/// event (`message_stop`/`error`) or when the upstream stream ends, whichever comes first.
pub fn anthropic_event_stream<S>(bytes: S) -> impl Stream<Item = Result<AnthropicEvent, GatewayError>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut decoder = sse::SseDecoder::new();
        let mut upstream = Box::pin(bytes);

        while let Some(chunk) = upstream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = tx.send(Err(GatewayError::Upstream { status: 502, message: err.to_string() })).await;
                    return;
                }
            };

            for frame in decoder.feed(&chunk) {
                match serde_json::from_str::<AnthropicEvent>(&frame.data) {
                    Ok(event) => {
                        let terminal = event.is_terminal();
                        if tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                        if terminal {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx
                            .send(Err(GatewayError::Pipeline(format!("malformed anthropic event: {err}"))))
                            .await;
                        return;
                    }
                }
            }
        }
    });

    ReceiverStream::new(rx)
}

/// Parse an OpenAI-style SSE byte stream into typed [`ChatCompletionChunk`]s. Terminates on the
/// literal `data: [DONE]` sentinel (no `event:` line is ever sent).
pub fn openai_chunk_stream<S>(bytes: S) -> impl Stream<Item = Result<ChatCompletionChunk, GatewayError>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut decoder = sse::SseDecoder::new();
        let mut upstream = Box::pin(bytes);

        while let Some(chunk) = upstream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = tx.send(Err(GatewayError::Upstream { status: 502, message: err.to_string() })).await;
                    return;
                }
            };

            for frame in decoder.feed(&chunk) {
                if frame.data.trim() == "[DONE]" {
                    return;
                }
                match serde_json::from_str::<ChatCompletionChunk>(&frame.data) {
                    Ok(parsed) => {
                        if tx.send(Ok(parsed)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx
                            .send(Err(GatewayError::Pipeline(format!("malformed openai chunk: {err}"))))
                            .await;
                        return;
                    }
                }
            }
        }
    });

    ReceiverStream::new(rx)
}

/// Parse an Ollama NDJSON byte stream into typed chat-response chunks. Terminates on the first
/// line with `"done": true`.
pub fn ollama_chat_stream<S>(bytes: S) -> impl Stream<Item = Result<ollama::ChatResponseChunk, GatewayError>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut decoder = ndjson::NdjsonDecoder::new();
        let mut upstream = Box::pin(bytes);

        while let Some(chunk) = upstream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = tx.send(Err(GatewayError::Upstream { status: 502, message: err.to_string() })).await;
                    return;
                }
            };

            for value in decoder.feed(&chunk) {
                let done = ndjson::is_done(&value);
                match serde_json::from_value::<ollama::ChatResponseChunk>(value) {
                    Ok(parsed) => {
                        if tx.send(Ok(parsed)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx
                            .send(Err(GatewayError::Pipeline(format!("malformed ollama chunk: {err}"))))
                            .await;
                        return;
                    }
                }
                if done {
                    return;
                }
            }
        }
    });

    ReceiverStream::new(rx)
}
