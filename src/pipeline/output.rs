//! Output pipeline engine (§4.F).
//!
//! Applies [`OutputStep`]s to a streamed response as it arrives, buffering text so a step can see
//! across a chunk boundary (e.g. a secret placeholder marker split across two network reads)
//! before committing output to the client. Look-ahead is a *per-step* concern
//! ([`OutputStep::holdback_hint`]): each step declares how many trailing bytes it needs to keep
//! unreleased, and the engine holds back the max of every registered step's hint. With no steps
//! registered (or none that need look-ahead), the holdback is zero and every byte that arrives is
//! forwarded immediately — there is no blanket trailing-window the engine imposes on its own.
//!
//! **Dangling buffer is a bug** (REDESIGN FLAG, §9): when the upstream stream ends, any text
//! still held back in the buffer is logged and discarded, never flushed to the client. A
//! well-formed stream's last chunk always leaves the buffer within a step's own holdback once
//! steps have had a chance to run on it; if more than that remains, something upstream broke the
//! protocol (e.g. an unclosed fenced code block), and silently flushing whatever's left risks
//! truncated or out-of-order structured output reaching the client. Matches
//! `original_source/.../pipeline/output.py`'s `OutputPipelineInstance.process_stream` `finally`
//! block.

use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::GatewayError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::steps::OutputStep;

pub struct OutputPipelineInstance {
    steps: Vec<Box<dyn OutputStep>>,
}

impl OutputPipelineInstance {
    pub fn new(steps: Vec<Box<dyn OutputStep>>) -> Self {
        Self { steps }
    }

    /// Run the pipeline once over a complete, already-fetched response (the non-streaming path).
    /// No holdback is needed since the whole text is available up front; unlike
    /// [`Self::process_stream`], the caller keeps ownership of `context` and must call
    /// `context.finish()` itself once done with it.
    pub async fn process_once(&self, context: &PipelineContext, text: &str) -> Result<String, GatewayError> {
        let mut current = text.to_string();
        for step in &self.steps {
            current = step.process(context, &current).await?;
        }
        Ok(current)
    }

    /// Run the pipeline over a stream of raw text deltas already extracted from the
    /// provider-specific wire format (see [`crate::codec`]). Emits processed text to forward to
    /// the client; the final, possibly-nonempty buffer is never emitted.
    ///
    /// Takes `Arc<Self>` rather than an owned value so callers can keep one pipeline instance
    /// alive across many concurrent requests instead of rebuilding its step list each time.
    pub fn process_stream<S>(
        self: std::sync::Arc<Self>,
        context: PipelineContext,
        deltas: S,
    ) -> impl Stream<Item = Result<String, GatewayError>>
    where
        S: Stream<Item = Result<String, GatewayError>> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let holdback = self.steps.iter().map(|step| step.holdback_hint()).max().unwrap_or(0);

        tokio::spawn(async move {
            let mut buffer = String::new();
            let mut emitted_len = 0usize;
            let mut upstream = Box::pin(deltas);

            while let Some(delta) = upstream.next().await {
                let delta = match delta {
                    Ok(delta) => delta,
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                };
                buffer.push_str(&delta);

                let mut transformed = buffer.clone();
                for step in &self.steps {
                    match step.process(&context, &transformed).await {
                        Ok(next) => transformed = next,
                        Err(err) => {
                            log::warn!("output step {} failed: {err}", step.name());
                            let _ = tx.send(Err(err)).await;
                            return;
                        }
                    }
                }
                buffer = transformed;

                let safe_len = buffer.len().saturating_sub(holdback);
                let safe_len = floor_char_boundary(&buffer, safe_len);
                if safe_len > emitted_len {
                    let chunk = buffer[emitted_len..safe_len].to_string();
                    if tx.send(Ok(chunk)).await.is_err() {
                        return;
                    }
                    emitted_len = safe_len;
                }
            }

            let remainder = &buffer[emitted_len..];
            if !remainder.is_empty() {
                log::warn!(
                    "output pipeline for prompt {} ended with a dangling buffer ({} bytes); discarding rather than flushing",
                    context.prompt_id,
                    remainder.len()
                );
            }
            if let Err(err) = context.finish().await {
                log::warn!("failed to finalize pipeline context: {err}");
            }
        });

        ReceiverStream::new(rx)
    }
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
