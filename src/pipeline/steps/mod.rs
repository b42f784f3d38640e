//! Individual pipeline steps (§4.G): self-contained transforms run in sequence by the input and
//! output pipeline engines.

pub mod cli;
pub mod code_comment;
pub mod context_retriever;
pub mod pii;
pub mod secrets;
pub mod system_prompt;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::pipeline::context::PipelineContext;

/// What a step did to a chunk of text.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Normal case: the (possibly rewritten) text continues through the rest of the pipeline.
    Continue(String),
    /// The step wants to answer the request directly — no upstream call happens, and the rest of
    /// the input pipeline is skipped. Used by the CLI shortcut step (§4.G).
    ShortCircuit(String),
}

/// A single input-pipeline transform. Steps run in registration order; redaction steps
/// (secrets, then PII) run first so downstream steps never see cleartext sensitive data
/// (`original_source`'s `InputPipelineInstance.process_request` redaction-first ordering).
#[async_trait]
pub trait InputStep: Send + Sync {
    fn name(&self) -> &str;
    async fn process(&self, context: &PipelineContext, text: &str) -> Result<StepOutcome, GatewayError>;
}

/// A single output-pipeline transform, applied to accumulated streamed text rather than a whole
/// request body. Output steps never short-circuit — there's no "request" left to answer instead
/// of forwarding.
#[async_trait]
pub trait OutputStep: Send + Sync {
    fn name(&self) -> &str;
    async fn process(&self, context: &PipelineContext, text: &str) -> Result<String, GatewayError>;

    /// How many trailing bytes of the accumulated buffer this step needs to hold back before its
    /// output is safe to release to the client, in case the pattern it looks for spans a chunk
    /// boundary (e.g. a partially-arrived `REDACTED<` marker, or an unclosed fenced code block).
    /// Default is zero: most steps transform whatever text they're given without needing to see
    /// further ahead (§4.F). The engine holds back `max` of every registered step's hint.
    fn holdback_hint(&self) -> usize {
        0
    }
}
