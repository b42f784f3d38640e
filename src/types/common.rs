//! Shapes shared across more than one provider's wire format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    /// OpenAI's newer alias for `system`; folded into the same leading-message handling as
    /// `System` everywhere this crate inspects role (§4.B).
    Developer,
    User,
    Assistant,
    Tool,
}

/// A `stop` field that accepts either a single string or a list of strings on the wire, the way
/// OpenAI's API does. Normalizes to a `Vec<String>` once parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StopSequences {
    Single(String),
    Multiple(Vec<String>),
}

impl StopSequences {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StopSequences::Single(s) => vec![s],
            StopSequences::Multiple(v) => v,
        }
    }
}

/// Token accounting, normalized across providers' differently-named usage fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Reasoning effort as exposed on OpenAI's chat API, mapped to Anthropic's `thinking` budget by
/// [`crate::mappers`] (all three levels collapse to a fixed 1024-token budget, per the original).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// A request body the gateway can inspect without fully committing to one provider's schema —
/// enough surface for the FIM detector and the pipeline's "last user message" helpers to work
/// uniformly across OpenAI, legacy-completion, and Ollama bodies.
pub trait RequestEnvelope {
    fn model(&self) -> &str;
    fn is_stream(&self) -> bool;
    /// Text of the last user-authored message, if any, per the role-skipping rules in §4.G
    /// (Aider's trailing "Ok." continuation, Open Interpreter's synthetic `tool` role).
    fn last_user_message(&self) -> Option<String>;
}
