//! Ollama `/api/chat` and `/api/generate` wire types.
//!
//! Field set follows `original_source/src/codegate/types/ollama/_request_models.py`. Ollama's
//! wire format is NDJSON, not SSE — one JSON object per line, terminated by `done: true` — see
//! [`crate::codec::ndjson`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<OllamaMessage>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// `/api/generate` — takes a bare prompt instead of a message list. FIM requests arrive here
/// (§4.G's FIM analyzer checks this route's body for `<COMPLETION>`/`<QUERY>` markers).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GenerateRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// One NDJSON line of a streamed chat response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponseChunk {
    pub model: String,
    pub message: OllamaMessage,
    pub done: bool,
}

/// One NDJSON line of a streamed generate response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponseChunk {
    pub model: String,
    pub response: String,
    pub done: bool,
}

impl super::common::RequestEnvelope for ChatRequest {
    fn model(&self) -> &str {
        &self.model
    }

    fn is_stream(&self) -> bool {
        self.stream
    }

    fn last_user_message(&self) -> Option<String> {
        let messages = self.messages.as_ref()?;
        let owned: Vec<(Role, Value)> = messages
            .iter()
            .map(|m| (m.role, Value::String(m.content.clone())))
            .collect();
        super::extract_last_user_message(owned.iter().map(|(role, content)| (*role, content)))
    }
}

impl super::common::RequestEnvelope for GenerateRequest {
    fn model(&self) -> &str {
        &self.model
    }

    fn is_stream(&self) -> bool {
        self.stream
    }

    fn last_user_message(&self) -> Option<String> {
        self.prompt.clone()
    }
}
