//! OpenAI chat/legacy-completion <-> Ollama `/api/chat` and `/api/generate` mapping (§4.B).
//!
//! Grounded in `original_source/src/codegate/muxing/ollama_mappers.py`'s request/response
//! translation helpers, the Ollama sibling of [`super::openai_anthropic`].

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::types::common::Role;
use crate::types::ollama::{ChatRequest, ChatResponseChunk, GenerateRequest, OllamaMessage};
use crate::types::openai::ChatCompletionRequest;

/// Translate an OpenAI chat-completion request into an Ollama `/api/chat` request.
///
/// OpenAI's per-request sampling knobs (`temperature`, `top_p`, `seed`, `frequency_penalty`,
/// `presence_penalty`, `max_tokens`) have no top-level equivalent on Ollama's wire format — they
/// all fold into the `options` map instead, with `max_tokens` renamed to `num_predict` and `stop`
/// always normalized to a list.
pub fn ollama_chat_from_openai(request: &ChatCompletionRequest) -> ChatRequest {
    let messages = request
        .messages
        .iter()
        .map(|message| OllamaMessage { role: message.role, content: content_as_text(&message.content) })
        .collect();

    ChatRequest {
        model: request.model.clone(),
        messages: Some(messages),
        stream: request.stream,
        options: build_options(request),
        format: request.response_format.as_ref().and_then(map_response_format),
        tools: request.tools.as_ref().map(map_tools),
        keep_alive: None,
    }
}

/// Translate a FIM request into an Ollama `/api/generate` request. FIM requests carry no message
/// list the way Ollama expects — the last user turn's text becomes the bare `prompt`.
pub fn ollama_generate_from_openai(request: &ChatCompletionRequest) -> GenerateRequest {
    use crate::types::common::RequestEnvelope;

    GenerateRequest {
        model: request.model.clone(),
        prompt: request.last_user_message(),
        stream: request.stream,
        options: build_options(request),
        format: request.response_format.as_ref().and_then(map_response_format),
        keep_alive: None,
    }
}

fn build_options(request: &ChatCompletionRequest) -> Option<HashMap<String, Value>> {
    let mut options = HashMap::new();

    if let Some(max_tokens) = request.max_tokens.or(request.max_completion_tokens) {
        options.insert("num_predict".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = request.temperature {
        options.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(seed) = request.seed {
        options.insert("seed".to_string(), json!(seed));
    }
    if let Some(top_p) = request.top_p {
        options.insert("top_p".to_string(), json!(top_p));
    }
    if let Some(frequency_penalty) = request.frequency_penalty {
        options.insert("frequency_penalty".to_string(), json!(frequency_penalty));
    }
    if let Some(presence_penalty) = request.presence_penalty {
        options.insert("presence_penalty".to_string(), json!(presence_penalty));
    }
    if let Some(stop) = &request.stop {
        options.insert("stop".to_string(), json!(stop.clone().into_vec()));
    }

    (!options.is_empty()).then_some(options)
}

/// OpenAI's `response_format` (`{"type": "json_object"}` or `{"type": "json_schema", "json_schema": {...}}`)
/// becomes Ollama's `format` field: the bare string `"json"` for the former, the schema object
/// itself for the latter.
fn map_response_format(response_format: &Value) -> Option<Value> {
    match response_format.get("type").and_then(Value::as_str) {
        Some("json_object") => Some(Value::String("json".to_string())),
        Some("json_schema") => response_format.get("json_schema").cloned(),
        _ => None,
    }
}

/// OpenAI and Ollama tool declarations share the same `{type: "function", function: {name,
/// description, parameters}}` shape, so this is effectively a structural pass-through — kept as
/// its own function so a future divergence has one place to change.
fn map_tools(tools: &Value) -> Value {
    tools.clone()
}

fn content_as_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Re-wrap one Ollama `/api/chat` NDJSON chunk as an OpenAI-shaped streaming chunk JSON value,
/// for clients that spoke OpenAI but got muxed to an Ollama-backed model.
pub fn openai_chunk_from_ollama_chat(id: &str, chunk: &ChatResponseChunk) -> Value {
    let finish_reason = if chunk.done { Some("stop") } else { None };
    json!({
        "id": id,
        "model": chunk.model,
        "choices": [{
            "index": 0,
            "delta": {
                "role": matches!(chunk.message.role, Role::Assistant).then_some("assistant"),
                "content": chunk.message.content,
            },
            "finish_reason": finish_reason,
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::common::StopSequences;
    use crate::types::openai::ChatMessage;

    fn chat_message(role: Role, content: &str) -> ChatMessage {
        ChatMessage { role, content: Value::String(content.to_string()), name: None, tool_call_id: None }
    }

    #[test]
    fn sampling_knobs_fold_into_the_options_map() {
        let request = ChatCompletionRequest {
            model: "llama3".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            max_tokens: Some(128),
            temperature: Some(0.4),
            seed: Some(7),
            top_p: Some(0.9),
            frequency_penalty: Some(0.1),
            presence_penalty: Some(0.2),
            stop: Some(StopSequences::Single("STOP".to_string())),
            ..Default::default()
        };
        let mapped = ollama_chat_from_openai(&request);
        let options = mapped.options.expect("options should be populated");
        assert_eq!(options["num_predict"], json!(128));
        assert_eq!(options["temperature"], json!(0.4));
        assert_eq!(options["seed"], json!(7));
        assert_eq!(options["top_p"], json!(0.9));
        assert_eq!(options["frequency_penalty"], json!(0.1));
        assert_eq!(options["presence_penalty"], json!(0.2));
        assert_eq!(options["stop"], json!(["STOP"]));
    }

    #[test]
    fn no_sampling_knobs_means_no_options_map() {
        let request = ChatCompletionRequest {
            model: "llama3".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            ..Default::default()
        };
        assert!(ollama_chat_from_openai(&request).options.is_none());
    }

    #[test]
    fn json_object_response_format_becomes_bare_json_string() {
        let request = ChatCompletionRequest {
            model: "llama3".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            response_format: Some(json!({"type": "json_object"})),
            ..Default::default()
        };
        assert_eq!(ollama_chat_from_openai(&request).format, Some(Value::String("json".to_string())));
    }

    #[test]
    fn json_schema_response_format_carries_the_schema_through() {
        let schema = json!({"name": "Answer", "schema": {"type": "object"}});
        let request = ChatCompletionRequest {
            model: "llama3".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            response_format: Some(json!({"type": "json_schema", "json_schema": schema})),
            ..Default::default()
        };
        assert_eq!(ollama_chat_from_openai(&request).format, Some(schema));
    }

    #[test]
    fn generate_request_uses_last_user_message_as_prompt() {
        let request = ChatCompletionRequest {
            model: "llama3".to_string(),
            messages: vec![chat_message(Role::User, "fn foo(")],
            ..Default::default()
        };
        assert_eq!(ollama_generate_from_openai(&request).prompt, Some("fn foo(".to_string()));
    }

    #[test]
    fn ollama_chat_chunk_becomes_openai_shaped_delta() {
        let chunk = ChatResponseChunk {
            model: "llama3".to_string(),
            message: OllamaMessage { role: Role::Assistant, content: "hi there".to_string() },
            done: false,
        };
        let mapped = openai_chunk_from_ollama_chat("chunk-1", &chunk);
        assert_eq!(mapped["choices"][0]["delta"]["content"], json!("hi there"));
        assert_eq!(mapped["choices"][0]["finish_reason"], Value::Null);
    }

    #[test]
    fn done_chunk_carries_a_stop_finish_reason() {
        let chunk = ChatResponseChunk {
            model: "llama3".to_string(),
            message: OllamaMessage { role: Role::Assistant, content: String::new() },
            done: true,
        };
        let mapped = openai_chunk_from_ollama_chat("chunk-2", &chunk);
        assert_eq!(mapped["choices"][0]["finish_reason"], json!("stop"));
    }
}
