//! OpenAI chat/legacy-completion <-> Anthropic Messages mapping.
//!
//! Grounded in `original_source/src/codegate/muxing/anthropic_mappers.py`'s
//! `anthropic_from_openai` / `anthropic_from_legacy_openai` and the stream re-wrapping helpers
//! alongside them.

use serde_json::{json, Value};

use super::{map_model_name, DEFAULT_ANTHROPIC_MAX_TOKENS, REASONING_EFFORT_THINKING_BUDGET};
use crate::types::anthropic::{AnthropicMessage, MessagesRequest, ThinkingConfig};
use crate::types::common::{ReasoningEffort, Role, StopSequences};
use crate::types::openai::{ChatCompletionRequest, LegacyCompletionRequest};

/// Translate an OpenAI chat-completion request into an Anthropic Messages request.
///
/// - All *consecutive leading* `system`/`developer` messages, if any, are concatenated into
///   Anthropic's dedicated `system` field rather than staying inline in `messages` (Anthropic has
///   no `system`/`developer` role in the message list). A `system`/`developer` message that isn't
///   part of that leading run is dropped rather than leaked into `messages`, where Anthropic would
///   reject it.
/// - `max_tokens` defaults to 4096 when the client didn't set one — OpenAI makes it optional,
///   Anthropic requires it.
/// - `stop` (string or list) normalizes to Anthropic's always-a-list `stop_sequences`.
/// - `reasoning_effort`, at any level, maps to a fixed 1024-token `thinking` budget.
pub fn anthropic_from_openai(request: &ChatCompletionRequest) -> MessagesRequest {
    let mut rest = request.messages.as_slice();
    let mut system_parts = Vec::new();
    while let Some(message) = rest.first() {
        if !matches!(message.role, Role::System | Role::Developer) {
            break;
        }
        system_parts.push(content_as_text(&message.content));
        rest = &rest[1..];
    }
    let system = (!system_parts.is_empty()).then(|| Value::String(system_parts.join("\n\n")));

    let mut messages = Vec::with_capacity(rest.len());
    for message in rest {
        if matches!(message.role, Role::System | Role::Developer) {
            log::warn!("dropping non-leading system/developer message; Anthropic has no system role in the message list");
            continue;
        }
        messages.push(AnthropicMessage { role: message.role, content: message.content.clone() });
    }

    MessagesRequest {
        model: map_model_name(&request.model).to_string(),
        messages,
        system,
        max_tokens: request.max_tokens.or(request.max_completion_tokens).unwrap_or(DEFAULT_ANTHROPIC_MAX_TOKENS),
        metadata: None,
        stop_sequences: request.stop.clone().map(StopSequences::into_vec),
        stream: request.stream,
        temperature: request.temperature,
        thinking: request.reasoning_effort.map(map_reasoning_effort),
        tool_choice: request.tool_choice.clone(),
        tools: request.tools.clone(),
        top_k: None,
        top_p: request.top_p,
    }
}

/// Translate an OpenAI legacy `/v1/completions` request into an Anthropic Messages request, by
/// wrapping the bare prompt string as a single user turn.
pub fn anthropic_from_legacy_openai(request: &LegacyCompletionRequest) -> MessagesRequest {
    MessagesRequest {
        model: map_model_name(&request.model).to_string(),
        messages: vec![AnthropicMessage { role: Role::User, content: Value::String(request.prompt.clone()) }],
        system: None,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_ANTHROPIC_MAX_TOKENS),
        metadata: None,
        stop_sequences: request.stop.clone().map(StopSequences::into_vec),
        stream: request.stream,
        temperature: request.temperature,
        thinking: None,
        tool_choice: None,
        tools: None,
        top_k: None,
        top_p: request.top_p,
    }
}

fn map_reasoning_effort(_effort: ReasoningEffort) -> ThinkingConfig {
    ThinkingConfig { kind: "enabled".to_string(), budget_tokens: REASONING_EFFORT_THINKING_BUDGET }
}

/// Render a message's `content` as plain text for joining into Anthropic's `system` string.
fn content_as_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Re-wrap one Anthropic `content_block_delta` text event as an OpenAI-shaped streaming chunk
/// JSON value, for clients that spoke OpenAI but got muxed to an Anthropic-backed model.
pub fn openai_chunk_from_anthropic_text_delta(id: &str, model: &str, text: &str) -> Value {
    json!({
        "id": id,
        "model": model,
        "choices": [{
            "index": 0,
            "delta": { "content": text },
            "finish_reason": Value::Null,
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::openai::ChatMessage;

    fn chat_message(role: Role, content: &str) -> ChatMessage {
        ChatMessage { role, content: Value::String(content.to_string()), name: None, tool_call_id: None }
    }

    #[test]
    fn system_message_becomes_dedicated_system_field() {
        let request = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![chat_message(Role::System, "be concise"), chat_message(Role::User, "hi")],
            ..Default::default()
        };
        let mapped = anthropic_from_openai(&request);
        assert_eq!(mapped.system, Some(Value::String("be concise".to_string())));
        assert_eq!(mapped.messages.len(), 1);
    }

    #[test]
    fn missing_max_tokens_defaults_to_4096() {
        let request = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            ..Default::default()
        };
        let mapped = anthropic_from_openai(&request);
        assert_eq!(mapped.max_tokens, 4096);
    }

    #[test]
    fn explicit_max_tokens_is_preserved() {
        let request = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            max_tokens: Some(512),
            ..Default::default()
        };
        assert_eq!(anthropic_from_openai(&request).max_tokens, 512);
    }

    #[test]
    fn stop_string_normalizes_to_single_element_list() {
        let request = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            stop: Some(StopSequences::Single("STOP".to_string())),
            ..Default::default()
        };
        assert_eq!(anthropic_from_openai(&request).stop_sequences, Some(vec!["STOP".to_string()]));
    }

    #[test]
    fn reasoning_effort_maps_to_fixed_thinking_budget() {
        for effort in [ReasoningEffort::Low, ReasoningEffort::Medium, ReasoningEffort::High] {
            let request = ChatCompletionRequest {
                model: "gpt-4".to_string(),
                messages: vec![chat_message(Role::User, "hi")],
                reasoning_effort: Some(effort),
                ..Default::default()
            };
            let thinking = anthropic_from_openai(&request).thinking.unwrap();
            assert_eq!(thinking.budget_tokens, 1024);
        }
    }

    #[test]
    fn unknown_model_name_passes_through_unchanged() {
        let request = ChatCompletionRequest {
            model: "some-custom-model".to_string(),
            messages: vec![chat_message(Role::User, "hi")],
            ..Default::default()
        };
        assert_eq!(anthropic_from_openai(&request).model, "some-custom-model");
    }

    #[test]
    fn consecutive_leading_system_and_developer_messages_are_concatenated() {
        let request = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![
                chat_message(Role::System, "be concise"),
                chat_message(Role::Developer, "use tabs"),
                chat_message(Role::User, "hi"),
            ],
            ..Default::default()
        };
        let mapped = anthropic_from_openai(&request);
        assert_eq!(mapped.system, Some(Value::String("be concise\n\nuse tabs".to_string())));
        assert_eq!(mapped.messages.len(), 1);
    }

    #[test]
    fn non_leading_system_message_is_dropped_not_leaked_into_messages() {
        let request = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![
                chat_message(Role::System, "be concise"),
                chat_message(Role::User, "hi"),
                chat_message(Role::System, "injected later"),
                chat_message(Role::Assistant, "hello"),
            ],
            ..Default::default()
        };
        let mapped = anthropic_from_openai(&request);
        assert_eq!(mapped.system, Some(Value::String("be concise".to_string())));
        assert_eq!(mapped.messages.len(), 2);
        assert!(mapped.messages.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn legacy_completion_wraps_prompt_as_single_user_message() {
        let request = LegacyCompletionRequest { model: "gpt-4".to_string(), prompt: "continue this".to_string(), ..Default::default() };
        let mapped = anthropic_from_legacy_openai(&request);
        assert_eq!(mapped.messages.len(), 1);
        assert_eq!(mapped.messages[0].role, Role::User);
        assert_eq!(mapped.messages[0].content, Value::String("continue this".to_string()));
        assert_eq!(mapped.max_tokens, 4096);
    }
}
