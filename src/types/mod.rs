//! Protocol wire types (§4.A), one module per provider family plus a `common` module for
//! cross-provider shapes. Every request type implements [`common::RequestEnvelope`] so the
//! pipeline and FIM analyzer can inspect a request without committing to one provider's schema.

pub mod anthropic;
pub mod common;
pub mod ollama;
pub mod openai;

use serde_json::Value;

use common::Role;

/// Find the text of the last user-authored message, applying the same role-skipping rules the
/// original's `PipelineStep.get_last_user_message` does (`pipeline/base.py`):
///
/// - Only `user` (and Open Interpreter's synthetic `tool`-role echo of a user turn) messages are
///   candidates; `system`/`assistant` messages are skipped entirely when scanning backward.
/// - Aider appends a trailing `"Ok."` continuation message after its real prompt; when the last
///   user message is exactly `"Ok."`, the scan continues to the previous user message instead.
/// - `content` may be a bare string or a list of content blocks (`[{"type": "text", "text": ...}]`);
///   both are flattened to a single string.
pub fn extract_last_user_message<'a>(
    messages: impl DoubleEndedIterator<Item = (Role, &'a Value)>,
) -> Option<String> {
    for (role, content) in messages.rev() {
        if !matches!(role, Role::User | Role::Tool) {
            continue;
        }
        let text = flatten_content(content);
        if text.trim() == "Ok." {
            continue;
        }
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// Collect every user-authored message's text, oldest first, for the position-weighted persona
/// matching in [`crate::matchers`] (§4.I) — unlike [`extract_last_user_message`] this keeps every
/// candidate rather than just the most recent one, and does not special-case Aider's `"Ok."` echo.
pub fn extract_user_messages<'a>(messages: impl Iterator<Item = (Role, &'a Value)>) -> Vec<String> {
    messages
        .filter(|(role, _)| matches!(role, Role::User | Role::Tool))
        .map(|(_, content)| flatten_content(content))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Collect every leading system/developer message's text, oldest first, matching the same
/// consecutive-leading-messages rule the Anthropic mapper uses (§4.B) — non-leading system
/// messages aren't gathered here since they aren't a coherent "system prompt" candidate.
pub fn extract_system_messages<'a>(messages: impl Iterator<Item = (Role, &'a Value)>) -> Vec<String> {
    messages
        .take_while(|(role, _)| matches!(role, Role::System | Role::Developer))
        .map(|(_, content)| flatten_content(content))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Flatten a message's `content` field, whether it's a bare string or a list of
/// `{"type": "text", "text": ...}` blocks, into plain text.
pub(crate) fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_system_and_assistant_messages() {
        let messages = vec![
            (Role::System, json!("be helpful")),
            (Role::User, json!("hello")),
            (Role::Assistant, json!("hi there")),
        ];
        let refs: Vec<(Role, &Value)> = messages.iter().map(|(r, v)| (*r, v)).collect();
        assert_eq!(extract_last_user_message(refs.into_iter()), Some("hello".to_string()));
    }

    #[test]
    fn skips_trailing_aider_ok_continuation() {
        let messages = vec![(Role::User, json!("fix the bug")), (Role::User, json!("Ok."))];
        let refs: Vec<(Role, &Value)> = messages.iter().map(|(r, v)| (*r, v)).collect();
        assert_eq!(extract_last_user_message(refs.into_iter()), Some("fix the bug".to_string()));
    }

    #[test]
    fn flattens_content_block_list() {
        let messages = vec![(Role::User, json!([{"type": "text", "text": "part one"}, {"type": "text", "text": "part two"}]))];
        let refs: Vec<(Role, &Value)> = messages.iter().map(|(r, v)| (*r, v)).collect();
        assert_eq!(
            extract_last_user_message(refs.into_iter()),
            Some("part one\npart two".to_string())
        );
    }

    #[test]
    fn open_interpreter_tool_role_counts_as_user_turn() {
        let messages = vec![(Role::Tool, json!("ran the command"))];
        let refs: Vec<(Role, &Value)> = messages.iter().map(|(r, v)| (*r, v)).collect();
        assert_eq!(extract_last_user_message(refs.into_iter()), Some("ran the command".to_string()));
    }

    #[test]
    fn no_user_message_returns_none() {
        let messages = vec![(Role::System, json!("be helpful"))];
        let refs: Vec<(Role, &Value)> = messages.iter().map(|(r, v)| (*r, v)).collect();
        assert_eq!(extract_last_user_message(refs.into_iter()), None);
    }

    #[test]
    fn extract_user_messages_keeps_every_candidate_in_order() {
        let messages = vec![
            (Role::User, json!("first")),
            (Role::Assistant, json!("reply")),
            (Role::User, json!("second")),
        ];
        let refs: Vec<(Role, &Value)> = messages.iter().map(|(r, v)| (*r, v)).collect();
        assert_eq!(extract_user_messages(refs.into_iter()), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn extract_system_messages_stops_at_first_non_leading_role() {
        let messages = vec![
            (Role::System, json!("be terse")),
            (Role::Developer, json!("use tabs")),
            (Role::User, json!("hi")),
            (Role::System, json!("never reached")),
        ];
        let refs: Vec<(Role, &Value)> = messages.iter().map(|(r, v)| (*r, v)).collect();
        assert_eq!(
            extract_system_messages(refs.into_iter()),
            vec!["be terse".to_string(), "use tabs".to_string()]
        );
    }
}
