//! Fill-In-the-Middle request detection.
//!
//! Grounded in `original_source/src/codegate/providers/fim_analyzer.py`'s `FIMAnalyzer.is_fim_request`:
//! a three-stage check, each stage short-circuiting the ones after it.
//!
//! 1. Tool-name prefilter: certain clients (Cline, Kodu, Open Interpreter) never send FIM
//!    requests no matter what the body looks like, so check their identifying marker first and
//!    bail out early.
//! 2. URL suffix check: `/completions` and `/api/generate` are FIM by shape alone.
//! 3. Body marker check: the first message/prompt contains all four FIM sentinel tags. This is
//!    an independent `or` alternative to the URL check, not gated by it — a `/chat/completions`
//!    request whose body carries every marker is still FIM.

const FIM_MARKERS: [&str; 4] = ["<COMPLETION>", "</COMPLETION>", "<QUERY>", "</QUERY>"];

/// Tool identifiers that are never FIM regardless of URL or body shape.
const NEVER_FIM_TOOLS: [&str; 3] = ["cline", "kodu", "open interpreter"];

/// Decide whether `path` + `first_message` together constitute a FIM request.
///
/// `user_agent_or_tool` is whatever client-identifying string the gateway has available (a
/// `User-Agent` header, a `tool` field in the body) — pass an empty string if none is available.
pub fn is_fim_request(path: &str, user_agent_or_tool: &str, first_message: &str) -> bool {
    let tool = user_agent_or_tool.to_lowercase();
    if NEVER_FIM_TOOLS.iter().any(|marker| tool.contains(marker)) {
        return false;
    }

    let url_says_fim =
        !path.ends_with("chat/completions") && (path.ends_with("/completions") || path.ends_with("/api/generate"));

    url_says_fim || FIM_MARKERS.iter().all(|marker| first_message.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completions_is_never_fim_even_with_markers() {
        assert!(!is_fim_request("/v1/chat/completions", "", "<COMPLETION>foo</COMPLETION>"));
    }

    #[test]
    fn legacy_completions_with_markers_is_fim() {
        assert!(is_fim_request("/v1/completions", "", "<COMPLETION>foo</COMPLETION>"));
    }

    #[test]
    fn ollama_generate_with_markers_is_fim() {
        assert!(is_fim_request("/api/generate", "", "<QUERY>foo</QUERY>"));
    }

    #[test]
    fn completions_without_markers_is_not_fim() {
        assert!(!is_fim_request("/v1/completions", "", "just finish this sentence"));
    }

    #[test]
    fn known_never_fim_tool_short_circuits_even_with_markers() {
        assert!(!is_fim_request("/v1/completions", "Cline/1.0", "<COMPLETION>foo</COMPLETION>"));
    }

    #[test]
    fn open_interpreter_prefilter_is_case_insensitive() {
        assert!(!is_fim_request("/v1/completions", "Open Interpreter CLI", "<QUERY></QUERY>"));
    }

    #[test]
    fn unrelated_path_is_never_fim() {
        assert!(!is_fim_request("/v1/embeddings", "", "<COMPLETION></COMPLETION>"));
    }

    #[test]
    fn chat_completions_with_all_four_markers_is_still_fim() {
        // The URL check and the body-marker check are independent `or` branches; a chat-shaped
        // route whose body happens to carry every FIM tag is FIM regardless.
        assert!(is_fim_request("/v1/chat/completions", "", "<COMPLETION>foo</COMPLETION><QUERY>bar</QUERY>"));
    }

    #[test]
    fn single_marker_on_an_unrelated_path_is_not_enough() {
        assert!(!is_fim_request("/v1/embeddings", "", "<QUERY>bar</QUERY>"));
    }
}
