//! Protocol mappers (§4.B): translate a request/response between wire formats so a client
//! speaking one protocol can be routed to a provider speaking another.
//!
//! Field-level rules (default `max_tokens`, `reasoning_effort` → `thinking` budget, model name
//! fallbacks) follow `original_source/src/codegate/muxing/anthropic_mappers.py` literally.

pub mod openai_anthropic;
pub mod openai_ollama;

/// Anthropic's default `max_tokens` when a client omits it, per `map_max_tokens` in the original.
pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Every `reasoning_effort` level collapses to this fixed `thinking` budget in the original's
/// `map_reasoning_effort` — Anthropic doesn't have a three-tier equivalent, so low/medium/high
/// all get the same budget rather than inventing a scale that doesn't exist upstream.
pub const REASONING_EFFORT_THINKING_BUDGET: u32 = 1024;

/// Hardcoded OpenAI model name -> Anthropic model name fallback table, from `map_model` in the
/// original. Used only when no mux rule already pinned an explicit upstream model name.
pub fn map_model_name(openai_model: &str) -> &str {
    match openai_model {
        "gpt-4" | "gpt-4-turbo" | "gpt-4o" => "claude-3-5-sonnet-latest",
        "gpt-4o-mini" | "gpt-3.5-turbo" => "claude-3-5-haiku-latest",
        other => other,
    }
}
