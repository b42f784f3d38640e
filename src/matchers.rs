//! Mux rule matchers (§4.I).
//!
//! Grounded in `original_source/src/codegate/muxing/rulematcher.py`: each matcher variant answers
//! "does this request match?" against a normalized view of the incoming request. `PersonaDesc`
//! matching depends on an external embedding-similarity oracle (summarized per §1/§6) rather than
//! being reimplemented; it's modeled here as a [`SimilarityOracle`] trait so the registry can
//! still be exercised end to end with a deterministic in-test stand-in. The distance-weighting
//! scheme itself — position-weighted minimum distance across every candidate message, most recent
//! weighted heaviest — mirrors `persona.py`'s `match_persona_description` exactly.

use async_trait::async_trait;
use glob::Pattern;

use crate::db::{MuxMatcherType, MuxRule};

/// Enough of an incoming request for a matcher to decide on, independent of which wire protocol
/// it arrived in. `user_messages`/`system_messages` are in conversation order (oldest first), the
/// same ordering `ChatCompletionRequest::user_messages`/`system_messages` and their Anthropic
/// counterparts produce.
#[derive(Debug, Clone, Default)]
pub struct MatchInput {
    pub filename: Option<String>,
    pub is_fim_request: bool,
    pub user_messages: Vec<String>,
    pub system_messages: Vec<String>,
}

/// External similarity-search collaborator behind `PersonaDesc` matchers (§1: embeddings oracle,
/// summarized not reimplemented).
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    /// Similarity score, in `[0.0, 1.0]`, between `text` and the named persona's description.
    async fn similarity(&self, persona_id: &str, text: &str) -> f32;
}

/// Below this weighted distance, a message counts as matching the persona. Mirrors
/// `persona.py`'s `DISTANCE_THRESHOLD`.
pub const PERSONA_DISTANCE_THRESHOLD: f64 = 0.25;

/// Decay applied per message position further back in the conversation: a message `k` positions
/// before the most recent one is weighted `PERSONA_DISTANCE_WEIGHT_FACTOR.powi(k)`, so the most
/// recent message always dominates. Mirrors `persona.py`'s `DISTANCE_WEIGHT_FACTOR` (an Open
/// Question in the distilled spec, resolved by reading the original — see DESIGN.md).
pub const PERSONA_DISTANCE_WEIGHT_FACTOR: f64 = 0.3;

/// A mux rule plus whatever parsed form of its matcher blob it needs to decide matches quickly
/// (e.g. a compiled glob pattern instead of re-parsing the pattern string on every request).
pub enum CompiledMatcher {
    CatchAll,
    FilenameMatch(Pattern),
    RequestTypeAndFilename { fim_only: bool, pattern: Pattern },
    PersonaDescription { persona_id: String },
    SysPromptPersonaDescription { persona_id: String },
}

impl CompiledMatcher {
    pub fn compile(rule: &MuxRule) -> Self {
        match rule.matcher_type {
            MuxMatcherType::CatchAll => CompiledMatcher::CatchAll,
            MuxMatcherType::FilenameMatch => {
                CompiledMatcher::FilenameMatch(Pattern::new(&rule.matcher_blob).unwrap_or(Pattern::new("*").unwrap()))
            }
            MuxMatcherType::FimFilename => CompiledMatcher::RequestTypeAndFilename {
                fim_only: true,
                pattern: Pattern::new(&rule.matcher_blob).unwrap_or(Pattern::new("*").unwrap()),
            },
            MuxMatcherType::ChatFilename => CompiledMatcher::RequestTypeAndFilename {
                fim_only: false,
                pattern: Pattern::new(&rule.matcher_blob).unwrap_or(Pattern::new("*").unwrap()),
            },
            MuxMatcherType::PersonaDescription => {
                CompiledMatcher::PersonaDescription { persona_id: rule.matcher_blob.clone() }
            }
            MuxMatcherType::SysPromptPersonaDesc => {
                CompiledMatcher::SysPromptPersonaDescription { persona_id: rule.matcher_blob.clone() }
            }
        }
    }

    /// Whether this matcher matches `input`, consulting `oracle` only for the persona-description
    /// variants.
    pub async fn matches(&self, input: &MatchInput, oracle: &dyn SimilarityOracle) -> bool {
        match self {
            CompiledMatcher::CatchAll => true,
            CompiledMatcher::FilenameMatch(pattern) => {
                input.filename.as_deref().map(|f| pattern.matches(f)).unwrap_or(false)
            }
            CompiledMatcher::RequestTypeAndFilename { fim_only, pattern } => {
                input.is_fim_request == *fim_only
                    && input.filename.as_deref().map(|f| pattern.matches(f)).unwrap_or(false)
            }
            CompiledMatcher::PersonaDescription { persona_id } => {
                matches_persona_description(persona_id, &input.user_messages, oracle).await
            }
            CompiledMatcher::SysPromptPersonaDescription { persona_id } => {
                matches_persona_description(persona_id, &input.system_messages, oracle).await
            }
        }
    }
}

/// Position-weighted minimum-distance persona match: each candidate message's similarity is
/// converted to a distance `1.0 - similarity`, then divided by a weight that decays going back in
/// time (the most recent message, `position = 0`, is weighted `1.0`; `position = 1` is weighted
/// `PERSONA_DISTANCE_WEIGHT_FACTOR`, and so on), so one strong recent match counts more than
/// several weak old ones. Matches if any message's weighted distance clears the threshold.
async fn matches_persona_description(persona_id: &str, messages: &[String], oracle: &dyn SimilarityOracle) -> bool {
    let len = messages.len();
    for (index, text) in messages.iter().enumerate() {
        let position = (len - 1 - index) as i32;
        let weight = PERSONA_DISTANCE_WEIGHT_FACTOR.powi(position);
        let similarity = oracle.similarity(persona_id, text).await as f64;
        let weighted_distance = (1.0 - similarity) / weight;
        if weighted_distance < PERSONA_DISTANCE_THRESHOLD {
            return true;
        }
    }
    false
}
