//! System-prompt injection step (§4.G).
//!
//! Prepends a workspace's `custom_instructions` (§3 `Workspace`) ahead of the user's own system
//! prompt, the way the original's `pipeline/systemprompt.py` layers workspace policy on top of
//! whatever the client already sent, rather than replacing it.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::steps::{InputStep, StepOutcome};

/// Prepends fixed workspace instructions to the text it's given. Runs against the system prompt
/// specifically, not the user message — the input pipeline engine is responsible for routing the
/// right text to this step.
pub struct SystemPromptStep {
    custom_instructions: Option<String>,
}

impl SystemPromptStep {
    pub fn new(custom_instructions: Option<String>) -> Self {
        Self { custom_instructions }
    }
}

#[async_trait]
impl InputStep for SystemPromptStep {
    fn name(&self) -> &str {
        "system-prompt-injection"
    }

    async fn process(&self, _context: &PipelineContext, text: &str) -> Result<StepOutcome, GatewayError> {
        let Some(instructions) = &self.custom_instructions else {
            return Ok(StepOutcome::Continue(text.to_string()));
        };
        if text.is_empty() {
            return Ok(StepOutcome::Continue(instructions.clone()));
        }
        Ok(StepOutcome::Continue(format!("{instructions}\n\n{text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertSink;
    use crate::db::InMemoryStore;
    use crate::sensitive_data::SensitiveDataManager;
    use crate::session_store::SessionStore;
    use std::sync::Arc;

    async fn context() -> PipelineContext {
        let sensitive = SensitiveDataManager::new(SessionStore::new()).await;
        let alerts = Arc::new(AlertSink::new(Arc::new(InMemoryStore::new())));
        PipelineContext::new("prompt-1".to_string(), sensitive, alerts)
    }

    #[tokio::test]
    async fn prepends_instructions_ahead_of_existing_prompt() {
        let context = context().await;
        let step = SystemPromptStep::new(Some("always use tabs".to_string()));
        let StepOutcome::Continue(text) = step.process(&context, "be terse").await.unwrap() else {
            panic!("expected Continue")
        };
        assert_eq!(text, "always use tabs\n\nbe terse");
    }

    #[tokio::test]
    async fn no_custom_instructions_is_a_no_op() {
        let context = context().await;
        let step = SystemPromptStep::new(None);
        let StepOutcome::Continue(text) = step.process(&context, "be terse").await.unwrap() else {
            panic!("expected Continue")
        };
        assert_eq!(text, "be terse");
    }
}
