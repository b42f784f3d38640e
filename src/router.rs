//! Muxing Router (§4.J): the `/v1/mux/{rest}` entry point that picks an upstream provider+model
//! for a request by scanning a workspace's compiled mux rules in priority order and taking the
//! first match.
//!
//! Grounded in `original_source/.../mux/router.py` and `.../muxing/router.py` (the pack carries
//! both an older and a newer version of this file; behavior here follows the newer one: first
//! match wins, rules are pre-sorted by priority so there's no need to sort per request).

use std::sync::Arc;

use crate::db::{PersistenceStore, ProviderEndpoint};
use crate::error::GatewayError;
use crate::matchers::{MatchInput, SimilarityOracle};
use crate::registry::RuleRegistry;

/// A resolved route: which provider endpoint to dispatch to and which of its models to ask for.
#[derive(Debug, Clone)]
pub struct ModelRoute {
    pub provider: ProviderEndpoint,
    pub model_name: String,
    pub matched_rule_id: String,
}

pub struct MuxingRouter {
    registry: Arc<RuleRegistry>,
    oracle: Arc<dyn SimilarityOracle>,
}

impl MuxingRouter {
    pub fn new(registry: Arc<RuleRegistry>, oracle: Arc<dyn SimilarityOracle>) -> Self {
        Self { registry, oracle }
    }

    /// Resolve a route for `input` within `workspace_id`, consulting the persistence store only
    /// to look up the winning rule's provider endpoint.
    pub async fn route(
        &self,
        store: &dyn PersistenceStore,
        workspace_id: &str,
        input: &MatchInput,
    ) -> Result<ModelRoute, GatewayError> {
        let rules = self.registry.rules_for(workspace_id).await;

        for registered in rules.iter() {
            if registered.matcher.matches(input, self.oracle.as_ref()).await {
                let provider = store
                    .get_provider_endpoint(&registered.rule.provider_id)
                    .await?
                    .ok_or_else(|| {
                        GatewayError::Internal(format!(
                            "mux rule {} references missing provider {}",
                            registered.rule.id, registered.rule.provider_id
                        ))
                    })?;
                return Ok(ModelRoute {
                    provider,
                    model_name: registered.rule.provider_model_name.clone(),
                    matched_rule_id: registered.rule.id.clone(),
                });
            }
        }

        Err(GatewayError::NotFound(format!("no mux rule in workspace {workspace_id} matched the request")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AuthType, InMemoryStore, MuxMatcherType, MuxRule, ProviderType};
    use async_trait::async_trait;

    struct NeverMatchOracle;

    #[async_trait]
    impl SimilarityOracle for NeverMatchOracle {
        async fn similarity(&self, _persona_id: &str, _text: &str) -> f32 {
            0.0
        }
    }

    async fn setup() -> (InMemoryStore, Arc<RuleRegistry>) {
        let store = InMemoryStore::new();
        store
            .upsert_provider_endpoint(ProviderEndpoint {
                id: "p1".to_string(),
                name: "openai-prod".to_string(),
                provider_type: ProviderType::Openai,
                endpoint: "https://api.openai.com".to_string(),
                auth_type: AuthType::ApiKey,
            })
            .await
            .unwrap();
        store
            .set_mux_rules(
                "w1",
                vec![
                    MuxRule {
                        id: "fim-rule".to_string(),
                        workspace_id: "w1".to_string(),
                        provider_id: "p1".to_string(),
                        provider_model_name: "gpt-4-fim".to_string(),
                        matcher_type: MuxMatcherType::FimFilename,
                        matcher_blob: "*.py".to_string(),
                        priority: 0,
                    },
                    MuxRule {
                        id: "catch-all".to_string(),
                        workspace_id: "w1".to_string(),
                        provider_id: "p1".to_string(),
                        provider_model_name: "gpt-4".to_string(),
                        matcher_type: MuxMatcherType::CatchAll,
                        matcher_blob: String::new(),
                        priority: 1,
                    },
                ],
            )
            .await
            .unwrap();

        let registry = Arc::new(RuleRegistry::new());
        registry.repopulate(&store, "w1").await.unwrap();
        (store, registry)
    }

    #[tokio::test]
    async fn first_matching_rule_by_priority_wins() {
        let (store, registry) = setup().await;
        let router = MuxingRouter::new(registry, Arc::new(NeverMatchOracle));

        let input = MatchInput { filename: Some("main.py".to_string()), is_fim_request: true, ..Default::default() };
        let route = router.route(&store, "w1", &input).await.unwrap();
        assert_eq!(route.matched_rule_id, "fim-rule");
    }

    #[tokio::test]
    async fn falls_through_to_catch_all_when_specific_rule_does_not_match() {
        let (store, registry) = setup().await;
        let router = MuxingRouter::new(registry, Arc::new(NeverMatchOracle));

        let input = MatchInput { filename: Some("main.rs".to_string()), is_fim_request: false, ..Default::default() };
        let route = router.route(&store, "w1", &input).await.unwrap();
        assert_eq!(route.matched_rule_id, "catch-all");
    }

    #[tokio::test]
    async fn unknown_workspace_yields_not_found() {
        let (store, registry) = setup().await;
        let router = MuxingRouter::new(registry, Arc::new(NeverMatchOracle));

        let result = router.route(&store, "missing-workspace", &MatchInput::default()).await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }
}
