//! Black-box coverage of the Rule Registry + Muxing Router working together end to end:
//! persisted rules -> compiled registry -> router resolution, including repopulation after a
//! mutation (§8 invariants around the registry staying consistent with the store).

use std::sync::Arc;

use async_trait::async_trait;
use codegate::db::{AuthType, InMemoryStore, MuxMatcherType, MuxRule, PersistenceStore, ProviderEndpoint, ProviderType};
use codegate::matchers::{MatchInput, SimilarityOracle};
use codegate::registry::RuleRegistry;
use codegate::router::MuxingRouter;

struct NeverMatchOracle;

#[async_trait]
impl SimilarityOracle for NeverMatchOracle {
    async fn similarity(&self, _persona_id: &str, _text: &str) -> f32 {
        0.0
    }
}

async fn provider(store: &InMemoryStore, id: &str) {
    store
        .upsert_provider_endpoint(ProviderEndpoint {
            id: id.to_string(),
            name: format!("provider-{id}"),
            provider_type: ProviderType::Openai,
            endpoint: "https://example.invalid".to_string(),
            auth_type: AuthType::ApiKey,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn catch_all_is_used_when_no_more_specific_rule_matches() {
    let store = InMemoryStore::new();
    provider(&store, "p1").await;
    store
        .set_mux_rules(
            "w1",
            vec![MuxRule {
                id: "catch-all".to_string(),
                workspace_id: "w1".to_string(),
                provider_id: "p1".to_string(),
                provider_model_name: "gpt-4".to_string(),
                matcher_type: MuxMatcherType::CatchAll,
                matcher_blob: String::new(),
                priority: 0,
            }],
        )
        .await
        .unwrap();

    let registry = Arc::new(RuleRegistry::new());
    registry.repopulate(&store, "w1").await.unwrap();
    let router = MuxingRouter::new(registry, Arc::new(NeverMatchOracle));

    let route = router.route(&store, "w1", &MatchInput::default()).await.unwrap();
    assert_eq!(route.matched_rule_id, "catch-all");
    assert_eq!(route.model_name, "gpt-4");
}

#[tokio::test]
async fn registry_reflects_rule_mutations_only_after_repopulate() {
    let store = InMemoryStore::new();
    provider(&store, "p1").await;
    store
        .set_mux_rules(
            "w1",
            vec![MuxRule {
                id: "r1".to_string(),
                workspace_id: "w1".to_string(),
                provider_id: "p1".to_string(),
                provider_model_name: "gpt-4".to_string(),
                matcher_type: MuxMatcherType::CatchAll,
                matcher_blob: String::new(),
                priority: 0,
            }],
        )
        .await
        .unwrap();

    let registry = Arc::new(RuleRegistry::new());
    registry.repopulate(&store, "w1").await.unwrap();

    // Mutate the store without repopulating: the registry's mirror is stale on purpose, since
    // mutation doesn't auto-subscribe to store changes (callers repopulate explicitly).
    store
        .set_mux_rules(
            "w1",
            vec![MuxRule {
                id: "r2".to_string(),
                workspace_id: "w1".to_string(),
                provider_id: "p1".to_string(),
                provider_model_name: "gpt-4o".to_string(),
                matcher_type: MuxMatcherType::CatchAll,
                matcher_blob: String::new(),
                priority: 0,
            }],
        )
        .await
        .unwrap();

    let stale = registry.rules_for("w1").await;
    assert_eq!(stale[0].rule.id, "r1");

    registry.repopulate(&store, "w1").await.unwrap();
    let fresh = registry.rules_for("w1").await;
    assert_eq!(fresh[0].rule.id, "r2");
}

#[tokio::test]
async fn deleting_provider_cascades_to_mux_rules_and_router_then_fails_closed() {
    let store = InMemoryStore::new();
    provider(&store, "p1").await;
    store
        .set_mux_rules(
            "w1",
            vec![MuxRule {
                id: "r1".to_string(),
                workspace_id: "w1".to_string(),
                provider_id: "p1".to_string(),
                provider_model_name: "gpt-4".to_string(),
                matcher_type: MuxMatcherType::CatchAll,
                matcher_blob: String::new(),
                priority: 0,
            }],
        )
        .await
        .unwrap();

    let registry = Arc::new(RuleRegistry::new());
    registry.repopulate(&store, "w1").await.unwrap();
    let router = MuxingRouter::new(registry.clone(), Arc::new(NeverMatchOracle));
    assert!(router.route(&store, "w1", &MatchInput::default()).await.is_ok());

    store.delete_provider_endpoint("p1").await.unwrap();
    registry.repopulate(&store, "w1").await.unwrap();

    let result = router.route(&store, "w1", &MatchInput::default()).await;
    assert!(result.is_err());
}
