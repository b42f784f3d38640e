//! Rule Registry (§4.H): an atomically-swappable in-memory mirror of each workspace's persisted
//! mux rules.
//!
//! Grounded in `original_source/.../muxing/rulematcher.py`'s `MuxingRulesinWorkspaces`, which
//! guards its whole rule map behind one `asyncio.Lock` and deep-copies on read so a matcher
//! evaluating a rule list never observes a concurrent mutation mid-scan. The Rust equivalent is a
//! `tokio::sync::RwLock<HashMap<...>>`: readers (every incoming request) take the read lock and
//! clone the `Arc<Vec<_>>` for their workspace, writers (rule CRUD) take the write lock only for
//! the swap itself, grounded in the teacher's `UnifiedMcpServer` tool registry pattern.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::{MuxRule, PersistenceStore};
use crate::error::GatewayError;
use crate::matchers::CompiledMatcher;

/// One compiled rule plus the raw row it came from, kept together so the router can report which
/// rule matched without recompiling.
pub struct RegisteredRule {
    pub rule: MuxRule,
    pub matcher: CompiledMatcher,
}

/// In-memory mirror of every workspace's mux rules, kept in priority order, plus the
/// process-wide active-workspace pointer (§4.H's `{ activeWorkspace, rules }` shape).
#[derive(Default)]
pub struct RuleRegistry {
    by_workspace: RwLock<HashMap<String, Arc<Vec<RegisteredRule>>>>,
    active_workspace: RwLock<Option<String>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild this workspace's compiled rule list from the persistence store. Called after any
    /// mutation to that workspace's rules (create/update/delete/reorder), and once at startup for
    /// every workspace.
    pub async fn repopulate(&self, store: &dyn PersistenceStore, workspace_id: &str) -> Result<(), GatewayError> {
        let rules = store.list_mux_rules(workspace_id).await?;
        let compiled: Vec<RegisteredRule> = rules
            .into_iter()
            .map(|rule| {
                let matcher = CompiledMatcher::compile(&rule);
                RegisteredRule { rule, matcher }
            })
            .collect();

        self.by_workspace.write().await.insert(workspace_id.to_string(), Arc::new(compiled));
        Ok(())
    }

    /// Drop a workspace from the mirror entirely, e.g. on workspace deletion.
    pub async fn evict(&self, workspace_id: &str) {
        self.by_workspace.write().await.remove(workspace_id);
    }

    /// Snapshot of a workspace's compiled rules in priority order. Cheap: clones an `Arc`, not the
    /// underlying `Vec`.
    pub async fn rules_for(&self, workspace_id: &str) -> Arc<Vec<RegisteredRule>> {
        self.by_workspace
            .read()
            .await
            .get(workspace_id)
            .cloned()
            .unwrap_or_default()
    }

    /// `SetActive(ws)` (§4.H): record which workspace is active process-wide.
    pub async fn set_active(&self, workspace_id: Option<String>) {
        *self.active_workspace.write().await = workspace_id;
    }

    /// The workspace `SetActive` last recorded, if any.
    pub async fn active_workspace(&self) -> Option<String> {
        self.active_workspace.read().await.clone()
    }

    /// `Registries()` (§4.H): the workspace ids currently mirrored in this registry.
    pub async fn registries(&self) -> Vec<String> {
        self.by_workspace.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, MuxMatcherType};

    fn rule(id: &str, priority: i32) -> MuxRule {
        MuxRule {
            id: id.to_string(),
            workspace_id: "w1".to_string(),
            provider_id: "p1".to_string(),
            provider_model_name: "m".to_string(),
            matcher_type: MuxMatcherType::CatchAll,
            matcher_blob: String::new(),
            priority,
        }
    }

    #[tokio::test]
    async fn repopulate_mirrors_store_state() {
        let store = InMemoryStore::new();
        store.set_mux_rules("w1", vec![rule("r1", 0)]).await.unwrap();

        let registry = RuleRegistry::new();
        registry.repopulate(&store, "w1").await.unwrap();

        let rules = registry.rules_for("w1").await;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule.id, "r1");
    }

    #[tokio::test]
    async fn repopulate_after_mutation_reflects_new_state() {
        let store = InMemoryStore::new();
        store.set_mux_rules("w1", vec![rule("r1", 0)]).await.unwrap();
        let registry = RuleRegistry::new();
        registry.repopulate(&store, "w1").await.unwrap();

        store.set_mux_rules("w1", vec![rule("r2", 0), rule("r1", 1)]).await.unwrap();
        registry.repopulate(&store, "w1").await.unwrap();

        let rules = registry.rules_for("w1").await;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule.id, "r2");
    }

    #[tokio::test]
    async fn unknown_workspace_returns_empty_rule_list() {
        let registry = RuleRegistry::new();
        assert!(registry.rules_for("missing").await.is_empty());
    }

    #[tokio::test]
    async fn evict_removes_workspace_from_mirror() {
        let store = InMemoryStore::new();
        store.set_mux_rules("w1", vec![rule("r1", 0)]).await.unwrap();
        let registry = RuleRegistry::new();
        registry.repopulate(&store, "w1").await.unwrap();

        registry.evict("w1").await;
        assert!(registry.rules_for("w1").await.is_empty());
    }

    #[tokio::test]
    async fn set_active_then_active_workspace_roundtrips() {
        let registry = RuleRegistry::new();
        assert_eq!(registry.active_workspace().await, None);
        registry.set_active(Some("w1".to_string())).await;
        assert_eq!(registry.active_workspace().await, Some("w1".to_string()));
    }

    #[tokio::test]
    async fn registries_lists_mirrored_workspaces() {
        let store = InMemoryStore::new();
        store.set_mux_rules("w1", vec![rule("r1", 0)]).await.unwrap();
        store.set_mux_rules("w2", vec![rule("r2", 0)]).await.unwrap();
        let registry = RuleRegistry::new();
        registry.repopulate(&store, "w1").await.unwrap();
        registry.repopulate(&store, "w2").await.unwrap();

        let mut registries = registry.registries().await;
        registries.sort();
        assert_eq!(registries, vec!["w1".to_string(), "w2".to_string()]);
    }
}
