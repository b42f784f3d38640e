//! Persistence collaborator.
//!
//! `codegate`'s original implementation keeps all of this in SQLite behind a hand-rolled query
//! layer. That's explicitly out of scope here (§1): instead we model the shape of that
//! collaborator as a narrow [`PersistenceStore`] trait, the same way the teacher puts
//! `ClientWrapper` and `ToolProtocol` behind trait objects rather than hardcoding one backend.
//! [`InMemoryStore`] is the only implementation, sufficient to drive the Rule Registry and
//! control-plane CRUD in tests and single-process deployments.

pub mod models;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GatewayError;

pub use models::*;

/// Everything the rest of the gateway needs from the relational store.
///
/// Each method group mirrors one table from `spec.md` §3. Implementations must enforce
/// foreign-key cascades themselves (deleting a provider cascades to its mux rules; deleting a
/// workspace cascades to its rules) — callers don't do it for them.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn list_workspaces(&self, include_deleted: bool) -> Result<Vec<Workspace>, GatewayError>;
    async fn get_workspace(&self, id: &str) -> Result<Option<Workspace>, GatewayError>;
    async fn get_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>, GatewayError>;
    async fn upsert_workspace(&self, workspace: Workspace) -> Result<(), GatewayError>;
    async fn soft_delete_workspace(&self, id: &str) -> Result<(), GatewayError>;

    async fn list_provider_endpoints(&self) -> Result<Vec<ProviderEndpoint>, GatewayError>;
    async fn get_provider_endpoint(&self, id: &str) -> Result<Option<ProviderEndpoint>, GatewayError>;
    async fn upsert_provider_endpoint(&self, endpoint: ProviderEndpoint) -> Result<(), GatewayError>;
    async fn delete_provider_endpoint(&self, id: &str) -> Result<(), GatewayError>;

    async fn get_auth_material(&self, provider_id: &str) -> Result<Option<ProviderAuthMaterial>, GatewayError>;
    async fn upsert_auth_material(&self, material: ProviderAuthMaterial) -> Result<(), GatewayError>;

    async fn list_provider_models(&self, provider_id: &str) -> Result<Vec<ProviderModel>, GatewayError>;
    async fn upsert_provider_model(&self, model: ProviderModel) -> Result<(), GatewayError>;

    async fn list_mux_rules(&self, workspace_id: &str) -> Result<Vec<MuxRule>, GatewayError>;
    async fn set_mux_rules(&self, workspace_id: &str, rules: Vec<MuxRule>) -> Result<(), GatewayError>;

    async fn get_persona(&self, id: &str) -> Result<Option<Persona>, GatewayError>;
    async fn list_personas(&self) -> Result<Vec<Persona>, GatewayError>;
    async fn upsert_persona(&self, persona: Persona) -> Result<(), GatewayError>;

    async fn insert_alert(&self, alert: Alert) -> Result<(), GatewayError>;
    async fn list_alerts(&self) -> Result<Vec<Alert>, GatewayError>;

    async fn insert_prompt(&self, prompt: Prompt) -> Result<(), GatewayError>;
    async fn insert_output(&self, output: Output) -> Result<(), GatewayError>;

    async fn get_session(&self) -> Result<Session, GatewayError>;
    async fn set_active_workspace(&self, workspace_id: Option<String>) -> Result<(), GatewayError>;
}

/// In-memory `PersistenceStore`, guarded by one `RwLock` per table. Good enough for tests and a
/// single-process deployment; not meant to survive a restart.
#[derive(Default)]
pub struct InMemoryStore {
    workspaces: RwLock<HashMap<String, Workspace>>,
    provider_endpoints: RwLock<HashMap<String, ProviderEndpoint>>,
    auth_material: RwLock<HashMap<String, ProviderAuthMaterial>>,
    provider_models: RwLock<HashMap<(String, String), ProviderModel>>,
    mux_rules: RwLock<HashMap<String, Vec<MuxRule>>>,
    personas: RwLock<HashMap<String, Persona>>,
    alerts: RwLock<Vec<Alert>>,
    prompts: RwLock<Vec<Prompt>>,
    outputs: RwLock<Vec<Output>>,
    session: RwLock<Session>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryStore {
    async fn list_workspaces(&self, include_deleted: bool) -> Result<Vec<Workspace>, GatewayError> {
        let workspaces = self.workspaces.read().await;
        Ok(workspaces
            .values()
            .filter(|w| include_deleted || !w.is_deleted())
            .cloned()
            .collect())
    }

    async fn get_workspace(&self, id: &str) -> Result<Option<Workspace>, GatewayError> {
        Ok(self.workspaces.read().await.get(id).cloned())
    }

    async fn get_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>, GatewayError> {
        Ok(self
            .workspaces
            .read()
            .await
            .values()
            .find(|w| w.name == name && !w.is_deleted())
            .cloned())
    }

    async fn upsert_workspace(&self, workspace: Workspace) -> Result<(), GatewayError> {
        self.workspaces.write().await.insert(workspace.id.clone(), workspace);
        Ok(())
    }

    async fn soft_delete_workspace(&self, id: &str) -> Result<(), GatewayError> {
        let mut workspaces = self.workspaces.write().await;
        let workspace = workspaces
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("workspace {id} not found")))?;
        workspace.deleted_at = Some(chrono::Utc::now());
        drop(workspaces);
        self.mux_rules.write().await.remove(id);
        Ok(())
    }

    async fn list_provider_endpoints(&self) -> Result<Vec<ProviderEndpoint>, GatewayError> {
        Ok(self.provider_endpoints.read().await.values().cloned().collect())
    }

    async fn get_provider_endpoint(&self, id: &str) -> Result<Option<ProviderEndpoint>, GatewayError> {
        Ok(self.provider_endpoints.read().await.get(id).cloned())
    }

    async fn upsert_provider_endpoint(&self, endpoint: ProviderEndpoint) -> Result<(), GatewayError> {
        self.provider_endpoints
            .write()
            .await
            .insert(endpoint.id.clone(), endpoint);
        Ok(())
    }

    async fn delete_provider_endpoint(&self, id: &str) -> Result<(), GatewayError> {
        self.provider_endpoints.write().await.remove(id);
        self.auth_material.write().await.remove(id);
        self.provider_models
            .write()
            .await
            .retain(|(provider_id, _), _| provider_id != id);
        let mut mux_rules = self.mux_rules.write().await;
        for rules in mux_rules.values_mut() {
            rules.retain(|rule| rule.provider_id != id);
        }
        Ok(())
    }

    async fn get_auth_material(&self, provider_id: &str) -> Result<Option<ProviderAuthMaterial>, GatewayError> {
        Ok(self.auth_material.read().await.get(provider_id).cloned())
    }

    async fn upsert_auth_material(&self, material: ProviderAuthMaterial) -> Result<(), GatewayError> {
        self.auth_material
            .write()
            .await
            .insert(material.provider_id.clone(), material);
        Ok(())
    }

    async fn list_provider_models(&self, provider_id: &str) -> Result<Vec<ProviderModel>, GatewayError> {
        Ok(self
            .provider_models
            .read()
            .await
            .values()
            .filter(|m| m.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn upsert_provider_model(&self, model: ProviderModel) -> Result<(), GatewayError> {
        self.provider_models
            .write()
            .await
            .insert((model.provider_id.clone(), model.name.clone()), model);
        Ok(())
    }

    async fn list_mux_rules(&self, workspace_id: &str) -> Result<Vec<MuxRule>, GatewayError> {
        let mut rules = self
            .mux_rules
            .read()
            .await
            .get(workspace_id)
            .cloned()
            .unwrap_or_default();
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    async fn set_mux_rules(&self, workspace_id: &str, rules: Vec<MuxRule>) -> Result<(), GatewayError> {
        self.mux_rules
            .write()
            .await
            .insert(workspace_id.to_string(), rules);
        Ok(())
    }

    async fn get_persona(&self, id: &str) -> Result<Option<Persona>, GatewayError> {
        Ok(self.personas.read().await.get(id).cloned())
    }

    async fn list_personas(&self) -> Result<Vec<Persona>, GatewayError> {
        Ok(self.personas.read().await.values().cloned().collect())
    }

    async fn upsert_persona(&self, persona: Persona) -> Result<(), GatewayError> {
        self.personas.write().await.insert(persona.id.clone(), persona);
        Ok(())
    }

    async fn insert_alert(&self, alert: Alert) -> Result<(), GatewayError> {
        self.alerts.write().await.push(alert);
        Ok(())
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, GatewayError> {
        Ok(self.alerts.read().await.clone())
    }

    async fn insert_prompt(&self, prompt: Prompt) -> Result<(), GatewayError> {
        self.prompts.write().await.push(prompt);
        Ok(())
    }

    async fn insert_output(&self, output: Output) -> Result<(), GatewayError> {
        self.outputs.write().await.push(output);
        Ok(())
    }

    async fn get_session(&self) -> Result<Session, GatewayError> {
        Ok(self.session.read().await.clone())
    }

    async fn set_active_workspace(&self, workspace_id: Option<String>) -> Result<(), GatewayError> {
        self.session.write().await.active_workspace_id = workspace_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_workspace(id: &str, name: &str) -> Workspace {
        Workspace {
            id: id.to_string(),
            name: name.to_string(),
            custom_instructions: None,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn soft_delete_excludes_from_default_listing() {
        let store = InMemoryStore::new();
        store.upsert_workspace(sample_workspace("w1", "default")).await.unwrap();
        store.soft_delete_workspace("w1").await.unwrap();

        assert!(store.list_workspaces(false).await.unwrap().is_empty());
        assert_eq!(store.list_workspaces(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn soft_delete_cascades_to_mux_rules() {
        let store = InMemoryStore::new();
        store.upsert_workspace(sample_workspace("w1", "default")).await.unwrap();
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

        store.soft_delete_workspace("w1").await.unwrap();
        assert!(store.list_mux_rules("w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_provider_endpoint_cascades_to_models_and_rules() {
        let store = InMemoryStore::new();
        store
            .upsert_provider_model(ProviderModel {
                provider_id: "p1".to_string(),
                name: "gpt-4".to_string(),
            })
            .await
            .unwrap();
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

        store.delete_provider_endpoint("p1").await.unwrap();

        assert!(store.list_provider_models("p1").await.unwrap().is_empty());
        assert!(store.list_mux_rules("w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mux_rules_are_returned_priority_ordered() {
        let store = InMemoryStore::new();
        store
            .set_mux_rules(
                "w1",
                vec![
                    MuxRule {
                        id: "low".to_string(),
                        workspace_id: "w1".to_string(),
                        provider_id: "p1".to_string(),
                        provider_model_name: "m".to_string(),
                        matcher_type: MuxMatcherType::CatchAll,
                        matcher_blob: String::new(),
                        priority: 5,
                    },
                    MuxRule {
                        id: "high".to_string(),
                        workspace_id: "w1".to_string(),
                        provider_id: "p1".to_string(),
                        provider_model_name: "m".to_string(),
                        matcher_type: MuxMatcherType::CatchAll,
                        matcher_blob: String::new(),
                        priority: 0,
                    },
                ],
            )
            .await
            .unwrap();

        let rules = store.list_mux_rules("w1").await.unwrap();
        assert_eq!(rules[0].id, "high");
        assert_eq!(rules[1].id, "low");
    }

    #[tokio::test]
    async fn session_tracks_active_workspace() {
        let store = InMemoryStore::new();
        assert!(store.get_session().await.unwrap().active_workspace_id.is_none());
        store.set_active_workspace(Some("w1".to_string())).await.unwrap();
        assert_eq!(store.get_session().await.unwrap().active_workspace_id, Some("w1".to_string()));
    }
}
