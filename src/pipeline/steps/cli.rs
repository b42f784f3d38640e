//! CLI shortcut step (§4.G).
//!
//! Lets a user type a bare `codegate <subcommand>` prompt and get an answer straight from the
//! gateway, bypassing the upstream provider entirely — handy for "what version is this" or
//! "what workspace am I in" without burning a model call. Grounded in the original's
//! `pipeline/cli/cli.py` dispatch table, backed by this crate's control-plane subset
//! ([`PersistenceStore`] for workspace CRUD, [`RuleRegistry`] for the active-workspace pointer)
//! rather than the full dashboard surface.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{PersistenceStore, Workspace};
use crate::error::GatewayError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::steps::{InputStep, StepOutcome};
use crate::registry::RuleRegistry;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Recognizes `codegate version`, `codegate workspace {list|add|activate|system-prompt}`, and
/// `codegate custom-instructions` as direct commands; everything else passes through untouched.
pub struct CliShortcutStep {
    store: Arc<dyn PersistenceStore>,
    registry: Arc<RuleRegistry>,
}

impl CliShortcutStep {
    pub fn new(store: Arc<dyn PersistenceStore>, registry: Arc<RuleRegistry>) -> Self {
        Self { store, registry }
    }

    async fn dispatch_workspace(&self, args: &[&str]) -> String {
        match args {
            ["list"] => match self.store.list_workspaces(false).await {
                Ok(workspaces) => {
                    let names: Vec<&str> = workspaces.iter().map(|w| w.name.as_str()).collect();
                    format!("workspaces: {}", names.join(", "))
                }
                Err(err) => format!("failed to list workspaces: {err}"),
            },
            ["add", name] => match self.store.get_workspace_by_name(name).await {
                Ok(Some(_)) => format!("workspace {name} already exists"),
                Ok(None) => {
                    let workspace =
                        Workspace { id: Uuid::new_v4().to_string(), name: name.to_string(), custom_instructions: None, deleted_at: None };
                    match self.store.upsert_workspace(workspace).await {
                        Ok(()) => format!("created workspace {name}"),
                        Err(err) => format!("failed to create workspace {name}: {err}"),
                    }
                }
                Err(err) => format!("failed to check workspace {name}: {err}"),
            },
            ["activate", name] => match self.store.get_workspace_by_name(name).await {
                Ok(Some(workspace)) => {
                    if let Err(err) = self.store.set_active_workspace(Some(workspace.id.clone())).await {
                        return format!("failed to activate workspace {name}: {err}");
                    }
                    self.registry.set_active(Some(workspace.id)).await;
                    format!("activated workspace {name}")
                }
                Ok(None) => format!("workspace {name} not found"),
                Err(err) => format!("failed to activate workspace {name}: {err}"),
            },
            ["system-prompt"] => self.active_custom_instructions().await,
            _ => "usage: codegate workspace <list|add <name>|activate <name>|system-prompt>".to_string(),
        }
    }

    async fn active_custom_instructions(&self) -> String {
        let Some(workspace_id) = self.registry.active_workspace().await else {
            return "no active workspace".to_string();
        };
        match self.store.get_workspace(&workspace_id).await {
            Ok(Some(workspace)) => {
                workspace.custom_instructions.unwrap_or_else(|| "(no custom instructions set)".to_string())
            }
            Ok(None) => "active workspace not found".to_string(),
            Err(err) => format!("failed to load active workspace: {err}"),
        }
    }
}

#[async_trait]
impl InputStep for CliShortcutStep {
    fn name(&self) -> &str {
        "cli-shortcut"
    }

    async fn process(&self, _context: &PipelineContext, text: &str) -> Result<StepOutcome, GatewayError> {
        let Some(rest) = text.trim().strip_prefix("codegate ") else {
            return Ok(StepOutcome::Continue(text.to_string()));
        };

        let args: Vec<&str> = rest.split_whitespace().collect();
        let reply = match args.as_slice() {
            ["version"] => format!("CodeGate gateway v{VERSION}"),
            ["workspace", rest @ ..] => self.dispatch_workspace(rest).await,
            ["custom-instructions"] => self.active_custom_instructions().await,
            [other, ..] => format!("unknown codegate command: {other}"),
            [] => "usage: codegate <version|workspace|custom-instructions>".to_string(),
        };
        Ok(StepOutcome::ShortCircuit(reply))
    }
}
