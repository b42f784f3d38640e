//! Persisted entity shapes, mirroring `codegate.db.models` from the original implementation.
//!
//! These are the rows the `PersistenceStore` trait reads and writes. They're plain data —
//! behaviour (matching, routing) lives in [`crate::matchers`] and [`crate::registry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, soft-deletable policy container. Exactly one workspace is active process-wide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub custom_instructions: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Workspace {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Upstream provider types the gateway can dispatch to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Openai,
    Anthropic,
    Ollama,
    Vllm,
    Llamacpp,
    Openrouter,
}

impl ProviderType {
    /// Provider-specific path suffix appended to the endpoint URL when muxing (§4.J step 5).
    pub fn base_url_suffix(&self) -> &'static str {
        match self {
            ProviderType::Openai | ProviderType::Vllm => "/v1",
            ProviderType::Openrouter => "/api/v1",
            ProviderType::Llamacpp => "",
            ProviderType::Ollama | ProviderType::Anthropic => "",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    None,
    ApiKey,
}

/// A named upstream endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderEndpoint {
    pub id: String,
    pub name: String,
    pub provider_type: ProviderType,
    pub endpoint: String,
    pub auth_type: AuthType,
}

/// Credential material for a provider, held separately from the endpoint row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderAuthMaterial {
    pub provider_id: String,
    pub auth_type: AuthType,
    pub auth_blob: String,
}

/// A model offered by a provider. Unique on `(provider_id, name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderModel {
    pub provider_id: String,
    pub name: String,
}

/// Kinds of mux matcher, keyed the same way the original's `MuxMatcherType` enum is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MuxMatcherType {
    CatchAll,
    FilenameMatch,
    FimFilename,
    ChatFilename,
    PersonaDescription,
    SysPromptPersonaDesc,
}

/// A single muxing rule row. Priorities within a workspace are dense and strictly ordered;
/// lower number = higher precedence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MuxRule {
    pub id: String,
    pub workspace_id: String,
    pub provider_id: String,
    pub provider_model_name: String,
    pub matcher_type: MuxMatcherType,
    pub matcher_blob: String,
    pub priority: i32,
}

/// A named persona description used by similarity-based matchers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Critical,
}

/// A recorded pipeline alert. Critical alerts also get broadcast for dashboard SSE.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub prompt_id: String,
    pub trigger_type: String,
    pub trigger_category: AlertSeverity,
    pub trigger_string: Option<String>,
    pub code_snippet: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A recorded input prompt, persisted only after redaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub request_type: String,
    pub request: String,
    pub workspace_id: Option<String>,
}

/// A recorded output chunk/response tied to a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Output {
    pub id: String,
    pub prompt_id: String,
    pub timestamp: DateTime<Utc>,
    pub output: String,
}

/// The process-wide active-workspace pointer, tracked as a singleton row (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Session {
    pub active_workspace_id: Option<String>,
}
