//! Context retrieval (§4.G): extracts package names referenced in the user's prompt and checks
//! them against a vector store of known-malicious/archived packages, injecting a warning context
//! block ahead of the prompt when any match.
//!
//! The embeddings-backed vector store itself is an out-of-scope collaborator (§1, same stance as
//! [`crate::matchers::SimilarityOracle`]) — modeled here as [`PackageVectorStore`], a trait the
//! embedder supplies a real implementation of.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::db::AlertSeverity;
use crate::error::GatewayError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::steps::{InputStep, StepOutcome};

/// Why a package was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    Malicious,
    Archived,
}

impl PackageStatus {
    fn label(&self) -> &'static str {
        match self {
            PackageStatus::Malicious => "malicious",
            PackageStatus::Archived => "archived",
        }
    }
}

/// Collaborator that knows whether a package name is a known-bad or known-archived dependency.
/// Backed by an embeddings index in the original; this crate only needs the lookup surface.
#[async_trait]
pub trait PackageVectorStore: Send + Sync {
    async fn lookup(&self, package_name: &str) -> Option<PackageStatus>;
}

lazy_static! {
    /// Matches the package name out of the common import/require forms across the languages
    /// coding assistants most often generate: Python `import`/`from ... import`, JS/TS
    /// `require(...)`/`from "..."`, and Rust `use`.
    static ref IMPORT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?m)^\s*import\s+([A-Za-z0-9_.\-]+)").unwrap(),
        Regex::new(r"(?m)^\s*from\s+([A-Za-z0-9_.\-]+)\s+import").unwrap(),
        Regex::new(r#"require\(\s*['"]([A-Za-z0-9_.@/\-]+)['"]\s*\)"#).unwrap(),
        Regex::new(r#"(?m)^\s*use\s+([A-Za-z0-9_:]+)"#).unwrap(),
    ];
}

/// Extract candidate package names from free-form text containing prose and/or code snippets.
fn extract_package_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    for pattern in IMPORT_PATTERNS.iter() {
        for capture in pattern.captures_iter(text) {
            if let Some(name) = capture.get(1) {
                let top_level = name.as_str().split(['.', ':', '/']).next().unwrap_or(name.as_str());
                let owned = top_level.to_string();
                if !names.contains(&owned) {
                    names.push(owned);
                }
            }
        }
    }
    names
}

pub struct ContextRetrieverStep {
    vector_store: Arc<dyn PackageVectorStore>,
}

impl ContextRetrieverStep {
    pub fn new(vector_store: Arc<dyn PackageVectorStore>) -> Self {
        Self { vector_store }
    }
}

#[async_trait]
impl InputStep for ContextRetrieverStep {
    fn name(&self) -> &str {
        "context-retriever"
    }

    async fn process(&self, context: &PipelineContext, text: &str) -> Result<StepOutcome, GatewayError> {
        let mut findings = Vec::new();
        for package in extract_package_names(text) {
            if let Some(status) = self.vector_store.lookup(&package).await {
                context
                    .notify(
                        "context_retriever",
                        AlertSeverity::Critical,
                        Some(package.clone()),
                        Some(format!("{} package referenced in prompt: {package}", status.label())),
                    )
                    .await;
                findings.push(format!("{package} is a known {} package", status.label()));
            }
        }

        if findings.is_empty() {
            return Ok(StepOutcome::Continue(text.to_string()));
        }

        Ok(StepOutcome::Continue(format!("Context: {}\n\n Query: {text}", findings.join("; "))))
    }
}
