//! Code comment annotation (§4.G): after each complete fenced code block in a streamed response,
//! appends a comment warning about any malicious/archived package the block imports, using the
//! same [`PackageVectorStore`] collaborator [`crate::pipeline::steps::context_retriever`] queries
//! on the input side.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::db::AlertSeverity;
use crate::error::GatewayError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::steps::context_retriever::PackageVectorStore;
use crate::pipeline::steps::OutputStep;

lazy_static! {
    /// A complete fenced code block: opening ``` (with optional language tag), body, closing ```.
    /// Non-greedy so back-to-back blocks are matched individually rather than swallowed into one.
    static ref FENCE_PATTERN: Regex = Regex::new(r"(?s)```[^\n]*\n(.*?)```").unwrap();
    static ref IMPORT_LINE: Regex = Regex::new(r"(?m)^\s*(?:import|from|use)\s+([A-Za-z0-9_.:\-]+)").unwrap();
}

const ANNOTATION_MARKER: &str = "\n<!-- codegate:";

fn packages_in_block(body: &str) -> Vec<String> {
    IMPORT_LINE
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().split(['.', ':']).next().unwrap_or(m.as_str()).to_string())
        .collect()
}

/// Appends a warning comment immediately after each completed fenced code block that imports a
/// flagged package. Holds back enough trailing bytes that a fence opener already in the buffer
/// isn't emitted before its matching closer (and the annotation it might carry) has arrived.
pub struct CodeCommentStep {
    vector_store: Arc<dyn PackageVectorStore>,
}

impl CodeCommentStep {
    pub fn new(vector_store: Arc<dyn PackageVectorStore>) -> Self {
        Self { vector_store }
    }
}

#[async_trait]
impl OutputStep for CodeCommentStep {
    fn name(&self) -> &str {
        "code-comment"
    }

    async fn process(&self, context: &PipelineContext, text: &str) -> Result<String, GatewayError> {
        let mut rewritten = text.to_string();
        let mut offset = 0i64;

        for capture in FENCE_PATTERN.captures_iter(text) {
            let whole = capture.get(0).unwrap();
            let body = capture.get(1).unwrap().as_str();
            let insert_at = (whole.end() as i64 + offset) as usize;

            if rewritten[insert_at..].starts_with(ANNOTATION_MARKER) {
                continue;
            }

            let mut warnings = Vec::new();
            for package in packages_in_block(body) {
                if let Some(status) = self.vector_store.lookup(&package).await {
                    let label = match status {
                        crate::pipeline::steps::context_retriever::PackageStatus::Malicious => "malicious",
                        crate::pipeline::steps::context_retriever::PackageStatus::Archived => "archived",
                    };
                    context
                        .notify(
                            "code_comment",
                            AlertSeverity::Critical,
                            Some(package.clone()),
                            Some(format!("{label} package referenced in generated code: {package}")),
                        )
                        .await;
                    warnings.push(format!("{package} ({label})"));
                }
            }

            if warnings.is_empty() {
                continue;
            }
            let comment = format!("{ANNOTATION_MARKER} flagged packages - {} -->", warnings.join(", "));
            rewritten.insert_str(insert_at, &comment);
            offset += comment.len() as i64;
        }

        Ok(rewritten)
    }

    fn holdback_hint(&self) -> usize {
        // generous bound on a realistic fenced code block's size, so a block isn't released
        // before its closing fence (and the annotation that might follow it) has arrived.
        512
    }
}
