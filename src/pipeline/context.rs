//! Per-request pipeline context (§4.E), threaded through every step.
//!
//! Mirrors `PipelineContext`/`PipelineSensitiveData` in `original_source/.../pipeline/base.py`:
//! one context is built per request, carries the session's redaction manager and an accumulating
//! list of alerts raised by steps, and is torn down (secrets cleaned up) once the response is
//! fully sent.

use std::sync::Arc;

use uuid::Uuid;

use crate::alerts::AlertSink;
use crate::db::AlertSeverity;
use crate::error::GatewayError;
use crate::sensitive_data::SensitiveDataManager;

/// State shared by every step of one request's input and output pipelines.
pub struct PipelineContext {
    pub prompt_id: String,
    pub sensitive_data: SensitiveDataManager,
    alerts: Arc<AlertSink>,
}

impl PipelineContext {
    pub fn new(prompt_id: String, sensitive_data: SensitiveDataManager, alerts: Arc<AlertSink>) -> Self {
        Self { prompt_id, sensitive_data, alerts }
    }

    pub fn session_id(&self) -> Uuid {
        self.sensitive_data.session_id()
    }

    /// Record an alert raised by a step (e.g. a secret or PII match). Never fails the request —
    /// a notification problem shouldn't block the pipeline itself.
    pub async fn notify(
        &self,
        trigger_type: &str,
        severity: AlertSeverity,
        trigger_string: Option<String>,
        code_snippet: Option<String>,
    ) {
        if let Err(err) = self
            .alerts
            .record(self.prompt_id.clone(), trigger_type, severity, trigger_string, code_snippet)
            .await
        {
            log::warn!("failed to record alert for prompt {}: {err}", self.prompt_id);
        }
    }

    /// Release this request's redaction session. Must be called exactly once, after the full
    /// response (streamed or not) has been sent to the client.
    pub async fn finish(self) -> Result<(), GatewayError> {
        self.sensitive_data.secure_cleanup().await;
        Ok(())
    }
}
