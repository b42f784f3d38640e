//! Crate-wide error taxonomy.
//!
//! Mirrors the gateway's error handling design: every fallible operation returns
//! [`GatewayError`], which axum converts into the HTTP status/body the client expects.
//! Pipeline steps use [`GatewayError::Pipeline`] specifically, since the engine converts
//! that variant into a protocol-appropriate wire error frame instead of a bare HTTP response.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Taxonomy of errors the gateway can produce, from §7 of the design.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Malformed body or unknown field in a client request.
    BadRequest(String),
    /// Missing or invalid upstream credential.
    Unauthorized(String),
    /// Credential present but insufficient.
    Forbidden(String),
    /// Unknown workspace, no matching mux rule, unknown model.
    NotFound(String),
    /// Workspace name collision, or an already-active workspace.
    Conflict(String),
    /// Non-2xx response from an upstream provider. Carries the upstream status so it can be
    /// propagated rather than papered over.
    Upstream { status: u16, message: String },
    /// A pipeline step raised during processing. Terminates the stream with a protocol-specific
    /// error frame; never produces a partial response containing cleartext secrets.
    Pipeline(String),
    /// Anything else. Full detail is logged; clients only see a generic message.
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            GatewayError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            GatewayError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            GatewayError::NotFound(msg) => write!(f, "not found: {}", msg),
            GatewayError::Conflict(msg) => write!(f, "conflict: {}", msg),
            GatewayError::Upstream { status, message } => {
                write!(f, "upstream error ({}): {}", status, message)
            }
            GatewayError::Pipeline(msg) => write!(f, "pipeline error: {}", msg),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// HTTP status this error maps to on the control-plane and downstream surfaces.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render this error as the wire error frame for the given protocol.
    ///
    /// Redaction placeholders are never substituted back in on an error path: the message
    /// carried here must already be safe to show the client.
    pub fn to_anthropic_frame(&self) -> String {
        let body = json!({
            "type": "error",
            "error": { "type": "api_error", "message": self.to_string() }
        });
        format!("event: error\ndata: {}\n\n", body)
    }

    pub fn to_openai_frame(&self) -> String {
        let body = json!({ "error": { "message": self.to_string(), "type": "api_error" } });
        format!("data: {}\n\n", body)
    }

    pub fn to_ollama_frame(&self) -> String {
        json!({ "error": self.to_string() }).to_string()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if matches!(self, GatewayError::Internal(_)) {
            log::error!("internal error: {}", self);
        }
        let public_message = match &self {
            GatewayError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (self.status_code(), json!({ "error": public_message }).to_string()).into_response()
    }
}
