//! Upstream provider adapters (§4.K).
//!
//! One [`ProviderAdapter`] implementation per wire protocol family. `vllm`, `llamacpp`, and
//! `openrouter` are OpenAI-compatible over the wire and so share [`openai::OpenAiAdapter`] with a
//! different base URL/suffix rather than getting their own modules — grounded in the original,
//! which likewise treats them as OpenAI-protocol variants rather than distinct client classes.

pub mod anthropic;
pub mod common;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::db::ProviderAuthMaterial;
use crate::error::GatewayError;

/// A provider adapter dispatches an already-mapped request body to its upstream and returns
/// either a full response or, for streaming requests, a raw byte stream for the matching
/// [`crate::codec`] parser to decode.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Send `body` (already serialized in this provider's own wire format) to `path` on
    /// `endpoint`, returning the raw upstream byte stream. Callers choose the right
    /// `crate::codec` function to turn it into typed events.
    async fn stream(
        &self,
        endpoint: &str,
        path: &str,
        auth: Option<&ProviderAuthMaterial>,
        body: serde_json::Value,
    ) -> Result<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send + Unpin>, GatewayError>;

    /// Send `body` and wait for the full, non-streamed response.
    async fn send(
        &self,
        endpoint: &str,
        path: &str,
        auth: Option<&ProviderAuthMaterial>,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError>;
}
