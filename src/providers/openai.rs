//! OpenAI-compatible provider adapter, shared by `openai`, `vllm`, `llamacpp`, and `openrouter`
//! (§3 `ProviderType`) since they all speak the same bearer-token-authenticated JSON-over-HTTP
//! wire format.
//!
//! # Example
//!
//! ```rust,no_run
//! use codegate::providers::ProviderAdapter;
//! use codegate::providers::openai::OpenAiAdapter;
//!
//! # async fn example() -> Result<(), codegate::error::GatewayError> {
//! let adapter = OpenAiAdapter::new();
//! let body = serde_json::json!({"model": "gpt-4", "messages": []});
//! let response = adapter.send("https://api.openai.com", "/v1/chat/completions", None, body).await?;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use crate::db::ProviderAuthMaterial;
use crate::error::GatewayError;
use crate::providers::common::SHARED_HTTP_CLIENT;
use crate::providers::ProviderAdapter;

#[derive(Debug, Default)]
pub struct OpenAiAdapter;

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self
    }

    fn request(&self, endpoint: &str, path: &str, auth: Option<&ProviderAuthMaterial>) -> reqwest::RequestBuilder {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), path);
        let mut request = SHARED_HTTP_CLIENT.post(url);
        if let Some(auth) = auth {
            request = request.bearer_auth(&auth.auth_blob);
        }
        request
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    async fn stream(
        &self,
        endpoint: &str,
        path: &str,
        auth: Option<&ProviderAuthMaterial>,
        body: Value,
    ) -> Result<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send + Unpin>, GatewayError> {
        let response = self
            .request(endpoint, path, auth)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Upstream { status: 502, message: err.to_string() })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream { status, message });
        }

        Ok(Box::new(response.bytes_stream().boxed()))
    }

    async fn send(
        &self,
        endpoint: &str,
        path: &str,
        auth: Option<&ProviderAuthMaterial>,
        body: Value,
    ) -> Result<Value, GatewayError> {
        let response = self
            .request(endpoint, path, auth)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Upstream { status: 502, message: err.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream { status: status.as_u16(), message });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| GatewayError::Upstream { status: 502, message: err.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    #[tokio::test]
    async fn send_returns_parsed_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({"id": "resp-1"}));
        });

        let adapter = OpenAiAdapter::new();
        let result = adapter
            .send(&server.base_url(), "/v1/chat/completions", None, serde_json::json!({"model": "gpt-4"}))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(result["id"], "resp-1");
    }

    #[tokio::test]
    async fn non_success_status_becomes_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/v1/chat/completions");
            then.status(401).body("invalid api key");
        });

        let adapter = OpenAiAdapter::new();
        let result = adapter
            .send(&server.base_url(), "/v1/chat/completions", None, serde_json::json!({}))
            .await;

        match result {
            Err(GatewayError::Upstream { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected Upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bearer_token_is_attached_when_auth_material_present() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(serde_json::json!({}));
        });

        let adapter = OpenAiAdapter::new();
        let auth = ProviderAuthMaterial {
            provider_id: "p1".to_string(),
            auth_type: crate::db::AuthType::ApiKey,
            auth_blob: "sk-test".to_string(),
        };
        adapter
            .send(&server.base_url(), "/v1/chat/completions", Some(&auth), serde_json::json!({}))
            .await
            .unwrap();

        mock.assert();
    }
}
