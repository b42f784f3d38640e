//! Ollama provider adapter. Typically talks to a local/unauthenticated daemon, so `auth` is
//! usually `None`; honored anyway if a deployment fronts Ollama with its own bearer token.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use crate::db::ProviderAuthMaterial;
use crate::error::GatewayError;
use crate::providers::common::SHARED_HTTP_CLIENT;
use crate::providers::ProviderAdapter;

#[derive(Debug, Default)]
pub struct OllamaAdapter;

impl OllamaAdapter {
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
impl ProviderAdapter for OllamaAdapter {
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
