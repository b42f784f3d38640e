//! Shared HTTP plumbing for provider adapters.
//!
//! Grounded in `cloudllm::clients::common`: one process-wide `reqwest::Client` behind
//! `lazy_static`, tuned the same way (`pool_idle_timeout`, `pool_max_idle_per_host`,
//! `tcp_keepalive`) so every adapter reuses connections instead of paying a new TLS handshake per
//! request.

use std::time::Duration;

use lazy_static::lazy_static;
use reqwest::Client;

lazy_static! {
    pub static ref SHARED_HTTP_CLIENT: Client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .expect("building the shared reqwest client with static config cannot fail");
}

/// Build the upstream URL for a given provider endpoint + path, applying the provider's base-URL
/// suffix (§3 `ProviderType::base_url_suffix`) exactly once.
pub fn build_url(endpoint: &str, suffix: &str, path: &str) -> String {
    format!("{}{}{}", endpoint.trim_end_matches('/'), suffix, path)
}
