//! Gateway configuration.
//!
//! Deliberately minimal, in the same spirit as `CloudLLMConfig`: a plain struct with a
//! `Default` impl, constructed programmatically by whatever embeds the gateway. Parsing a
//! config file or environment is out of scope here — that's the caller's job.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Global configuration for the gateway's downstream and control-plane surfaces.
///
/// # Example
///
/// ```rust
/// use codegate::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.listen_addr.port(), 8989);
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the downstream + control-plane HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Path to the YAML file of secret-detection signatures, loaded once at startup.
    pub secrets_signatures_path: PathBuf,
    /// Base URL surfaced in secrets/PII notification links (e.g. the dashboard).
    pub dashboard_base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8989".parse().expect("valid default address"),
            secrets_signatures_path: PathBuf::from("signatures.yaml"),
            dashboard_base_url: "http://localhost:9090".to_string(),
        }
    }
}
