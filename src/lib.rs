//! `codegate` — a security- and policy-enforcing gateway between coding-assistant clients and
//! upstream LLM providers.
//!
//! The gateway normalizes OpenAI, Anthropic, and Ollama wire protocols onto a common internal
//! shape, runs every request and response through a pipeline of policy steps (secrets/PII
//! redaction, CLI shortcuts, system-prompt injection), and routes requests to upstream providers
//! by workspace-scoped muxing rules.
//!
//! # Example
//!
//! ```rust
//! use codegate::config::GatewayConfig;
//!
//! let config = GatewayConfig::default();
//! assert_eq!(config.listen_addr.port(), 8989);
//! ```

pub mod alerts;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod fim;
pub mod mappers;
pub mod matchers;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod router;
pub mod sensitive_data;
pub mod server;
pub mod session_store;
pub mod types;
