//! Relay configuration
//!
//! The upstream credential is held server-side and read from the
//! environment; it is never accepted from or exposed to clients.

use anyhow::Context;
use rill_ai::providers::{self, openai};

/// Environment variable overriding the listen address
pub const BIND_ENV_VAR: &str = "RILL_RELAY_BIND";

/// Environment variable overriding the upstream base URL
pub const UPSTREAM_URL_ENV_VAR: &str = "RILL_UPSTREAM_URL";

const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Runtime configuration for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: String,
    pub upstream_base_url: String,
    pub api_key: String,
}

impl RelayConfig {
    /// Assemble configuration from the environment, with an optional
    /// command-line bind override taking precedence.
    pub fn from_env(bind_override: Option<String>) -> anyhow::Result<Self> {
        let api_key = providers::get_api_key(None, openai::API_KEY_ENV_VAR).with_context(|| {
            format!("{} must be set; the relay holds the upstream credential", openai::API_KEY_ENV_VAR)
        })?;

        let bind = bind_override
            .or_else(|| std::env::var(BIND_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let upstream_base_url = std::env::var(UPSTREAM_URL_ENV_VAR)
            .unwrap_or_else(|_| openai::DEFAULT_BASE_URL.to_string());

        Ok(Self {
            bind,
            upstream_base_url,
            api_key,
        })
    }
}
