//! Client configuration types.

use std::time::Duration;

use serde::Deserialize;

use crate::types::{DEFAULT_AGENT, DEFAULT_MODEL};

/// Configuration for talking to the agent backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL (e.g., "http://localhost:5000").
    #[serde(default = "ClientConfig::default_base_url")]
    pub base_url: String,

    /// Agent selected for a new conversation.
    #[serde(default = "ClientConfig::default_agent")]
    pub default_agent: String,

    /// Model selected for a new conversation.
    #[serde(default = "ClientConfig::default_model")]
    pub default_model: String,

    /// Timeout for REST calls in seconds. Streaming requests have none.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// TCP connect timeout in seconds, applied to every request.
    #[serde(default = "ClientConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl ClientConfig {
    fn default_base_url() -> String {
        "http://localhost:5000".to_string()
    }

    fn default_agent() -> String {
        DEFAULT_AGENT.to_string()
    }

    fn default_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_connect_timeout() -> u64 {
        5
    }

    /// Get the REST request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            default_agent: Self::default_agent(),
            default_model: Self::default_model(),
            request_timeout_seconds: Self::default_request_timeout(),
            connect_timeout_seconds: Self::default_connect_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.default_agent, "Basic");
        assert_eq!(config.default_model, "mistral");
        assert_eq!(config.request_timeout_seconds, 30);
    }

    #[test]
    fn timeout_duration() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://agents:9000","default_model":"llama3"}"#)
                .unwrap();
        assert_eq!(config.base_url, "http://agents:9000");
        assert_eq!(config.default_model, "llama3");
        assert_eq!(config.default_agent, "Basic");
        assert_eq!(config.connect_timeout_seconds, 5);
    }
}
