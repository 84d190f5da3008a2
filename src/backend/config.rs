//! Configuration for the model backend

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model backend client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Messages API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key (read from env CLAUDE_API_KEY if not set)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Value of the `anthropic-version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Time box for one backend call in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max output tokens for chat replies
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: usize,

    /// Max output tokens for summaries
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: usize,
}

fn default_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_chat_max_tokens() -> usize {
    300
}

fn default_summary_max_tokens() -> usize {
    200
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            api_version: default_api_version(),
            timeout_ms: default_timeout_ms(),
            temperature: default_temperature(),
            chat_max_tokens: default_chat_max_tokens(),
            summary_max_tokens: default_summary_max_tokens(),
        }
    }
}

impl BackendConfig {
    /// Fill the API key from CLAUDE_API_KEY when not configured
    pub fn from_env(mut self) -> Self {
        if self.api_key.is_none() {
            if let Ok(val) = std::env::var("CLAUDE_API_KEY") {
                if !val.trim().is_empty() {
                    self.api_key = Some(SecretString::new(val));
                }
            }
        }
        self
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.endpoint, "https://api.anthropic.com/v1/messages");
        assert_eq!(config.api_version, "2023-06-01");
        assert_eq!(config.chat_max_tokens, 300);
        assert_eq!(config.summary_max_tokens, 200);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_configured_key_wins_over_env() {
        let config = BackendConfig {
            api_key: Some(SecretString::new("from-file".to_string())),
            ..Default::default()
        }
        .from_env();
        assert_eq!(config.api_key.unwrap().expose_secret(), "from-file");
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let config = BackendConfig {
            api_key: Some(SecretString::new("sk-very-secret".to_string())),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("sk-very-secret"));
    }
}
