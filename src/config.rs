//! Service configuration
//!
//! Layered as defaults, then an optional TOML file, then `RELAY__*`
//! environment variables (e.g. `RELAY__SERVER__PORT=8081`).

use crate::backend::BackendConfig;
use crate::context::{BudgetConfig, BudgetError, MergerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default persona used when none is configured
pub const DEFAULT_PERSONA: &str = "You are a warm, attentive companion chatting with the user over instant messages.

Rules:
1. Reply in 2-5 short sentences, under 80 words in total.
2. Write like a chat message: casual, natural, no emoji, no lists.
3. Respond only to the current topic and do not repeat the user's words.
4. Never summarize or lecture; stay in character.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid token budget: {0}")]
    Budget(#[from] BudgetError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Summary memory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Exchanges between summary requests
    #[serde(default = "default_interval")]
    pub interval: usize,
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,
    #[serde(default = "default_max_transcript_messages")]
    pub max_transcript_messages: usize,
    /// Tokens set aside for persona and framing in summary calls
    #[serde(default = "default_prompt_overhead")]
    pub prompt_overhead: usize,
}

fn default_interval() -> usize {
    15
}

fn default_max_summary_chars() -> usize {
    200
}

fn default_max_transcript_messages() -> usize {
    40
}

fn default_prompt_overhead() -> usize {
    1_000
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_summary_chars: default_max_summary_chars(),
            max_transcript_messages: default_max_transcript_messages(),
            prompt_overhead: default_prompt_overhead(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Heading placed above the carried-forward summary
    #[serde(default = "default_summary_heading")]
    pub summary_heading: String,
}

fn default_system_prompt() -> String {
    DEFAULT_PERSONA.to_string()
}

fn default_summary_heading() -> String {
    "[Summary of our earlier conversation]".to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            summary_heading: default_summary_heading(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
}

impl Config {
    /// Load from an optional TOML file and `RELAY__*` environment variables
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(
                ::config::Environment::with_prefix("RELAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.backend = config.backend.from_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string (no environment overlay)
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.planner_budget().validate()?;
        if self.persona.system_prompt.trim().is_empty() {
            return Err(ConfigError::Invalid("persona.system_prompt is empty".to_string()));
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::Invalid("backend.timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Chat budget; the output reserve covers at least `chat_max_tokens`
    pub fn planner_budget(&self) -> BudgetConfig {
        BudgetConfig {
            output_reserve: self.budget.output_reserve.max(self.backend.chat_max_tokens),
            ..self.budget.clone()
        }
    }

    /// Merger settings derived from the budget and summary sections
    pub fn merger_config(&self) -> MergerConfig {
        MergerConfig {
            context_limit: self.budget.context_limit,
            output_reserve: self.backend.summary_max_tokens,
            prompt_overhead: self.summary.prompt_overhead,
            max_summary_chars: self.summary.max_summary_chars,
            max_transcript_messages: self.summary.max_transcript_messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.summary.interval, 15);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9000

            [budget]
            context_limit = 8000
            keep_initial_count = 4
            estimator = "tiktoken"

            [summary]
            interval = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.budget.context_limit, 8000);
        assert_eq!(config.budget.keep_initial_count, 4);
        assert_eq!(config.budget.safety_margin, 500);
        assert_eq!(config.budget.estimator, crate::context::EstimatorKind::Tiktoken);
        assert_eq!(config.summary.interval, 10);
        assert_eq!(config.backend.chat_max_tokens, 300);
    }

    #[test]
    fn test_invalid_budget_rejected() {
        let result = Config::from_toml_str(
            r#"
            [budget]
            context_limit = 500
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Budget(_))));
    }

    #[test]
    fn test_chat_reserve_covers_max_tokens() {
        let mut config = Config::default();
        config.backend.chat_max_tokens = 1_200;
        assert_eq!(config.planner_budget().output_reserve, 1_200);

        config.backend.chat_max_tokens = 100;
        assert_eq!(config.planner_budget().output_reserve, config.budget.output_reserve);
    }

    #[test]
    fn test_chat_max_tokens_beyond_limit_rejected() {
        let result = Config::from_toml_str(
            r#"
            [budget]
            context_limit = 4000

            [backend]
            chat_max_tokens = 3600
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Budget(_))));
    }

    #[test]
    fn test_merger_config_uses_summary_reserve() {
        let config = Config::default();
        let merger = config.merger_config();
        assert_eq!(merger.output_reserve, 200);
        assert_eq!(merger.max_transcript_messages, 40);
        assert_eq!(merger.context_limit, config.budget.context_limit);
    }
}
