//! Token budget arithmetic for a single backend call
//!
//! The budget left for conversation history is
//! `context_limit - system - summary - output_reserve - safety_margin`,
//! saturating at zero. It is recomputed on every request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which estimator backs budget planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Heuristic,
    Tiktoken,
}

/// Token budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Total tokens the model accepts for input plus output
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    /// Tokens reserved for the generated reply
    #[serde(default = "default_output_reserve")]
    pub output_reserve: usize,
    /// Fixed buffer against estimator error
    #[serde(default = "default_safety_margin")]
    pub safety_margin: usize,
    /// Earliest turns eligible for guaranteed retention
    #[serde(default = "default_keep_initial")]
    pub keep_initial_count: usize,
    /// Max share of the history budget the initial block may use
    #[serde(default = "default_initial_share")]
    pub initial_share_fraction: f64,
    /// Framing tokens charged per message
    #[serde(default = "default_message_overhead")]
    pub per_message_overhead: usize,
    #[serde(default = "default_estimator")]
    pub estimator: EstimatorKind,
}

fn default_context_limit() -> usize {
    200_000
}

fn default_output_reserve() -> usize {
    300
}

fn default_safety_margin() -> usize {
    500
}

fn default_keep_initial() -> usize {
    6
}

fn default_initial_share() -> f64 {
    0.3
}

fn default_message_overhead() -> usize {
    4
}

fn default_estimator() -> EstimatorKind {
    EstimatorKind::Heuristic
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            context_limit: default_context_limit(),
            output_reserve: default_output_reserve(),
            safety_margin: default_safety_margin(),
            keep_initial_count: default_keep_initial(),
            initial_share_fraction: default_initial_share(),
            per_message_overhead: default_message_overhead(),
            estimator: default_estimator(),
        }
    }
}

impl BudgetConfig {
    /// Validate that the budget configuration is consistent
    pub fn validate(&self) -> Result<(), BudgetError> {
        let reserved = self.output_reserve.saturating_add(self.safety_margin);
        if reserved >= self.context_limit {
            return Err(BudgetError::ConfigurationInvalid {
                reserved,
                max: self.context_limit,
            });
        }

        if !(0.0..=1.0).contains(&self.initial_share_fraction) {
            return Err(BudgetError::InvalidShare(self.initial_share_fraction));
        }

        Ok(())
    }

    /// Budget for the initial block given the history budget
    pub fn initial_share(&self, available: usize) -> usize {
        (available as f64 * self.initial_share_fraction).floor() as usize
    }
}

/// Breakdown of one call's token budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    pub context_limit: usize,
    pub system_tokens: usize,
    pub summary_tokens: usize,
    pub output_reserve: usize,
    pub safety_margin: usize,
    /// Tokens left for history plus the current message
    pub available: usize,
}

impl TokenBudget {
    pub fn compute(config: &BudgetConfig, system_tokens: usize, summary_tokens: usize) -> Self {
        let available = config
            .context_limit
            .saturating_sub(system_tokens)
            .saturating_sub(summary_tokens)
            .saturating_sub(config.output_reserve)
            .saturating_sub(config.safety_margin);

        Self {
            context_limit: config.context_limit,
            system_tokens,
            summary_tokens,
            output_reserve: config.output_reserve,
            safety_margin: config.safety_margin,
            available,
        }
    }

    /// Fixed cost of the call before any conversation turns
    pub fn fixed_cost(&self) -> usize {
        self.system_tokens + self.summary_tokens + self.output_reserve + self.safety_margin
    }
}

/// Token budget errors
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("Configuration invalid: {reserved} tokens reserved, {max} tokens context limit")]
    ConfigurationInvalid { reserved: usize, max: usize },

    #[error("Initial share fraction must be within 0..=1, got {0}")]
    InvalidShare(f64),
}
