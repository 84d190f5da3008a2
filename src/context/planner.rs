//! Context budget planner
//!
//! Selects which conversation turns accompany the current message:
//! - The current message is always sent, even when it alone exceeds the budget
//! - A prefix of the earliest turns is kept, capped at a share of the budget
//! - The remaining budget is filled with the newest turns, walking backwards

use super::models::{Message, PlannedContext};
use super::token_budget::{BudgetConfig, BudgetError, TokenBudget};
use super::token_estimator::TokenEstimator;
use std::sync::Arc;
use tracing::{debug, warn};

/// Plans the history sent with each chat turn
pub struct ContextBudgetPlanner {
    config: BudgetConfig,
    estimator: Arc<dyn TokenEstimator>,
}

impl ContextBudgetPlanner {
    /// Create a planner, rejecting inconsistent budgets
    pub fn new(
        config: BudgetConfig,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Result<Self, BudgetError> {
        config.validate()?;
        Ok(Self { config, estimator })
    }

    /// Estimated cost of one message including framing overhead
    pub fn message_cost(&self, message: &Message) -> usize {
        self.estimator.estimate(&message.content) + self.config.per_message_overhead
    }

    /// Compute the budget left for history and the current turn
    pub fn budget(&self, system_prompt: &str, summary: Option<&str>) -> TokenBudget {
        let system_tokens = self.estimator.estimate(system_prompt);
        let summary_tokens = summary.map(|s| self.estimator.estimate(s)).unwrap_or(0);
        TokenBudget::compute(&self.config, system_tokens, summary_tokens)
    }

    /// Select history for the current message
    pub fn plan(
        &self,
        system_prompt: &str,
        summary: Option<&str>,
        history: &[Message],
        current: &Message,
    ) -> PlannedContext {
        let budget = self.budget(system_prompt, summary);
        let available = budget.available;
        let current_cost = self.message_cost(current);

        debug!(
            "Token budget: limit={}, system={}, summary={}, reserve={}, margin={}, available={}, current={}",
            budget.context_limit,
            budget.system_tokens,
            budget.summary_tokens,
            budget.output_reserve,
            budget.safety_margin,
            available,
            current_cost
        );

        if current_cost >= available {
            let overflow = current_cost > available;
            if overflow {
                warn!(
                    "Current message exceeds history budget: {} > {}, sending it alone",
                    current_cost, available
                );
            }
            return PlannedContext {
                messages: vec![current.clone()],
                available,
                used_tokens: current_cost,
                initial_count: 0,
                recent_count: 0,
                dropped_count: history.len(),
                overflow,
            };
        }

        let costs: Vec<usize> = history.iter().map(|m| self.message_cost(m)).collect();
        let mut used = current_cost;

        // Initial block: strict prefix, capped by the initial share
        let initial_cap = self.config.initial_share(available);
        let initial_limit = self.config.keep_initial_count.min(history.len());
        let mut initial_tokens = 0;
        let mut initial_count = 0;
        for &cost in &costs[..initial_limit] {
            if initial_tokens + cost > initial_cap || used + cost > available {
                break;
            }
            initial_tokens += cost;
            used += cost;
            initial_count += 1;
        }

        // Recent block: newest first, never reaching into the initial block
        let mut recent_start = history.len();
        while recent_start > initial_count {
            let cost = costs[recent_start - 1];
            if used + cost > available {
                break;
            }
            used += cost;
            recent_start -= 1;
        }
        let recent_count = history.len() - recent_start;

        let mut messages = Vec::with_capacity(initial_count + recent_count + 1);
        messages.extend_from_slice(&history[..initial_count]);
        messages.extend_from_slice(&history[recent_start..]);
        messages.push(current.clone());

        let dropped_count = history.len() - initial_count - recent_count;

        debug!(
            "Planned context: initial={} ({} tokens, cap {}), recent={}, dropped={}, used={}/{}",
            initial_count, initial_tokens, initial_cap, recent_count, dropped_count, used, available
        );

        PlannedContext {
            messages,
            available,
            used_tokens: used,
            initial_count,
            recent_count,
            dropped_count,
            overflow: false,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn estimator(&self) -> &Arc<dyn TokenEstimator> {
        &self.estimator
    }
}
