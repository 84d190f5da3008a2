//! Conversation memory with token budget enforcement
//!
//! This module decides which turns accompany each chat message, when the
//! caller should compress its history, and how that compression is asked for.

pub mod models;
pub mod planner;
pub mod summarizer;
pub mod token_budget;
pub mod token_estimator;
pub mod trigger;

pub use models::{Message, PlannedContext, Role};
pub use planner::ContextBudgetPlanner;
pub use summarizer::{MergerConfig, SummaryMerger, SummaryPrompt};
pub use token_budget::{BudgetConfig, BudgetError, EstimatorKind, TokenBudget};
pub use token_estimator::{HeuristicEstimator, TiktokenEstimator, TokenEstimator};
pub use trigger::{exchange_count, should_summarize};

use std::sync::Arc;
use tracing::warn;

/// Build the configured estimator, falling back to the heuristic
pub fn estimator_for(kind: EstimatorKind) -> Arc<dyn TokenEstimator> {
    match kind {
        EstimatorKind::Heuristic => Arc::new(HeuristicEstimator::default()),
        EstimatorKind::Tiktoken => TiktokenEstimator::new()
            .map(|e| Arc::new(e) as Arc<dyn TokenEstimator>)
            .unwrap_or_else(|e| {
                warn!(
                    "Tiktoken initialization failed ({}), falling back to heuristic estimator",
                    e
                );
                Arc::new(HeuristicEstimator::default())
            }),
    }
}
