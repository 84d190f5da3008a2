//! Summary prompt construction for rolling conversation memory
//!
//! Folds an optional earlier summary and a slice of new turns into a single
//! prompt asking the model for an updated summary. The transcript is trimmed
//! from its oldest end until the prompt fits the summary budget.

use super::models::Message;
use super::token_estimator::TokenEstimator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Configuration for summary prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergerConfig {
    pub context_limit: usize,
    /// Tokens reserved for the generated summary
    pub output_reserve: usize,
    /// Tokens for the system persona and request framing
    pub prompt_overhead: usize,
    /// Length cap stated to the model
    pub max_summary_chars: usize,
    /// Only the newest turns are ever considered
    pub max_transcript_messages: usize,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            context_limit: 200_000,
            output_reserve: 200,
            prompt_overhead: 1_000,
            max_summary_chars: 200,
            max_transcript_messages: 40,
        }
    }
}

impl MergerConfig {
    /// Token budget for the prompt text itself
    pub fn prompt_budget(&self) -> usize {
        self.context_limit
            .saturating_sub(self.output_reserve)
            .saturating_sub(self.prompt_overhead)
    }
}

/// A summary request ready to send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryPrompt {
    pub prompt: String,
    /// Transcript lines embedded in the prompt
    pub kept: usize,
    /// Oldest transcript lines removed to fit
    pub dropped: usize,
    pub estimated_tokens: usize,
    /// False when even an empty transcript exceeds the budget
    pub fits: bool,
    /// The merge template was used
    pub merged: bool,
}

/// Builds prompts that merge conversation turns into a carried-forward summary
pub struct SummaryMerger {
    config: MergerConfig,
    estimator: Arc<dyn TokenEstimator>,
}

impl SummaryMerger {
    pub fn new(config: MergerConfig, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { config, estimator }
    }

    /// Render messages as `[role] content` lines
    pub fn transcript_lines(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|m| format!("[{}] {}", m.role, m.content.trim()))
            .collect()
    }

    fn render(&self, old_summary: Option<&str>, lines: &[String]) -> String {
        let transcript = lines.join("\n");
        let max_chars = self.config.max_summary_chars;
        match old_summary {
            Some(old) => format!(
                "Below is the memory you wrote earlier and the conversation that happened since.\n\
                Merge them into one updated memory, written in your own first-person voice as the character you play.\n\
                Requirements:\n\
                1. No more than {max_chars} characters, at most three sentences.\n\
                2. Keep every name, fact, promise and commitment that still matters.\n\
                3. Describe where the relationship stands now and the main topics.\n\
                4. Newer information replaces older information when they conflict.\n\
                5. Write naturally, no analysis, no headings.\n\n\
                Earlier memory:\n{old}\n\n\
                New conversation:\n{transcript}\n"
            ),
            None => format!(
                "Read the conversation below and write a memory of it in your own first-person voice, \
                as the character you play.\n\
                Requirements:\n\
                1. No more than {max_chars} characters, at most three sentences.\n\
                2. Keep every name, fact, promise and commitment that was mentioned.\n\
                3. Describe how the relationship has developed and the main topics.\n\
                4. Write naturally, no analysis, no headings.\n\n\
                Conversation:\n{transcript}\n"
            ),
        }
    }

    /// Build the summary prompt for `old_summary` plus `new_messages`
    pub fn build_summary_request(
        &self,
        old_summary: Option<&str>,
        new_messages: &[Message],
    ) -> SummaryPrompt {
        let old_summary = old_summary.map(str::trim).filter(|s| !s.is_empty());
        let window_start = new_messages
            .len()
            .saturating_sub(self.config.max_transcript_messages);
        let lines = Self::transcript_lines(&new_messages[window_start..]);
        let budget = self.config.prompt_budget();

        // Drop whole lines from the oldest end until the prompt fits
        let mut start = 0;
        let mut prompt = self.render(old_summary, &lines);
        let mut estimated = self.estimator.estimate(&prompt);
        while estimated > budget && start < lines.len() {
            start += 1;
            prompt = self.render(old_summary, &lines[start..]);
            estimated = self.estimator.estimate(&prompt);
        }

        let fits = estimated <= budget;
        let dropped = window_start + start;
        if dropped > 0 {
            warn!(
                "Summary transcript trimmed: kept {} of {} turns",
                lines.len() - start,
                new_messages.len()
            );
        }
        if !fits {
            warn!(
                "Summary prompt exceeds budget with an empty transcript: {} > {}",
                estimated, budget
            );
        }

        SummaryPrompt {
            prompt,
            kept: lines.len() - start,
            dropped,
            estimated_tokens: estimated,
            fits,
            merged: old_summary.is_some(),
        }
    }

    pub fn config(&self) -> &MergerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::token_estimator::HeuristicEstimator;

    fn merger(config: MergerConfig) -> SummaryMerger {
        SummaryMerger::new(config, Arc::new(HeuristicEstimator::default()))
    }

    fn conversation(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question number q{} about the trip", i))
                } else {
                    Message::assistant(format!("answer number a{} about the trip", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_first_summary_template() {
        let merger = merger(MergerConfig::default());
        let request = merger.build_summary_request(None, &conversation(4));

        assert!(!request.merged);
        assert!(request.fits);
        assert_eq!(request.kept, 4);
        assert_eq!(request.dropped, 0);
        assert!(request.prompt.contains("first-person voice"));
        assert!(request.prompt.contains("No more than 200 characters"));
        assert!(request.prompt.contains("[user] question number q0 about the trip"));
        assert!(request.prompt.contains("[assistant] answer number a3 about the trip"));
        assert!(!request.prompt.contains("Earlier memory"));
    }

    #[test]
    fn test_merge_template_embeds_old_summary() {
        let merger = merger(MergerConfig::default());
        let request =
            merger.build_summary_request(Some("We planned a trip to Kyoto."), &conversation(2));

        assert!(request.merged);
        assert!(request.prompt.contains("Earlier memory:\nWe planned a trip to Kyoto."));
        assert!(request.prompt.contains("New conversation:"));
    }

    #[test]
    fn test_blank_old_summary_uses_first_template() {
        let merger = merger(MergerConfig::default());
        let request = merger.build_summary_request(Some("   "), &conversation(2));
        assert!(!request.merged);
    }

    #[test]
    fn test_transcript_window_keeps_newest() {
        let merger = merger(MergerConfig {
            max_transcript_messages: 3,
            ..Default::default()
        });
        let request = merger.build_summary_request(None, &conversation(6));

        assert_eq!(request.kept, 3);
        assert_eq!(request.dropped, 3);
        assert!(!request.prompt.contains("q0"));
        assert!(!request.prompt.contains("q2 "));
        assert!(request.prompt.contains("a3"));
        assert!(request.prompt.contains("a5"));
    }

    #[test]
    fn test_truncation_removes_oldest_first() {
        let estimator = HeuristicEstimator::default();
        let base = merger(MergerConfig::default());
        let full = base.build_summary_request(None, &conversation(10));
        let empty = base.build_summary_request(None, &[]);
        let empty_cost = estimator.estimate(&empty.prompt);

        // Budget leaves room for roughly half of the transcript
        let budget = (empty_cost + full.estimated_tokens) / 2;
        let config = MergerConfig {
            context_limit: budget + 300,
            output_reserve: 200,
            prompt_overhead: 100,
            ..Default::default()
        };
        let merger = merger(config);
        let request = merger.build_summary_request(None, &conversation(10));

        assert!(request.fits);
        assert!(request.estimated_tokens <= budget);
        assert!(request.dropped > 0);
        assert!(request.kept > 0);
        assert_eq!(request.kept + request.dropped, 10);
        // Newest line always survives; oldest is gone
        assert!(request.prompt.contains("a9 about"));
        assert!(!request.prompt.contains("q0 about"));
        // Kept lines are a contiguous suffix
        let first_kept = 10 - request.kept;
        for i in first_kept..10 {
            let prefix = if i % 2 == 0 { "q" } else { "a" };
            assert!(request.prompt.contains(&format!("{}{} about", prefix, i)));
        }
    }

    #[test]
    fn test_oversized_old_summary_reports_not_fitting() {
        let merger = merger(MergerConfig {
            context_limit: 400,
            output_reserve: 200,
            prompt_overhead: 100,
            ..Default::default()
        });
        let old = "memory ".repeat(500);
        let request = merger.build_summary_request(Some(&old), &conversation(4));

        assert!(!request.fits);
        assert_eq!(request.kept, 0);
        assert_eq!(request.dropped, 4);
    }
}
