//! Periodic summary trigger
//!
//! The count is of exchanges: one per successful chat call, i.e. one per user
//! turn. The assistant reply of that exchange is not counted on its own.

use super::models::{Message, Role};

/// True when `total` is a positive multiple of `interval`
pub fn should_summarize(total: usize, interval: usize) -> bool {
    interval > 0 && total > 0 && total % interval == 0
}

/// Exchange count after the current turn completes
///
/// `reported` is the caller's running count of prior exchanges. Without it
/// the prior count is the number of user turns in `history`. Returns `None`
/// when the count cannot advance.
pub fn exchange_count(reported: Option<usize>, history: &[Message]) -> Option<usize> {
    let prior = reported
        .unwrap_or_else(|| history.iter().filter(|m| m.role == Role::User).count());
    prior.checked_add(1)
}
