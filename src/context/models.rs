//! Data models for conversation memory

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged utterance in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// True when the content has no visible characters
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Messages selected by the planner for one backend call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedContext {
    /// Initial block, recent block, then the current message
    pub messages: Vec<Message>,
    /// Tokens available for history and the current turn
    pub available: usize,
    /// Estimated cost of `messages`
    pub used_tokens: usize,
    pub initial_count: usize,
    pub recent_count: usize,
    pub dropped_count: usize,
    /// The current message alone exceeds `available`
    pub overflow: bool,
}

impl PlannedContext {
    pub fn remaining(&self) -> usize {
        self.available.saturating_sub(self.used_tokens)
    }

    /// True when the selection fits in the available budget
    pub fn is_within_budget(&self) -> bool {
        self.used_tokens <= self.available
    }

    /// History turns that accompany the current message
    pub fn history(&self) -> &[Message] {
        let end = self.messages.len().saturating_sub(1);
        &self.messages[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = Message::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);

        let parsed: Message = serde_json::from_str(r#"{"role":"user","content":"yo"}"#).unwrap();
        assert_eq!(parsed, Message::user("yo"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let parsed = serde_json::from_str::<Message>(r#"{"role":"system","content":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_planned_context_history_excludes_current() {
        let planned = PlannedContext {
            messages: vec![Message::user("a"), Message::assistant("b"), Message::user("c")],
            available: 100,
            used_tokens: 12,
            initial_count: 2,
            recent_count: 0,
            dropped_count: 0,
            overflow: false,
        };
        assert_eq!(planned.history().len(), 2);
        assert_eq!(planned.remaining(), 88);
        assert!(planned.is_within_budget());
    }
}
