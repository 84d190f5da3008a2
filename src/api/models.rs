//! Request and response bodies for the relay API

use crate::context::Message;
use serde::{Deserialize, Serialize};

/// Which operation a request asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Chat,
    Summary,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Chat => "chat",
            Mode::Summary => "summary",
        }
    }
}

/// Relay request body; all conversation state is supplied by the caller
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub mode: Mode,
    /// Current user turn (chat mode)
    #[serde(default)]
    pub message: Option<String>,
    /// Prior turns, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Carried-forward memory (chat mode)
    #[serde(default)]
    pub summary: Option<String>,
    /// Memory to merge with `messages` (summary mode)
    #[serde(default)]
    pub old_summary: Option<String>,
    /// Caller's running exchange count before this turn
    #[serde(default)]
    pub total_messages: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub needs_summary: bool,
    pub total_messages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// The new summary text
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayResponse {
    Chat(ChatResponse),
    Summary(SummaryResponse),
}

/// Error body returned for every failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
