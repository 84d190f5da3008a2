//! Model backend used for chat replies and summaries

pub mod client;
pub mod config;

pub use client::{AnthropicClient, BackendError};
pub use config::BackendConfig;

use crate::context::Message;
use async_trait::async_trait;
use serde::Serialize;

/// One completion call to the model
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Backend that turns a system instruction and a message list into a reply
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError>;
}
