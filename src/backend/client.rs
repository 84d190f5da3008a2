//! Anthropic Messages API client with a fixed time box

use super::config::BackendConfig;
use super::{CompletionRequest, ModelBackend};
use crate::context::Message;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error};

/// Backend error types
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream error ({status}): {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::MissingApiKey => "config",
            BackendError::RequestFailed(_) => "request",
            BackendError::Upstream { .. } => "upstream",
            BackendError::Timeout(_) => "timeout",
            BackendError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Client for the Anthropic Messages API
pub struct AnthropicClient {
    http: Client,
    config: BackendConfig,
    api_key: SecretString,
}

impl AnthropicClient {
    /// Create a new client; the API key must be present
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let api_key = config.api_key.clone().ok_or(BackendError::MissingApiKey)?;
        let http = Client::builder()
            .build()
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    async fn call_messages_api(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
        };

        debug!(
            "Calling messages API: {} messages, max_tokens={}",
            request.messages.len(),
            request.max_tokens
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.config.timeout_ms)
                } else {
                    BackendError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Upstream { status, body });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| {
                BackendError::InvalidResponse("No text in first content block".to_string())
            })
    }
}

#[async_trait]
impl ModelBackend for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
        let start = Instant::now();

        // Dropping the future on expiry cancels the in-flight request
        let call = self.call_messages_api(&request);
        let result = match tokio::time::timeout(self.config.timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.config.timeout_ms)),
        };

        METRICS
            .backend_request_duration
            .observe(start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            METRICS.record_backend_error(e.kind());
            error!("Backend call failed: {}", e);
        }

        result
    }
}

// Messages API wire types
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    system: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}
