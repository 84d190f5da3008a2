//! Relay service: validates a request, plans memory and calls the backend
//!
//! The service holds only immutable configuration and shared clients. Each
//! call receives the whole conversation state and returns the reply plus
//! the flags the caller needs to maintain its memory.

use crate::api::models::{ChatResponse, Mode, RelayRequest, RelayResponse, SummaryResponse};
use crate::backend::{AnthropicClient, BackendConfig, CompletionRequest, ModelBackend};
use crate::config::{Config, PersonaConfig, SummaryConfig};
use crate::context::{
    estimator_for, exchange_count, should_summarize, ContextBudgetPlanner, Message, Role,
    SummaryMerger,
};
use crate::error::{RelayError, Result, MISSING_API_KEY};
use crate::metrics::METRICS;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request orchestration for chat and summary modes
pub struct RelayService {
    planner: ContextBudgetPlanner,
    merger: SummaryMerger,
    backend: Option<Arc<dyn ModelBackend>>,
    backend_config: BackendConfig,
    persona: PersonaConfig,
    summary: SummaryConfig,
}

impl RelayService {
    /// Create a service around an explicit backend
    ///
    /// A `None` backend makes every request fail with a configuration error.
    pub fn new(config: &Config, backend: Option<Arc<dyn ModelBackend>>) -> Result<Self> {
        let estimator = estimator_for(config.budget.estimator);
        let planner = ContextBudgetPlanner::new(config.planner_budget(), estimator.clone())
            .map_err(|e| RelayError::Configuration(e.to_string()))?;
        let merger = SummaryMerger::new(config.merger_config(), estimator);

        Ok(Self {
            planner,
            merger,
            backend,
            backend_config: config.backend.clone(),
            persona: config.persona.clone(),
            summary: config.summary.clone(),
        })
    }

    /// Create with the Anthropic client when an API key is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Option<Arc<dyn ModelBackend>> = if config.backend.api_key.is_some() {
            Some(Arc::new(AnthropicClient::new(config.backend.clone())?))
        } else {
            warn!("No API key configured; requests will fail until CLAUDE_API_KEY is set");
            None
        };
        Self::new(config, backend)
    }

    /// Handle one relay request
    pub async fn handle(&self, request: RelayRequest) -> Result<RelayResponse> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| RelayError::Configuration(MISSING_API_KEY.to_string()))?;

        match request.mode {
            Mode::Chat => self.chat(backend.as_ref(), request).await.map(RelayResponse::Chat),
            Mode::Summary => self
                .summarize(backend.as_ref(), request)
                .await
                .map(RelayResponse::Summary),
        }
    }

    async fn chat(
        &self,
        backend: &dyn ModelBackend,
        request: RelayRequest,
    ) -> Result<ChatResponse> {
        validate_history(&request.messages)?;
        let (history, current) = split_current_turn(request.message.as_deref(), &request.messages)?;
        let total_messages = exchange_count(request.total_messages, history)
            .ok_or_else(|| RelayError::validation("totalMessages is out of range."))?;
        let summary = non_blank(request.summary.as_deref());

        // The summary travels inside the system prompt, heading included
        let system = self.system_prompt(summary);
        let planned = self.planner.plan(&system, None, history, &current);
        METRICS.record_token_budget(
            planned.used_tokens,
            planned.remaining(),
            planned.dropped_count,
            planned.overflow,
        );
        info!(
            "Chat turn: history={}, sent={}, dropped={}, tokens={}/{}, overflow={}",
            history.len(),
            planned.messages.len() - 1,
            planned.dropped_count,
            planned.used_tokens,
            planned.available,
            planned.overflow
        );

        let completion = CompletionRequest {
            system,
            messages: planned.messages,
            max_tokens: self.backend_config.chat_max_tokens,
            temperature: self.backend_config.temperature,
        };
        let reply = backend.complete(completion).await?;

        let needs_summary = should_summarize(total_messages, self.summary.interval);
        if needs_summary {
            METRICS.record_summary_requested();
            info!("Exchange {} reached summary interval", total_messages);
        }

        Ok(ChatResponse {
            reply,
            needs_summary,
            total_messages,
        })
    }

    async fn summarize(
        &self,
        backend: &dyn ModelBackend,
        request: RelayRequest,
    ) -> Result<SummaryResponse> {
        if request.messages.is_empty() {
            return Err(RelayError::validation("No messages provided for summary mode."));
        }
        validate_history(&request.messages)?;

        let prompt = self
            .merger
            .build_summary_request(request.old_summary.as_deref(), &request.messages);
        if prompt.dropped > 0 {
            METRICS.record_summary_truncation();
        }
        info!(
            "Summary request: merged={}, kept={}, dropped={}, tokens={}",
            prompt.merged, prompt.kept, prompt.dropped, prompt.estimated_tokens
        );

        let completion = CompletionRequest {
            system: self.persona.system_prompt.clone(),
            messages: vec![Message::user(prompt.prompt)],
            max_tokens: self.backend_config.summary_max_tokens,
            temperature: self.backend_config.temperature,
        };
        let reply = backend.complete(completion).await?;

        Ok(SummaryResponse {
            reply: reply.trim().to_string(),
        })
    }

    /// Persona prompt with the carried-forward summary appended
    pub fn system_prompt(&self, summary: Option<&str>) -> String {
        match summary {
            Some(summary) => format!(
                "{}\n\n{}\n{}",
                self.persona.system_prompt, self.persona.summary_heading, summary
            ),
            None => self.persona.system_prompt.clone(),
        }
    }

    pub fn planner(&self) -> &ContextBudgetPlanner {
        &self.planner
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|s| !s.is_empty())
}

fn validate_history(messages: &[Message]) -> Result<()> {
    if let Some(index) = messages.iter().position(Message::is_blank) {
        return Err(RelayError::validation(format!(
            "messages[{}] has empty content.",
            index
        )));
    }
    Ok(())
}

/// Pick the current user turn and the history preceding it
///
/// Without an explicit `message`, a trailing user turn in the history is
/// treated as the current message.
fn split_current_turn<'a>(
    message: Option<&str>,
    messages: &'a [Message],
) -> Result<(&'a [Message], Message)> {
    if let Some(text) = non_blank(message) {
        return Ok((messages, Message::user(text)));
    }

    match messages.split_last() {
        Some((last, rest)) if last.role == Role::User => {
            debug!("Using trailing history turn as the current message");
            Ok((rest, last.clone()))
        }
        _ => Err(RelayError::validation("No valid message provided for chat mode.")),
    }
}
