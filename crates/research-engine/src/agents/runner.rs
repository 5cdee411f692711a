//! Shared language-model plumbing for the agent roster

use super::parse::parse_payload;
use crate::config::ResearchConfig;
use crate::prompts::PromptRenderer;
use research_core::{AgentError, AgentKind, AgentOutput, Result};
use research_llm::{CompletionRequest, LLMProvider, Message};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Sends one prompt and turns the reply into an [`AgentOutput`]
#[derive(Clone)]
pub(crate) struct LlmRunner {
    provider: Arc<dyn LLMProvider>,
    prompts: Arc<PromptRenderer>,
    model: String,
    max_tokens: usize,
    temperature: f32,
}

impl LlmRunner {
    pub(crate) fn new(
        provider: Arc<dyn LLMProvider>,
        prompts: Arc<PromptRenderer>,
        config: &ResearchConfig,
    ) -> Self {
        Self {
            provider,
            prompts,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub(crate) fn prompts(&self) -> &PromptRenderer {
        &self.prompts
    }

    #[instrument(skip(self, system, prompt), fields(provider = self.provider.name()))]
    pub(crate) async fn complete(
        &self,
        kind: AgentKind,
        ticker: &str,
        system: &str,
        prompt: String,
    ) -> Result<AgentOutput> {
        let request = CompletionRequest::builder(&self.model)
            .system(system)
            .add_message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .json_response(true)
            .build();

        let response = self.provider.complete(request).await.map_err(AgentError::from)?;
        debug!(
            tokens = response.usage.total(),
            chars = response.text.len(),
            "Model replied"
        );

        let payload = parse_payload(&response.text)?;
        Ok(AgentOutput::new(kind, payload).with_raw_text(response.text))
    }
}

impl std::fmt::Debug for LlmRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmRunner")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
