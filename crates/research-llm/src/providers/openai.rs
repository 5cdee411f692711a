//! OpenAI-compatible provider implementation
//!
//! Talks to any `/chat/completions` endpoint that follows the OpenAI wire
//! format: OpenAI itself, Azure deployments, or local servers such as
//! llama.cpp, vLLM and LM Studio.
//!
//! ```no_run
//! use research_llm::{CompletionRequest, LLMProvider, Message};
//! use research_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn example() -> research_llm::Result<()> {
//! let config = OpenAIConfig::new("not-needed").with_api_base("http://localhost:1234/v1");
//! let provider = OpenAIProvider::with_config(config)?;
//!
//! let request = CompletionRequest::builder("local-model")
//!     .add_message(Message::user("Summarize AAPL news"))
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

use crate::{CompletionRequest, CompletionResponse, LLMError, LLMProvider, Result, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the API (default: "https://api.openai.com/v1")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from environment variables
    ///
    /// Reads the API key from `OPENAI_API_KEY` and, if set, the base URL from
    /// `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.to_string());

        Ok(Self {
            api_key,
            api_base,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// OpenAI-compatible chat completions provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_base.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "api_base must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to {}", self.endpoint());

        let model = request.model.clone();
        let openai_request = build_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::InvalidRequest(format!("model not found: {model}")),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        parse_response(openai_response)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

// ============================================================================
// Conversion helpers
// ============================================================================

fn role_str(role: crate::Role) -> &'static str {
    match role {
        crate::Role::User => "user",
        crate::Role::Assistant => "assistant",
        crate::Role::System => "system",
    }
}

/// The system prompt goes into the messages array for OpenAI
fn build_request(request: CompletionRequest) -> OpenAIRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system {
        messages.push(OpenAIMessage {
            role: "system",
            content: system,
        });
    }
    messages.extend(request.messages.into_iter().map(|m| OpenAIMessage {
        role: role_str(m.role),
        content: m.content,
    }));

    OpenAIRequest {
        model: request.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        response_format: request.json_response.then_some(ResponseFormat {
            format_type: "json_object",
        }),
    }
}

fn parse_response(response: OpenAIResponse) -> Result<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

    let text = choice
        .message
        .content
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| LLMError::UnexpectedResponse("Empty message content".to_string()))?;

    let usage = response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    debug!("Received response - tokens: {}", usage.total());

    Ok(CompletionResponse { text, usage })
}
