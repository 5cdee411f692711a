//! Configuration for research orchestration

use crate::error::{ResearchError, Result};
use crate::models::Query;
use research_utils::{env_duration_secs, env_or, env_string};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every request an orchestrator serves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum number of agent units in flight at once
    pub concurrency_limit: usize,

    /// Agent-local sub-deadline for a single unit
    pub agent_timeout: Duration,

    /// Request budget used when a query does not carry one
    pub default_timeout: Duration,

    /// Attempt bound used when a query does not carry one
    pub default_max_iterations: u32,

    /// Initial backoff between attempts of a failing unit
    pub retry_backoff_base: Duration,

    /// Characters of raw agent output kept on each trace
    pub excerpt_chars: usize,

    /// Model used by language-model agents
    pub model: String,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 8,
            agent_timeout: Duration::from_secs(20),
            default_timeout: Duration::from_secs(30),
            default_max_iterations: 3,
            retry_backoff_base: Duration::from_millis(250),
            excerpt_chars: 280,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

impl ResearchConfig {
    /// Create a new configuration builder
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Load overrides from the environment on top of the defaults
    ///
    /// Recognized variables: `RESEARCH_CONCURRENCY`,
    /// `RESEARCH_AGENT_TIMEOUT_SECS`, `RESEARCH_TIMEOUT_SECS`,
    /// `RESEARCH_MAX_ITERATIONS`, `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            concurrency_limit: env_or("RESEARCH_CONCURRENCY", defaults.concurrency_limit)?,
            agent_timeout: env_duration_secs("RESEARCH_AGENT_TIMEOUT_SECS", defaults.agent_timeout)?,
            default_timeout: env_duration_secs("RESEARCH_TIMEOUT_SECS", defaults.default_timeout)?,
            default_max_iterations: env_or(
                "RESEARCH_MAX_ITERATIONS",
                defaults.default_max_iterations,
            )?,
            model: env_string("OPENAI_MODEL").unwrap_or(defaults.model),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(ResearchError::Config(
                "concurrency_limit must be greater than 0".to_string(),
            ));
        }

        if self.agent_timeout.is_zero() || self.default_timeout.is_zero() {
            return Err(ResearchError::Config(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if self.default_max_iterations == 0 {
            return Err(ResearchError::Config(
                "default_max_iterations must be greater than 0".to_string(),
            ));
        }

        if self.excerpt_chars == 0 {
            return Err(ResearchError::Config(
                "excerpt_chars must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ResearchError::Config(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }

        Ok(())
    }

    /// Get retry backoff duration before attempt `attempt + 1`
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Build a query carrying this configuration's defaults
    pub fn query(&self, text: impl Into<String>) -> Query {
        Query::new(text)
            .with_max_iterations(self.default_max_iterations)
            .with_timeout(self.default_timeout)
    }
}

/// Builder for ResearchConfig
#[derive(Debug, Default)]
pub struct ResearchConfigBuilder {
    concurrency_limit: Option<usize>,
    agent_timeout: Option<Duration>,
    default_timeout: Option<Duration>,
    default_max_iterations: Option<u32>,
    retry_backoff_base: Option<Duration>,
    excerpt_chars: Option<usize>,
    model: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl ResearchConfigBuilder {
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    pub fn agent_timeout(mut self, duration: Duration) -> Self {
        self.agent_timeout = Some(duration);
        self
    }

    pub fn default_timeout(mut self, duration: Duration) -> Self {
        self.default_timeout = Some(duration);
        self
    }

    pub fn default_max_iterations(mut self, iterations: u32) -> Self {
        self.default_max_iterations = Some(iterations);
        self
    }

    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    pub fn excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = Some(chars);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ResearchConfig> {
        let defaults = ResearchConfig::default();

        let config = ResearchConfig {
            concurrency_limit: self.concurrency_limit.unwrap_or(defaults.concurrency_limit),
            agent_timeout: self.agent_timeout.unwrap_or(defaults.agent_timeout),
            default_timeout: self.default_timeout.unwrap_or(defaults.default_timeout),
            default_max_iterations: self
                .default_max_iterations
                .unwrap_or(defaults.default_max_iterations),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            excerpt_chars: self.excerpt_chars.unwrap_or(defaults.excerpt_chars),
            model: self.model.unwrap_or(defaults.model),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
        };

        config.validate()?;
        Ok(config)
    }
}
