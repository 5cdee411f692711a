//! Price action research agent

use super::runner::LlmRunner;
use async_trait::async_trait;
use research_core::{AgentContext, AgentKind, AgentOutput, ResearchAgent, Result};

const SYSTEM_PROMPT: &str = r#"You are a market technician.

When researching a stock:
1. Describe the recent price trend and how it compares with the broad market
2. Comment on volatility, volume and momentum
3. Identify notable support and resistance levels
4. Keep the analysis descriptive; do not recommend trades
"#;

/// Researches price action for a single ticker
#[derive(Debug, Clone)]
pub struct PriceAgent {
    runner: LlmRunner,
}

impl PriceAgent {
    pub(crate) fn new(runner: LlmRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResearchAgent for PriceAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Price
    }

    async fn run(&self, ticker: &str, context: &AgentContext) -> Result<AgentOutput> {
        let prompt = self.runner.prompts().render_research(
            self.kind(),
            ticker,
            context.attempt(),
            context.max_iterations(),
        )?;
        let output = self
            .runner
            .complete(self.kind(), ticker, SYSTEM_PROMPT, prompt)
            .await?;
        Ok(output)
    }
}
