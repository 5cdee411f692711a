//! Earnings research agent

use super::runner::LlmRunner;
use async_trait::async_trait;
use research_core::{AgentContext, AgentKind, AgentOutput, ResearchAgent, Result};

const SYSTEM_PROMPT: &str = r#"You are an earnings analyst.

When researching a stock:
1. Compare the latest results with consensus expectations
2. Summarize guidance and how it changed from the prior quarter
3. Note what management emphasized on the call and what analysts pressed on
4. Identify the metrics the market is likely to watch next quarter
"#;

/// Researches earnings for a single ticker
#[derive(Debug, Clone)]
pub struct EarningsAgent {
    runner: LlmRunner,
}

impl EarningsAgent {
    pub(crate) fn new(runner: LlmRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResearchAgent for EarningsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Earnings
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
