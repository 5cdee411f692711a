//! News and sentiment research agent

use super::runner::LlmRunner;
use async_trait::async_trait;
use research_core::{AgentContext, AgentKind, AgentOutput, ResearchAgent, Result};

const SYSTEM_PROMPT: &str = r#"You are a news and sentiment analyst covering listed companies.

When researching a stock:
1. Identify the most material headlines and press releases of recent weeks
2. Separate company-specific news from market-wide noise
3. Assess whether the news flow is positive, negative or neutral
4. Note upcoming events the news points to

Be objective. Report only what the coverage supports.
"#;

/// Researches news and sentiment for a single ticker
#[derive(Debug, Clone)]
pub struct NewsAgent {
    runner: LlmRunner,
}

impl NewsAgent {
    pub(crate) fn new(runner: LlmRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResearchAgent for NewsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::News
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
