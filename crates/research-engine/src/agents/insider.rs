//! Insider activity research agent

use super::runner::LlmRunner;
use async_trait::async_trait;
use research_core::{AgentContext, AgentKind, AgentOutput, ResearchAgent, Result};

const SYSTEM_PROMPT: &str = r#"You are an ownership and insider activity analyst.

When researching a stock:
1. Summarize recent insider purchases and sales, with roles where known
2. Distinguish planned sales from discretionary transactions
3. Note significant changes in institutional ownership
4. Say plainly when activity is routine and carries little signal
"#;

/// Researches insider activity for a single ticker
#[derive(Debug, Clone)]
pub struct InsiderAgent {
    runner: LlmRunner,
}

impl InsiderAgent {
    pub(crate) fn new(runner: LlmRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResearchAgent for InsiderAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Insider
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
