//! Patents and academic research agent

use super::runner::LlmRunner;
use async_trait::async_trait;
use research_core::{AgentContext, AgentKind, AgentOutput, ResearchAgent, Result};

const SYSTEM_PROMPT: &str = r#"You are an innovation analyst tracking patents and research output.

When researching a stock:
1. Identify recent patent grants and filings in the company's core areas
2. Note research publications or partnerships that signal new products
3. Assess how defensible the company's technology position looks
4. Mention competitors with overlapping portfolios when relevant
"#;

/// Tracks patent activity and research output for a single ticker
#[derive(Debug, Clone)]
pub struct PatentsAgent {
    runner: LlmRunner,
}

impl PatentsAgent {
    pub(crate) fn new(runner: LlmRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResearchAgent for PatentsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Patents
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
