//! Regulatory filings research agent

use super::runner::LlmRunner;
use async_trait::async_trait;
use research_core::{AgentContext, AgentKind, AgentOutput, ResearchAgent, Result};

const SYSTEM_PROMPT: &str = r#"You are a securities filings analyst.

When researching a stock:
1. Review the latest annual and quarterly reports and any current reports
2. Pull out changes in risk factors, segment results and liquidity
3. Flag restatements, going-concern language or unusual disclosures
4. Cite the filing type and period for every point you make
"#;

/// Researches regulatory filings for a single ticker
#[derive(Debug, Clone)]
pub struct FilingsAgent {
    runner: LlmRunner,
}

impl FilingsAgent {
    pub(crate) fn new(runner: LlmRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResearchAgent for FilingsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Filings
    }

    async fn run(&self, ticker: &str, context: &AgentContext) -> Result<AgentOutput> {
        let prompt = self.runner.prompts().render_research(
            self.kind(),
            ticker,
            context.attempt(),
            context.max_iterations(),
        )?;
        let mut output = self
            .runner
            .complete(self.kind(), ticker, SYSTEM_PROMPT, prompt)
            .await?;
        if output.payload.sources.is_empty() {
            output.payload.sources.push("SEC EDGAR".to_string());
        }
        Ok(output)
    }
}
