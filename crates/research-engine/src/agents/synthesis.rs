//! Synthesis agent: turns sibling outcomes into a stance

use super::runner::LlmRunner;
use async_trait::async_trait;
use research_core::{AgentContext, AgentError, AgentKind, AgentOutput, ResearchAgent, Result};

const SYSTEM_PROMPT: &str = r#"You are a senior equity analyst writing the final view on a stock.

You receive notes from specialist researchers. Some may be missing because a
source failed or ran out of time; treat missing evidence as uncertainty, not
as a negative signal.

Guidelines:
- Weigh the evidence and pick exactly one stance: buy, hold or sell
- Confidence must reflect how complete and consistent the evidence is
- The rationale must point at specific findings from the notes
- Never introduce facts that are not in the notes
"#;

/// Combines the research outcomes for one ticker
#[derive(Debug, Clone)]
pub struct SynthesisAgent {
    runner: LlmRunner,
}

impl SynthesisAgent {
    pub(crate) fn new(runner: LlmRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ResearchAgent for SynthesisAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Synthesis
    }

    async fn run(&self, ticker: &str, context: &AgentContext) -> Result<AgentOutput> {
        let prompt = self
            .runner
            .prompts()
            .render_synthesis(ticker, context.prior())?;
        let output = self
            .runner
            .complete(self.kind(), ticker, SYSTEM_PROMPT, prompt)
            .await?;

        if output.payload.stance.is_none() {
            return Err(AgentError::InvalidResponse(
                "synthesis reply did not include a stance".to_string(),
            ));
        }
        Ok(output)
    }
}
