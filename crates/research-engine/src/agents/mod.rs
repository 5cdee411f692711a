//! Research agent roster
//!
//! Six research agents (news, filings, earnings, insider, patents, price)
//! run independently per ticker. The synthesis agent runs after them and
//! sees their outcomes through [`AgentContext::prior`](research_core::AgentContext::prior).

pub mod earnings;
pub mod filings;
pub mod insider;
pub mod news;
pub mod parse;
pub mod patents;
pub mod price;
pub mod synthesis;

mod runner;

pub use earnings::EarningsAgent;
pub use filings::FilingsAgent;
pub use insider::InsiderAgent;
pub use news::NewsAgent;
pub use parse::parse_payload;
pub use patents::PatentsAgent;
pub use price::PriceAgent;
pub use synthesis::SynthesisAgent;

use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::prompts::PromptRenderer;
use research_core::{AgentKind, ResearchAgent};
use research_llm::LLMProvider;
use runner::LlmRunner;
use std::sync::Arc;

/// The agents a scheduler fans out to
///
/// Research agents run once per ticker each; the optional synthesis agent
/// runs last. Registering a second agent of the same kind replaces the first.
#[derive(Clone, Default)]
pub struct AgentRoster {
    research: Vec<Arc<dyn ResearchAgent>>,
    synthesis: Option<Arc<dyn ResearchAgent>>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, routing synthesis to its own slot
    pub fn with_agent(mut self, agent: Arc<dyn ResearchAgent>) -> Self {
        let kind = agent.kind();
        if kind.is_synthesis() {
            self.synthesis = Some(agent);
        } else {
            self.research.retain(|a| a.kind() != kind);
            self.research.push(agent);
            self.research.sort_by_key(|a| a.kind());
        }
        self
    }

    /// The full language-model roster sharing one provider
    pub fn llm_backed(provider: Arc<dyn LLMProvider>, config: &ResearchConfig) -> Result<Self> {
        let prompts = PromptRenderer::new()
            .map_err(|e| ResearchError::Internal(e.to_string()))?;
        let runner = LlmRunner::new(provider, Arc::new(prompts), config);

        Ok(Self::new()
            .with_agent(Arc::new(NewsAgent::new(runner.clone())))
            .with_agent(Arc::new(FilingsAgent::new(runner.clone())))
            .with_agent(Arc::new(EarningsAgent::new(runner.clone())))
            .with_agent(Arc::new(InsiderAgent::new(runner.clone())))
            .with_agent(Arc::new(PatentsAgent::new(runner.clone())))
            .with_agent(Arc::new(PriceAgent::new(runner.clone())))
            .with_agent(Arc::new(SynthesisAgent::new(runner))))
    }

    pub fn research(&self) -> &[Arc<dyn ResearchAgent>] {
        &self.research
    }

    pub fn synthesis(&self) -> Option<&Arc<dyn ResearchAgent>> {
        self.synthesis.as_ref()
    }

    /// Registered kinds in roster order, synthesis last
    pub fn kinds(&self) -> Vec<AgentKind> {
        self.research
            .iter()
            .chain(self.synthesis.iter())
            .map(|a| a.kind())
            .collect()
    }

    /// Units scheduled per ticker
    pub fn units_per_ticker(&self) -> usize {
        self.research.len() + usize::from(self.synthesis.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.units_per_ticker() == 0
    }
}

impl std::fmt::Debug for AgentRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRoster")
            .field("kinds", &self.kinds())
            .finish()
    }
}
