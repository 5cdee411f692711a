//! Core ResearchAgent trait definition

use crate::{AgentContext, AgentKind, AgentOutput, Result};
use async_trait::async_trait;

/// Capability implemented by every research agent
///
/// An agent receives one ticker plus the shared [`AgentContext`] and either
/// produces a structured [`AgentOutput`] or fails with a typed
/// [`AgentError`](crate::AgentError). Failures are never fatal to a request:
/// the scheduler records them on the ticker's trace and moves on.
///
/// Implementations must be safe to call concurrently for different tickers.
#[async_trait]
pub trait ResearchAgent: Send + Sync {
    /// Which roster slot this agent fills
    fn kind(&self) -> AgentKind;

    /// Get the agent's name
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Research a single ticker
    ///
    /// Implementations should respect [`AgentContext::deadline`]; the
    /// scheduler abandons the call once the unit deadline passes anyway.
    async fn run(&self, ticker: &str, context: &AgentContext) -> Result<AgentOutput>;
}
