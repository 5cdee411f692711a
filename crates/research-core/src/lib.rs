//! Core abstractions for stock research agents
//!
//! This crate defines the capability every research agent implements and the
//! values that flow between agents and the orchestration layer:
//!
//! - [`ResearchAgent`]: `run(ticker, context) -> AgentOutput | AgentError`
//! - [`AgentKind`]: the closed roster of agent variants
//! - [`AgentContext`]: shared deadline, retry budget and sibling outcomes
//! - [`AgentOutput`] / [`AgentPayload`]: structured agent results

pub mod agent;
pub mod context;
pub mod error;
pub mod kind;
pub mod output;

pub use agent::ResearchAgent;
pub use context::{AgentContext, MAX_DEADLINE_SPAN, PriorOutcome, deadline_after};
pub use error::{AgentError, Result};
pub use kind::AgentKind;
pub use output::{AgentOutput, AgentPayload, AgentStatus, Confidence, Stance};
