//! Stock research orchestration
//!
//! This crate turns a free-text research question into one structured
//! insight per ticker by fanning work out to a roster of research agents:
//!
//! - Ticker extraction from natural language (`"Compare NVDA, AMD, and TSM"`)
//! - Bounded-concurrency fan-out of every (ticker, agent) unit under one
//!   shared deadline, with per-agent timeouts and retry rounds
//! - Partial-failure tolerant aggregation: failed or timed-out agents
//!   degrade an insight instead of failing the request
//! - Request status tracking with progress milestones and cancellation
//!
//! # Architecture
//!
//! The [`Orchestrator`] owns a [`TickerExtractor`], a [`FanOutScheduler`],
//! an [`InsightAggregator`] and a shared [`StatusTracker`]. Agents implement
//! [`research_core::ResearchAgent`]; [`AgentRoster::llm_backed`] builds the
//! standard roster on top of any [`research_llm::LLMProvider`].
//!
//! # Example
//!
//! ```rust,ignore
//! use research_engine::{AgentRoster, Orchestrator, ResearchConfig};
//! use research_llm::providers::OpenAIProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ResearchConfig::from_env()?;
//!     let provider = Arc::new(OpenAIProvider::from_env()?);
//!     let roster = AgentRoster::llm_backed(provider, &config)?;
//!
//!     let orchestrator = Orchestrator::new(roster, config.clone());
//!     let result = orchestrator
//!         .start_analysis(config.query("Analyze AAPL and MSFT for growth potential"))
//!         .await?;
//!
//!     for insight in result.insights {
//!         println!("{} -> {:?} ({:?})", insight.ticker, insight.stance, insight.confidence);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod scheduler;
pub mod status;
pub mod ticker;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use agents::AgentRoster;
pub use aggregator::InsightAggregator;
pub use config::{ResearchConfig, ResearchConfigBuilder};
pub use error::{ErrorKind, ResearchError, Result};
pub use models::{
    AgentTrace, AnalysisResult, Query, RequestState, RequestStatus, ResultLookup, TickerInsight,
    TickerSet, UnitResult,
};
pub use orchestrator::Orchestrator;
pub use scheduler::{FanOutRequest, FanOutResults, FanOutScheduler};
pub use status::{StatusTracker, StatusUpdate};
pub use ticker::TickerExtractor;
