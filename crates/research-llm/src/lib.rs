//! Language-model provider seam for research agents
//!
//! This crate provides provider-agnostic abstractions for the agents that
//! summarize research through a language model:
//!
//! - Message and completion request/response types
//! - The [`LLMProvider`] trait agents are written against
//! - An OpenAI-compatible provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
pub use error::{LLMError, Result};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
