//! Agent output types

use crate::AgentKind;
use serde::{Deserialize, Serialize};

/// Investment stance produced by synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Buy,
    #[default]
    Hold,
    Sell,
}

/// Confidence attached to a stance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

/// Terminal state of one (ticker, agent) unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Success,
    Failed,
    TimedOut,
}

impl AgentStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Structured fields an agent contributes to an insight
///
/// Every field is optional on the wire so that partially structured model
/// responses still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPayload {
    pub summary: String,
    pub company_name: Option<String>,
    pub key_drivers: Vec<String>,
    pub risks: Vec<String>,
    pub catalysts: Vec<String>,
    pub sources: Vec<String>,
    pub stance: Option<Stance>,
    pub confidence: Option<Confidence>,
    pub rationale: Option<String>,
}

impl AgentPayload {
    /// Payload carrying only a summary
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.key_drivers.push(driver.into());
        self
    }

    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risks.push(risk.into());
        self
    }

    pub fn with_catalyst(mut self, catalyst: impl Into<String>) -> Self {
        self.catalysts.push(catalyst.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn with_stance(mut self, stance: Stance, confidence: Confidence) -> Self {
        self.stance = Some(stance);
        self.confidence = Some(confidence);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Successful result of one agent attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub kind: AgentKind,
    pub payload: AgentPayload,
    /// Unparsed text the agent produced, kept for trace excerpts
    pub raw_text: String,
}

impl AgentOutput {
    pub fn new(kind: AgentKind, payload: AgentPayload) -> Self {
        let raw_text = payload.summary.clone();
        Self {
            kind,
            payload,
            raw_text,
        }
    }

    pub fn with_raw_text(mut self, raw_text: impl Into<String>) -> Self {
        self.raw_text = raw_text.into();
        self
    }

    /// First `max_chars` characters of the raw text
    pub fn excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.raw_text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}…")
        } else {
            head
        }
    }
}
