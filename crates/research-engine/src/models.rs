//! Request, trace, insight and result types

use chrono::{DateTime, Utc};
use research_core::{AgentKind, AgentOutput, AgentStatus, Confidence, Stance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Default bound on per-unit attempts
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Default end-to-end budget for one request
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Validated, uppercase ticker symbols
pub type TickerSet = BTreeSet<String>;

/// A free-text research query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_timeout_seconds() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl Query {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = timeout.as_secs_f64();
        self
    }

    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Budget as a duration; negative or non-finite values collapse to zero
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Record of one (ticker, agent) unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTrace {
    pub agent_type: AgentKind,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub latency_ms: f64,
    pub status: AgentStatus,
    /// Attempts made before the unit reached its terminal state
    pub attempts: u32,
    pub raw_output_excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A unit's trace plus its output when it succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
    pub trace: AgentTrace,
    pub output: Option<AgentOutput>,
}

impl UnitResult {
    pub fn kind(&self) -> AgentKind {
        self.trace.agent_type
    }

    pub fn succeeded(&self) -> bool {
        self.trace.status.is_success() && self.output.is_some()
    }
}

/// Final structured view on one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerInsight {
    pub ticker: String,
    pub company_name: String,
    pub summary: String,
    pub key_drivers: Vec<String>,
    pub risks: Vec<String>,
    pub catalysts: Vec<String>,
    pub stance: Stance,
    pub confidence: Confidence,
    pub rationale: String,
    pub sources: Vec<String>,
    pub agent_traces: Vec<AgentTrace>,
}

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestStatus {
    pub request_id: String,
    pub status: RequestState,
    /// Percentage in `[0, 100]`
    pub progress: f32,
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestStatus {
    pub fn processing(request_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            request_id: request_id.into(),
            status: RequestState::Processing,
            progress: 0.0,
            current_step: "Initializing analysis".to_string(),
            error: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// Outcome of a successful request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub request_id: String,
    pub query: String,
    pub insights: Vec<TickerInsight>,
    pub total_latency_ms: f64,
    pub tickers_analyzed: Vec<String>,
    pub agents_used: Vec<AgentKind>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Agent kinds that appear in any trace, deduplicated
    pub fn collect_agents(insights: &[TickerInsight]) -> Vec<AgentKind> {
        insights
            .iter()
            .flat_map(|i| i.agent_traces.iter().map(|t| t.agent_type))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn insight(&self, ticker: &str) -> Option<&TickerInsight> {
        self.insights.iter().find(|i| i.ticker == ticker)
    }
}

/// Answer to a result lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ResultLookup {
    Completed(std::sync::Arc<AnalysisResult>),
    Pending(RequestStatus),
}
