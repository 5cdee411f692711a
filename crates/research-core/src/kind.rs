//! Agent roster

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Agent variants
///
/// Six research agents gather information independently; `Synthesis` runs
/// last for a ticker and turns their outcomes into a stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    News,
    Filings,
    Earnings,
    Insider,
    Patents,
    Price,
    Synthesis,
}

impl AgentKind {
    /// The research agents, in roster order (synthesis excluded)
    pub const RESEARCH: [AgentKind; 6] = [
        AgentKind::News,
        AgentKind::Filings,
        AgentKind::Earnings,
        AgentKind::Insider,
        AgentKind::Patents,
        AgentKind::Price,
    ];

    /// Stable lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Filings => "filings",
            Self::Earnings => "earnings",
            Self::Insider => "insider",
            Self::Patents => "patents",
            Self::Price => "price",
            Self::Synthesis => "synthesis",
        }
    }

    /// Whether this agent depends on its siblings' outcomes
    pub fn is_synthesis(&self) -> bool {
        matches!(self, Self::Synthesis)
    }

    /// One-line description for agent listings
    pub fn description(&self) -> &'static str {
        match self {
            Self::News => "Searches for recent news articles and press releases",
            Self::Filings => "Analyzes SEC filings and regulatory documents",
            Self::Earnings => "Reviews earnings calls and transcripts",
            Self::Insider => "Tracks insider trading and ownership changes",
            Self::Patents => "Researches patents and academic papers",
            Self::Price => "Analyzes price movements and technical factors",
            Self::Synthesis => "Combines research outcomes into a stance and rationale",
        }
    }

    /// Capability tags advertised for this agent
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            Self::News => &["web_search", "news_aggregation", "sentiment_analysis"],
            Self::Filings => &["sec_edgar_access", "document_parsing", "financial_analysis"],
            Self::Earnings => &["transcript_analysis", "earnings_data", "guidance_extraction"],
            Self::Insider => &[
                "insider_trading_data",
                "ownership_analysis",
                "institutional_holdings",
            ],
            Self::Patents => &["patent_search", "academic_research", "innovation_tracking"],
            Self::Price => &["price_analysis", "technical_indicators", "market_sentiment"],
            Self::Synthesis => &["evidence_weighing", "stance_selection", "rationale_writing"],
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(Self::News),
            "filings" => Ok(Self::Filings),
            "earnings" => Ok(Self::Earnings),
            "insider" => Ok(Self::Insider),
            "patents" => Ok(Self::Patents),
            "price" => Ok(Self::Price),
            "synthesis" => Ok(Self::Synthesis),
            other => Err(format!("unknown agent type: {other}")),
        }
    }
}
