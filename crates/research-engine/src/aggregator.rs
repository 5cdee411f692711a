//! Folding a ticker's unit results into one insight
//!
//! Aggregation never fails. Missing research thins the insight out; a missing
//! synthesis falls back to a conservative `hold` with `low` confidence.

use crate::models::{TickerInsight, UnitResult};
use research_core::{AgentOutput, AgentStatus, Confidence, Stance};
use std::collections::HashSet;

/// Builds [`TickerInsight`]s from scheduler output
#[derive(Debug, Clone, Default)]
pub struct InsightAggregator;

impl InsightAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate every unit result for `ticker`
    ///
    /// Lists are merged in roster order with duplicates removed. Summary,
    /// company name, stance and rationale come from synthesis when it
    /// succeeded. Every trace is kept, failed ones included.
    pub fn aggregate(&self, ticker: &str, units: Vec<UnitResult>) -> TickerInsight {
        let (synthesis, research): (Vec<_>, Vec<_>) = units
            .iter()
            .filter_map(|u| u.output.as_ref().filter(|_| u.succeeded()))
            .partition(|o| o.kind.is_synthesis());
        let synthesis = synthesis.into_iter().next();

        // Synthesis first so that its curated lists lead
        let contributors: Vec<&AgentOutput> = synthesis
            .iter()
            .copied()
            .chain(research.iter().copied())
            .collect();

        let summary = match synthesis.map(|o| o.payload.summary.trim()) {
            Some(summary) if !summary.is_empty() => summary.to_string(),
            _ => research_summary(ticker, &research),
        };

        let company_name = contributors
            .iter()
            .filter_map(|o| o.payload.company_name.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(ticker)
            .to_string();

        let (stance, confidence, rationale) = match synthesis {
            Some(output) => (
                output.payload.stance.unwrap_or_default(),
                output.payload.confidence.unwrap_or_default(),
                output
                    .payload
                    .rationale
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| "Synthesis gave no rationale.".to_string()),
            ),
            None => (
                Stance::Hold,
                Confidence::Low,
                fallback_rationale(&units, research.len()),
            ),
        };

        let key_drivers = merge(&contributors, |o| &o.payload.key_drivers);
        let risks = merge(&contributors, |o| &o.payload.risks);
        let catalysts = merge(&contributors, |o| &o.payload.catalysts);
        let sources = merge(&contributors, |o| &o.payload.sources);

        TickerInsight {
            ticker: ticker.to_string(),
            company_name,
            summary,
            key_drivers,
            risks,
            catalysts,
            stance,
            confidence,
            rationale,
            sources,
            agent_traces: units.into_iter().map(|u| u.trace).collect(),
        }
    }
}

fn research_summary(ticker: &str, research: &[&AgentOutput]) -> String {
    let parts: Vec<&str> = research
        .iter()
        .map(|o| o.payload.summary.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        format!("No research agents returned data for {ticker}.")
    } else {
        parts.join(" ")
    }
}

fn fallback_rationale(units: &[UnitResult], succeeded: usize) -> String {
    let reason = units
        .iter()
        .find(|u| u.kind().is_synthesis())
        .map_or("not run".to_string(), |u| match u.trace.status {
            AgentStatus::TimedOut => "timed out".to_string(),
            _ => u
                .trace
                .error_message
                .clone()
                .unwrap_or_else(|| "failed".to_string()),
        });
    format!(
        "Synthesis unavailable ({reason}); defaulting to hold with low confidence based on {succeeded} of {} research agents.",
        units.iter().filter(|u| !u.kind().is_synthesis()).count()
    )
}

/// Concatenate a list field across outputs, keeping first occurrences
fn merge<'a>(
    outputs: &[&'a AgentOutput],
    field: impl Fn(&'a AgentOutput) -> &'a Vec<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    outputs
        .iter()
        .flat_map(|o| field(*o).iter())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(s.to_ascii_lowercase()))
        .map(str::to_string)
        .collect()
}
