//! Jinja prompt templates for language-model agents

use minijinja::{Environment, context};
use research_core::{AgentError, AgentKind, AgentStatus, PriorOutcome};
use serde::Serialize;

const RESEARCH_TEMPLATE: &str = r#"Research the stock {{ ticker }} from the {{ agent }} angle.
Focus: {{ focus }}
{% if attempt > 1 %}
This is attempt {{ attempt }} of {{ max_attempts }}; the previous answer could not be used.
{% endif %}
Respond with a single JSON object using these keys:
  "summary": two or three sentences,
  "company_name": the company's name if you know it,
  "key_drivers": list of short strings,
  "risks": list of short strings,
  "catalysts": list of short strings,
  "sources": list of source names or URLs you relied on.
Use empty lists when you have nothing to report. Do not invent facts."#;

const SYNTHESIS_TEMPLATE: &str = r#"Combine the research below on {{ ticker }} into an investment view.
{% for outcome in outcomes %}
[{{ outcome.agent }}] {% if outcome.summary %}{{ outcome.summary }}{% else %}unavailable ({{ outcome.status }}{% if outcome.error %}: {{ outcome.error }}{% endif %}){% endif %}
{%- if outcome.drivers %}
  drivers: {{ outcome.drivers | join("; ") }}{% endif %}
{%- if outcome.risks %}
  risks: {{ outcome.risks | join("; ") }}{% endif %}
{% endfor %}
{% if available == 0 %}
No research agent returned data. Say so and keep confidence low.
{% endif %}
Respond with a single JSON object using these keys:
  "summary": two or three sentences,
  "company_name": the company's name,
  "key_drivers", "risks", "catalysts": lists of short strings,
  "stance": one of "buy", "hold", "sell",
  "confidence": one of "low", "medium", "high",
  "rationale": why the evidence supports the stance."#;

#[derive(Serialize)]
struct OutcomeView<'a> {
    agent: &'a str,
    status: &'a str,
    summary: Option<&'a str>,
    error: Option<&'a str>,
    drivers: &'a [String],
    risks: &'a [String],
}

impl<'a> From<&'a PriorOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a PriorOutcome) -> Self {
        let payload = outcome.output.as_ref().map(|o| &o.payload);
        Self {
            agent: outcome.kind.as_str(),
            status: match outcome.status {
                AgentStatus::Success => "success",
                AgentStatus::Failed => "failed",
                AgentStatus::TimedOut => "timed out",
            },
            summary: payload
                .map(|p| p.summary.as_str())
                .filter(|s| !s.trim().is_empty()),
            error: outcome.error.as_deref(),
            drivers: payload.map(|p| p.key_drivers.as_slice()).unwrap_or_default(),
            risks: payload.map(|p| p.risks.as_slice()).unwrap_or_default(),
        }
    }
}

/// Renders user prompts for each agent kind
#[derive(Debug)]
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, AgentError> {
        let mut env = Environment::new();
        env.add_template("research", RESEARCH_TEMPLATE)
            .map_err(template_error)?;
        env.add_template("synthesis", SYNTHESIS_TEMPLATE)
            .map_err(template_error)?;
        Ok(Self { env })
    }

    /// Prompt for one research agent attempt
    pub fn render_research(
        &self,
        kind: AgentKind,
        ticker: &str,
        attempt: u32,
        max_attempts: u32,
    ) -> Result<String, AgentError> {
        let template = self.env.get_template("research").map_err(template_error)?;
        template
            .render(context! {
                ticker => ticker,
                agent => kind.as_str(),
                focus => focus(kind),
                attempt => attempt,
                max_attempts => max_attempts,
            })
            .map_err(template_error)
    }

    /// Prompt for synthesis given every sibling outcome
    pub fn render_synthesis(
        &self,
        ticker: &str,
        prior: &[PriorOutcome],
    ) -> Result<String, AgentError> {
        let outcomes: Vec<OutcomeView<'_>> = prior.iter().map(OutcomeView::from).collect();
        let available = outcomes.iter().filter(|o| o.summary.is_some()).count();
        let template = self.env.get_template("synthesis").map_err(template_error)?;
        template
            .render(context! {
                ticker => ticker,
                outcomes => outcomes,
                available => available,
            })
            .map_err(template_error)
    }
}

fn focus(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::News => "recent headlines, press releases and the sentiment they carry",
        AgentKind::Filings => "10-K, 10-Q and 8-K disclosures, risk factors and material changes",
        AgentKind::Earnings => "the latest earnings call, guidance changes and analyst questions",
        AgentKind::Insider => "insider buying and selling, ownership changes and 13F holdings",
        AgentKind::Patents => "patent grants, research publications and innovation pipeline",
        AgentKind::Price => "price trend, volatility, momentum and notable technical levels",
        AgentKind::Synthesis => "an overall investment stance",
    }
}

fn template_error(err: minijinja::Error) -> AgentError {
    AgentError::Generic(format!("prompt template error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_core::{AgentOutput, AgentPayload};

    #[test]
    fn test_research_prompt() {
        let renderer = PromptRenderer::new().unwrap();
        let prompt = renderer
            .render_research(AgentKind::Insider, "NVDA", 1, 3)
            .unwrap();
        assert!(prompt.contains("NVDA"));
        assert!(prompt.contains("insider"));
        assert!(prompt.contains("13F"));
        assert!(!prompt.contains("attempt 1 of 3"));
    }

    #[test]
    fn test_retry_prompt_mentions_attempt() {
        let renderer = PromptRenderer::new().unwrap();
        let prompt = renderer
            .render_research(AgentKind::News, "AAPL", 2, 3)
            .unwrap();
        assert!(prompt.contains("attempt 2 of 3"));
    }

    #[test]
    fn test_synthesis_prompt_lists_outcomes() {
        let renderer = PromptRenderer::new().unwrap();
        let news = AgentOutput::new(
            AgentKind::News,
            AgentPayload::summary("Strong datacenter demand").with_risk("export controls"),
        );
        let prior = vec![
            PriorOutcome::success(news),
            PriorOutcome::failed(AgentKind::Filings, "EDGAR unavailable"),
            PriorOutcome::timed_out(AgentKind::Price),
        ];

        let prompt = renderer.render_synthesis("NVDA", &prior).unwrap();
        assert!(prompt.contains("[news] Strong datacenter demand"));
        assert!(prompt.contains("risks: export controls"));
        assert!(prompt.contains("[filings] unavailable (failed: EDGAR unavailable)"));
        assert!(prompt.contains("[price] unavailable (timed out"));
        assert!(!prompt.contains("No research agent returned data"));
    }

    #[test]
    fn test_synthesis_prompt_without_data() {
        let renderer = PromptRenderer::new().unwrap();
        let prior = vec![PriorOutcome::failed(AgentKind::News, "down")];
        let prompt = renderer.render_synthesis("TSM", &prior).unwrap();
        assert!(prompt.contains("No research agent returned data"));
    }
}
