//! Scripted agents for scheduler and orchestrator tests

use crate::agents::AgentRoster;
use async_trait::async_trait;
use research_core::{
    AgentContext, AgentError, AgentKind, AgentOutput, AgentPayload, Confidence, ResearchAgent,
    Result, Stance,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Script {
    Succeed,
    Fail(AgentError),
    Sleep(Duration),
    /// Fail with a retryable error this many times, then succeed
    Flaky(u32),
    Panic,
}

/// Tracks how many agent calls are running at once
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedAgent {
    kind: AgentKind,
    script: Script,
    calls: AtomicU32,
    delay: Duration,
    in_flight: Option<Arc<InFlight>>,
}

impl ScriptedAgent {
    pub(crate) fn new(kind: AgentKind, script: Script) -> Self {
        Self {
            kind,
            script,
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            in_flight: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn tracking(mut self, in_flight: Arc<InFlight>) -> Self {
        self.in_flight = Some(in_flight);
        self
    }

    fn output(&self, ticker: &str, context: &AgentContext) -> AgentOutput {
        if self.kind.is_synthesis() {
            let available = context.successful_outputs().count();
            let payload = AgentPayload::summary(format!(
                "{ticker}: {available} of {} sources available",
                context.prior().len()
            ))
            .with_company_name(format!("{ticker} Corp"))
            .with_driver("synthesized driver")
            .with_stance(Stance::Buy, Confidence::Medium)
            .with_rationale("evidence was consistent");
            return AgentOutput::new(self.kind, payload);
        }

        let payload = AgentPayload::summary(format!("{} finding for {ticker}", self.kind))
            .with_driver(format!("{} driver", self.kind))
            .with_risk("shared risk")
            .with_source(format!("https://example.com/{}/{ticker}", self.kind));
        AgentOutput::new(self.kind, payload)
    }

    async fn act(&self, ticker: &str, context: &AgentContext) -> Result<AgentOutput> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.script {
            Script::Succeed => Ok(self.output(ticker, context)),
            Script::Fail(err) => Err(err.clone()),
            Script::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(self.output(ticker, context))
            }
            Script::Flaky(failures) if call <= *failures => {
                Err(AgentError::Upstream(format!("flaky failure #{call}")))
            }
            Script::Flaky(_) => Ok(self.output(ticker, context)),
            Script::Panic => panic!("scripted agent blew up"),
        }
    }
}

#[async_trait]
impl ResearchAgent for ScriptedAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn run(&self, ticker: &str, context: &AgentContext) -> Result<AgentOutput> {
        if let Some(in_flight) = &self.in_flight {
            in_flight.enter();
        }
        let result = self.act(ticker, context).await;
        if let Some(in_flight) = &self.in_flight {
            in_flight.exit();
        }
        result
    }
}

/// Every research agent plus synthesis, all following `script`
pub(crate) fn uniform_roster(script: &Script) -> AgentRoster {
    AgentKind::RESEARCH
        .into_iter()
        .chain([AgentKind::Synthesis])
        .fold(AgentRoster::new(), |roster, kind| {
            roster.with_agent(Arc::new(ScriptedAgent::new(kind, script.clone())))
        })
}
