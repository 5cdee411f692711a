//! Deadline-bounded fan-out of (ticker, agent) units
//!
//! Every research agent runs once per ticker as its own task, bounded by a
//! semaphore. A ticker's synthesis unit is dispatched only after all of its
//! siblings reach a terminal state. Units share one absolute deadline; a unit
//! that has not finished by then is abandoned and traced as `timed_out`.

use crate::agents::AgentRoster;
use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::models::{AgentTrace, TickerSet, UnitResult};
use chrono::Utc;
use futures::FutureExt;
use research_core::{
    AgentContext, AgentError, AgentKind, AgentOutput, AgentStatus, PriorOutcome, ResearchAgent,
    deadline_after,
};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Slack past the deadline before the scheduler stops waiting on its tasks
pub const DEADLINE_GRACE: Duration = Duration::from_millis(250);

/// Unit results keyed by ticker, each list in roster order
pub type FanOutResults = BTreeMap<String, Vec<UnitResult>>;

/// One request's worth of work for the scheduler
#[derive(Debug, Clone)]
pub struct FanOutRequest {
    pub request_id: String,
    pub tickers: TickerSet,
    /// Shared absolute deadline, computed once at request start
    pub deadline: Instant,
    /// Budget the deadline was derived from, reported on timeout
    pub budget: Duration,
    pub max_iterations: u32,
    pub cancel: CancellationToken,
}

/// Runs every (ticker, agent) unit of a request
#[derive(Debug, Clone)]
pub struct FanOutScheduler {
    roster: Arc<AgentRoster>,
    config: Arc<ResearchConfig>,
}

/// State shared by every unit of one request
struct UnitEnv {
    request_id: String,
    deadline: Instant,
    max_iterations: u32,
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
    config: Arc<ResearchConfig>,
    done: mpsc::UnboundedSender<AgentKind>,
}

impl FanOutScheduler {
    pub fn new(roster: AgentRoster, config: Arc<ResearchConfig>) -> Self {
        Self {
            roster: Arc::new(roster),
            config,
        }
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// Number of units a request over `tickers` tickers dispatches
    pub fn total_units(&self, tickers: usize) -> usize {
        tickers * self.roster.units_per_ticker()
    }

    /// Run all units and collect their results
    ///
    /// `on_progress(done, total)` is called after each unit reaches a
    /// terminal state. Fails with `RequestTimedOut` when the deadline has
    /// already passed or the tasks overrun it by more than
    /// [`DEADLINE_GRACE`], and with `Cancelled` when the request's token
    /// fires. Dropping the in-flight tasks on either path abandons them.
    #[instrument(
        skip_all,
        fields(request_id = %request.request_id, tickers = request.tickers.len())
    )]
    pub async fn run(
        &self,
        request: &FanOutRequest,
        on_progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<FanOutResults> {
        let timed_out = || ResearchError::RequestTimedOut {
            timeout: request.budget,
        };
        if Instant::now() >= request.deadline {
            return Err(timed_out());
        }

        let total = self.total_units(request.tickers.len());
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let env = Arc::new(UnitEnv {
            request_id: request.request_id.clone(),
            deadline: request.deadline,
            max_iterations: request.max_iterations,
            cancel: request.cancel.clone(),
            permits: Arc::new(Semaphore::new(self.config.concurrency_limit)),
            config: Arc::clone(&self.config),
            done: done_tx,
        });

        info!(
            units = total,
            concurrency = self.config.concurrency_limit,
            "Dispatching research units"
        );

        let mut tickers = JoinSet::new();
        for ticker in &request.tickers {
            tickers.spawn(run_ticker(
                Arc::clone(&env),
                Arc::clone(&self.roster),
                ticker.clone(),
            ));
        }
        drop(env);

        let collect = async {
            let mut results = FanOutResults::new();
            let mut completed = 0;
            loop {
                tokio::select! {
                    biased;
                    () = request.cancel.cancelled() => {
                        return Err(ResearchError::Cancelled {
                            request_id: request.request_id.clone(),
                        });
                    }
                    Some(kind) = done_rx.recv() => {
                        completed += 1;
                        debug!(agent = %kind, completed, total, "Unit finished");
                        on_progress(completed, total);
                    }
                    joined = tickers.join_next() => match joined {
                        Some(Ok((ticker, units))) => {
                            results.insert(ticker, units);
                        }
                        Some(Err(err)) => {
                            return Err(ResearchError::Internal(format!(
                                "ticker task failed: {err}"
                            )));
                        }
                        None => return Ok(results),
                    },
                }
            }
        };

        match timeout_at(deadline_after(request.deadline, DEADLINE_GRACE), collect).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Units overran the request deadline; abandoning them");
                Err(timed_out())
            }
        }
    }
}

/// All units for one ticker: research first, then synthesis
async fn run_ticker(
    env: Arc<UnitEnv>,
    roster: Arc<AgentRoster>,
    ticker: String,
) -> (String, Vec<UnitResult>) {
    let mut units = JoinSet::new();
    for agent in roster.research() {
        units.spawn(run_unit(
            Arc::clone(&env),
            Arc::clone(agent),
            ticker.clone(),
            Vec::new(),
        ));
    }

    let mut results = Vec::with_capacity(roster.units_per_ticker());
    while let Some(joined) = units.join_next().await {
        match joined {
            Ok(unit) => results.push(unit),
            Err(err) => warn!(ticker = %ticker, error = %err, "Unit task aborted"),
        }
    }

    // Panics are caught per attempt, so a lost unit means its task was aborted
    for agent in roster.research() {
        let kind = agent.kind();
        if !results.iter().any(|u| u.kind() == kind) {
            results.push(UnitClock::start(kind).finish(
                UnitEnd::failed("unit task aborted"),
                0,
                env.config.excerpt_chars,
            ));
        }
    }
    results.sort_by_key(UnitResult::kind);

    if let Some(synthesis) = roster.synthesis() {
        let prior = results.iter().map(prior_outcome).collect();
        let unit = run_unit(Arc::clone(&env), Arc::clone(synthesis), ticker.clone(), prior).await;
        results.push(unit);
    }

    (ticker, results)
}

fn prior_outcome(unit: &UnitResult) -> PriorOutcome {
    match (&unit.output, unit.trace.status) {
        (Some(output), AgentStatus::Success) => PriorOutcome::success(output.clone()),
        (_, AgentStatus::TimedOut) => PriorOutcome::timed_out(unit.kind()),
        _ => PriorOutcome::failed(
            unit.kind(),
            unit.trace
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown failure".to_string()),
        ),
    }
}

/// One (ticker, agent) unit from permit acquisition to terminal trace
async fn run_unit(
    env: Arc<UnitEnv>,
    agent: Arc<dyn ResearchAgent>,
    ticker: String,
    prior: Vec<PriorOutcome>,
) -> UnitResult {
    let kind = agent.kind();
    let clock = UnitClock::start(kind);
    let excerpt_chars = env.config.excerpt_chars;
    let report = |unit: UnitResult| {
        let _ = env.done.send(unit.kind());
        unit
    };

    let permit = tokio::select! {
        biased;
        () = env.cancel.cancelled() => {
            return report(clock.finish(UnitEnd::failed("cancelled before dispatch"), 0, excerpt_chars));
        }
        acquired = timeout_at(env.deadline, Arc::clone(&env.permits).acquire_owned()) => match acquired {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return report(clock.finish(UnitEnd::failed("scheduler shut down"), 0, excerpt_chars));
            }
            Err(_) => {
                return report(clock.finish(
                    UnitEnd::timed_out("deadline passed before dispatch"),
                    0,
                    excerpt_chars,
                ));
            }
        },
    };

    let unit_deadline = env
        .deadline
        .min(deadline_after(Instant::now(), env.config.agent_timeout));
    let mut context = AgentContext::with_deadline(env.request_id.clone(), env.deadline)
        .with_local_deadline(unit_deadline)
        .with_max_iterations(env.max_iterations)
        .with_prior(prior);
    let max_attempts = context.max_iterations();
    let mut attempts = 0;

    let outcome = timeout_at(unit_deadline, async {
        loop {
            attempts += 1;
            context.set_attempt(attempts);

            let result = AssertUnwindSafe(agent.run(&ticker, &context))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(AgentError::Generic(panic_message(&*panic))));

            match result {
                Ok(output) => return Ok(output),
                Err(err) if err.is_retryable() && attempts < max_attempts => {
                    let backoff = env.config.retry_backoff(attempts);
                    if deadline_after(Instant::now(), backoff) >= unit_deadline
                        || env.cancel.is_cancelled()
                    {
                        return Err(err);
                    }
                    debug!(ticker = %ticker, agent = %kind, attempts, error = %err, "Retrying unit");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    })
    .await;
    drop(permit);

    let end = match outcome {
        Ok(Ok(output)) => UnitEnd::success(output),
        Ok(Err(AgentError::TimedOut)) => UnitEnd::timed_out(AgentError::TimedOut.to_string()),
        Ok(Err(err)) => UnitEnd::failed(err.to_string()),
        Err(_) if unit_deadline < env.deadline => UnitEnd::timed_out(format!(
            "exceeded agent timeout of {:.1}s",
            env.config.agent_timeout.as_secs_f64()
        )),
        Err(_) => UnitEnd::timed_out("request deadline passed"),
    };

    match (&end.status, &end.error) {
        (AgentStatus::Success, _) => {
            debug!(ticker = %ticker, agent = %kind, attempts, "Unit succeeded");
        }
        (status, error) => {
            warn!(ticker = %ticker, agent = %kind, attempts, ?status, error = ?error, "Unit did not succeed");
        }
    }

    report(clock.finish(end, attempts, excerpt_chars))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("agent panicked: {detail}")
}

/// Terminal state of a unit before it becomes a trace
struct UnitEnd {
    status: AgentStatus,
    output: Option<AgentOutput>,
    error: Option<String>,
}

impl UnitEnd {
    fn success(output: AgentOutput) -> Self {
        Self {
            status: AgentStatus::Success,
            output: Some(output),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }

    fn timed_out(error: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::TimedOut,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Wall-clock and monotonic start of a unit
struct UnitClock {
    kind: AgentKind,
    started_at: chrono::DateTime<Utc>,
    started: Instant,
}

impl UnitClock {
    fn start(kind: AgentKind) -> Self {
        Self {
            kind,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    fn finish(self, end: UnitEnd, attempts: u32, excerpt_chars: usize) -> UnitResult {
        let raw_output_excerpt = end
            .output
            .as_ref()
            .map(|o| o.excerpt(excerpt_chars))
            .unwrap_or_default();

        UnitResult {
            trace: AgentTrace {
                agent_type: self.kind,
                started_at: self.started_at,
                completed_at: Utc::now(),
                latency_ms: self.started.elapsed().as_secs_f64() * 1000.0,
                status: end.status,
                attempts,
                raw_output_excerpt,
                error_message: end.error,
            },
            output: end.output,
        }
    }
}
