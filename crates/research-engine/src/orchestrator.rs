//! Request-level orchestration
//!
//! The [`Orchestrator`] drives one request through
//! `validating -> fanning_out -> aggregating -> completed`, recording each
//! milestone in the [`StatusTracker`]. Any step may end the request as
//! `failed`; an external [`Orchestrator::cancel`] ends it as `cancelled`.

use crate::agents::AgentRoster;
use crate::aggregator::InsightAggregator;
use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::models::{AnalysisResult, Query, RequestStatus, ResultLookup, TickerInsight, TickerSet};
use crate::scheduler::{FanOutRequest, FanOutScheduler};
use crate::status::{StatusTracker, StatusUpdate};
use crate::ticker::TickerExtractor;
use chrono::Utc;
use research_core::deadline_after;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

const PROGRESS_EXTRACTING: f32 = 10.0;
const PROGRESS_DISPATCHING: f32 = 20.0;
const PROGRESS_FAN_OUT_SPAN: f32 = 65.0;
const PROGRESS_AGGREGATING: f32 = 90.0;

/// Entry point for stock research requests
///
/// # Example
///
/// ```no_run
/// use research_engine::{AgentRoster, Orchestrator, ResearchConfig};
///
/// # async fn run(roster: AgentRoster) -> research_engine::Result<()> {
/// let config = ResearchConfig::default();
/// let orchestrator = Orchestrator::new(roster, config.clone());
///
/// let result = orchestrator
///     .start_analysis(config.query("Compare NVDA, AMD, and TSM for AI datacenter demand"))
///     .await?;
/// for insight in &result.insights {
///     println!("{}: {:?}", insight.ticker, insight.stance);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Orchestrator {
    extractor: TickerExtractor,
    scheduler: FanOutScheduler,
    aggregator: InsightAggregator,
    tracker: Arc<StatusTracker>,
    config: Arc<ResearchConfig>,
}

impl Orchestrator {
    pub fn new(roster: AgentRoster, config: ResearchConfig) -> Self {
        let config = Arc::new(config);
        Self {
            extractor: TickerExtractor::new(),
            scheduler: FanOutScheduler::new(roster, Arc::clone(&config)),
            aggregator: InsightAggregator::new(),
            tracker: Arc::new(StatusTracker::new()),
            config,
        }
    }

    /// Share a status tracker with other orchestrators or readers
    pub fn with_tracker(mut self, tracker: Arc<StatusTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<StatusTracker> {
        &self.tracker
    }

    pub fn roster(&self) -> &AgentRoster {
        self.scheduler.roster()
    }

    /// Tickers the orchestrator would research for `query`
    pub fn extract_tickers(&self, query: &str) -> TickerSet {
        self.extractor.extract(query)
    }

    pub fn new_request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Run a full analysis under a fresh request id
    pub async fn start_analysis(&self, query: Query) -> Result<AnalysisResult> {
        self.start_analysis_with_id(&Self::new_request_id(), query)
            .await
    }

    /// Run a full analysis under a caller-chosen request id
    ///
    /// The id is registered before any validation so that status readers
    /// can follow the request from its first milestone. The call resolves
    /// once the request completes, fails, times out or is cancelled.
    #[instrument(skip(self, query), fields(query = %query.query))]
    pub async fn start_analysis_with_id(
        &self,
        request_id: &str,
        query: Query,
    ) -> Result<AnalysisResult> {
        let started = Instant::now();
        let started_at = Utc::now();
        let budget = query.timeout();
        let deadline = deadline_after(started, budget);

        let cancel = self.tracker.create(request_id)?;
        info!(
            timeout_secs = budget.as_secs_f64(),
            max_iterations = query.max_iterations,
            "Analysis started"
        );

        let outcome = self
            .drive(request_id, &query, deadline, budget, cancel)
            .await;

        match outcome {
            Ok(insights) => {
                let tickers_analyzed = insights.iter().map(|i| i.ticker.clone()).collect();
                let result = AnalysisResult {
                    request_id: request_id.to_string(),
                    query: query.query,
                    agents_used: AnalysisResult::collect_agents(&insights),
                    insights,
                    total_latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                    tickers_analyzed,
                    started_at,
                    completed_at: Utc::now(),
                };

                if let Err(err) = self.tracker.complete(request_id, Arc::new(result.clone())) {
                    // Lost a race with cancel; the tracker already says cancelled
                    warn!(error = %err, "Finished after the request became terminal");
                    return Err(ResearchError::Cancelled {
                        request_id: request_id.to_string(),
                    });
                }

                info!(
                    tickers = result.tickers_analyzed.len(),
                    latency_ms = result.total_latency_ms,
                    "Analysis complete"
                );
                Ok(result)
            }
            Err(err @ ResearchError::Cancelled { .. }) => {
                info!("Analysis stopped by cancellation");
                Err(err)
            }
            Err(err) => {
                error!(error = %err, kind = ?err.kind(), "Analysis failed");
                if let Err(tracker_err) = self.tracker.fail(request_id, err.to_string()) {
                    warn!(error = %tracker_err, "Could not record failure");
                }
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        request_id: &str,
        query: &Query,
        deadline: Instant,
        budget: Duration,
        cancel: CancellationToken,
    ) -> Result<Vec<TickerInsight>> {
        let timed_out = || ResearchError::RequestTimedOut { timeout: budget };
        let cancelled = || ResearchError::Cancelled {
            request_id: request_id.to_string(),
        };

        // validating
        if query.query.trim().is_empty() {
            return Err(ResearchError::InvalidQuery("query must not be empty".to_string()));
        }
        if query.max_iterations == 0 {
            return Err(ResearchError::InvalidQuery(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        self.milestone(request_id, PROGRESS_EXTRACTING, "Extracting tickers")?;
        let tickers = self.extractor.extract(&query.query);
        if tickers.is_empty() {
            return Err(ResearchError::NoTickersFound);
        }
        info!(?tickers, "Tickers validated");

        if Instant::now() >= deadline {
            return Err(timed_out());
        }
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        // fanning_out
        let total = self.scheduler.total_units(tickers.len());
        self.milestone(
            request_id,
            PROGRESS_DISPATCHING,
            format!("Dispatching {total} research units"),
        )?;

        let tracker = Arc::clone(&self.tracker);
        let progress_id = request_id.to_string();
        let on_progress = move |done: usize, total: usize| {
            #[allow(clippy::cast_precision_loss)]
            let fraction = done as f32 / total.max(1) as f32;
            // Losing a race with cancel here is harmless
            let _ = tracker.update(
                &progress_id,
                StatusUpdate::new(
                    PROGRESS_DISPATCHING + PROGRESS_FAN_OUT_SPAN * fraction,
                    format!("Completed {done} of {total} research units"),
                ),
            );
        };

        let request = FanOutRequest {
            request_id: request_id.to_string(),
            tickers,
            deadline,
            budget,
            max_iterations: query.max_iterations,
            cancel: cancel.clone(),
        };
        let mut results = self.scheduler.run(&request, &on_progress).await?;

        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        if Instant::now() >= deadline {
            return Err(timed_out());
        }

        // aggregating
        self.milestone(request_id, PROGRESS_AGGREGATING, "Aggregating insights")?;
        let insights = request
            .tickers
            .iter()
            .map(|ticker| {
                let units = results.remove(ticker).unwrap_or_default();
                self.aggregator.aggregate(ticker, units)
            })
            .collect();

        Ok(insights)
    }

    fn milestone(&self, request_id: &str, progress: f32, step: impl Into<String>) -> Result<()> {
        let step = step.into();
        info!(progress, step = %step, "Milestone");
        match self.tracker.update(request_id, StatusUpdate::new(progress, step)) {
            Err(ResearchError::AlreadyTerminal { .. }) => Err(ResearchError::Cancelled {
                request_id: request_id.to_string(),
            }),
            other => other,
        }
    }

    /// Current status of a request
    pub fn status(&self, request_id: &str) -> Result<RequestStatus> {
        self.tracker.get(request_id)
    }

    /// Cancel an in-flight request
    pub fn cancel(&self, request_id: &str) -> Result<RequestStatus> {
        self.tracker.cancel(request_id)
    }

    /// Finished result, or the status of a request still running
    pub fn result(&self, request_id: &str) -> Result<ResultLookup> {
        self.tracker.result(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestState;
    use crate::testing::{Script, ScriptedAgent, uniform_roster};
    use research_core::{AgentError, AgentKind, AgentStatus, Confidence, Stance};

    fn config() -> ResearchConfig {
        ResearchConfig::builder()
            .agent_timeout(Duration::from_secs(5))
            .retry_backoff_base(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    fn query(text: &str) -> Query {
        Query::new(text).with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_unbounded_timeouts_saturate() {
        let config = ResearchConfig::builder()
            .agent_timeout(Duration::MAX)
            .retry_backoff_base(Duration::from_millis(1))
            .build()
            .unwrap();
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config);

        let result = tokio_test::assert_ok!(
            orchestrator
                .start_analysis(Query::new("Analyze AAPL").with_timeout_secs(1.5e19))
                .await
        );
        assert_eq!(result.tickers_analyzed, vec!["AAPL"]);
        assert!(
            result.insights[0]
                .agent_traces
                .iter()
                .all(|t| t.status == AgentStatus::Success)
        );
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config());
        let result = tokio_test::assert_ok!(
            orchestrator
                .start_analysis_with_id(
                    "req-ok",
                    query("Compare NVDA, AMD, and TSM for AI datacenter demand"),
                )
                .await
        );

        assert_eq!(result.request_id, "req-ok");
        assert_eq!(result.tickers_analyzed, vec!["AMD", "NVDA", "TSM"]);
        assert_eq!(result.insights.len(), 3);
        assert_eq!(result.agents_used.len(), 7);
        assert!(result.total_latency_ms >= 0.0);

        let nvda = result.insight("NVDA").unwrap();
        assert_eq!(nvda.company_name, "NVDA Corp");
        assert_eq!(nvda.stance, Stance::Buy);
        assert_eq!(nvda.confidence, Confidence::Medium);
        assert_eq!(nvda.agent_traces.len(), 7);
        assert_eq!(nvda.risks, vec!["shared risk".to_string()]);
        assert_eq!(nvda.sources.len(), 6);

        let status = orchestrator.status("req-ok").unwrap();
        assert_eq!(status.status, RequestState::Completed);
        assert_eq!(status.progress, 100.0);
        assert!(matches!(
            orchestrator.result("req-ok").unwrap(),
            ResultLookup::Completed(stored) if *stored == result
        ));
    }

    #[tokio::test]
    async fn test_no_tickers_found() {
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config());
        let err = tokio_test::assert_err!(
            orchestrator
                .start_analysis_with_id("req-none", query("What is the market outlook?"))
                .await
        );

        assert!(matches!(err, ResearchError::NoTickersFound));
        assert_eq!(err.kind().http_status(), 422);

        let status = orchestrator.status("req-none").unwrap();
        assert_eq!(status.status, RequestState::Failed);
        assert_eq!(
            status.error.as_deref(),
            Some("No valid stock tickers found in query")
        );
    }

    #[tokio::test]
    async fn test_all_agents_failing_still_completes() {
        let roster = uniform_roster(&Script::Fail(AgentError::Generic("provider down".into())));
        let orchestrator = Orchestrator::new(roster, config());
        let result = orchestrator
            .start_analysis(query("Analyze AAPL and MSFT for growth potential"))
            .await
            .unwrap();

        assert_eq!(result.insights.len(), 2);
        for insight in &result.insights {
            assert_eq!(insight.stance, Stance::Hold);
            assert_eq!(insight.confidence, Confidence::Low);
            assert_eq!(insight.agent_traces.len(), 7);
            assert!(
                insight
                    .agent_traces
                    .iter()
                    .all(|t| t.status == AgentStatus::Failed
                        && t.error_message.as_deref() == Some("provider down"))
            );
        }
    }

    #[tokio::test]
    async fn test_near_zero_timeout() {
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config());
        let started = Instant::now();
        let err = orchestrator
            .start_analysis_with_id(
                "req-fast",
                Query::new("Analyze AAPL").with_timeout_secs(0.0),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::RequestTimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            orchestrator.status("req-fast").unwrap().status,
            RequestState::Failed
        );
    }

    #[tokio::test]
    async fn test_deadline_passing_mid_fan_out_is_a_timeout() {
        let orchestrator = Orchestrator::new(
            uniform_roster(&Script::Sleep(Duration::from_secs(30))),
            config(),
        );
        let started = Instant::now();
        let err = orchestrator
            .start_analysis(Query::new("Analyze AAPL").with_timeout(Duration::from_millis(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::RequestTimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_invalid_query() {
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config());
        let err = orchestrator
            .start_analysis(query("Analyze AAPL").with_max_iterations(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::InvalidQuery(_)));

        let err = orchestrator.start_analysis(query("   ")).await.unwrap_err();
        assert!(matches!(err, ResearchError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_cancel_in_flight_request() {
        let orchestrator = Orchestrator::new(
            uniform_roster(&Script::Sleep(Duration::from_secs(30))),
            config(),
        );
        let runner = orchestrator.clone();
        let handle = tokio::spawn(async move {
            runner
                .start_analysis_with_id("req-cancel", query("Analyze AAPL"))
                .await
        });

        // Wait until the request is registered
        while orchestrator.status("req-cancel").is_err() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let status = orchestrator.cancel("req-cancel").unwrap();
        assert_eq!(status.status, RequestState::Cancelled);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ResearchError::Cancelled { .. }));

        let status = orchestrator.status("req-cancel").unwrap();
        assert_eq!(status.status, RequestState::Cancelled);
        assert_eq!(status.current_step, "Analysis cancelled by user");
        assert!(matches!(
            orchestrator.result("req-cancel").unwrap(),
            ResultLookup::Pending(_)
        ));
    }

    #[tokio::test]
    async fn test_cancel_completed_request_is_rejected() {
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config());
        orchestrator
            .start_analysis_with_id("req-done", query("Analyze MSFT"))
            .await
            .unwrap();

        let err = orchestrator.cancel("req-done").unwrap_err();
        assert!(matches!(err, ResearchError::AlreadyTerminal { .. }));
        assert_eq!(
            orchestrator.status("req-done").unwrap().status,
            RequestState::Completed
        );

        assert!(matches!(
            orchestrator.cancel("missing"),
            Err(ResearchError::StatusNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_status_is_idempotent_and_shared() {
        let tracker = Arc::new(StatusTracker::new());
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config())
            .with_tracker(Arc::clone(&tracker));
        orchestrator
            .start_analysis_with_id("req-shared", query("Analyze AAPL"))
            .await
            .unwrap();

        let first = orchestrator.status("req-shared").unwrap();
        let second = orchestrator.status("req-shared").unwrap();
        assert_eq!(first, second);
        assert_eq!(tracker.get("req-shared").unwrap(), first);
    }

    #[tokio::test]
    async fn test_progress_observed_while_running() {
        let roster = uniform_roster(&Script::Succeed).with_agent(Arc::new(
            ScriptedAgent::new(AgentKind::Price, Script::Sleep(Duration::from_millis(200))),
        ));
        let orchestrator = Orchestrator::new(roster, config());
        let runner = orchestrator.clone();
        let handle = tokio::spawn(async move {
            runner
                .start_analysis_with_id("req-progress", query("Analyze AAPL"))
                .await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = orchestrator.status("req-progress").unwrap();
        assert_eq!(status.status, RequestState::Processing);
        assert!(status.progress >= PROGRESS_DISPATCHING);
        assert!(status.progress < 100.0);

        handle.await.unwrap().unwrap();
        assert_eq!(orchestrator.status("req-progress").unwrap().progress, 100.0);
    }

    #[tokio::test]
    async fn test_duplicate_request_id_rejected() {
        let orchestrator = Orchestrator::new(uniform_roster(&Script::Succeed), config());
        orchestrator
            .start_analysis_with_id("dup", query("Analyze AAPL"))
            .await
            .unwrap();
        let err = orchestrator
            .start_analysis_with_id("dup", query("Analyze AAPL"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::InvalidQuery(_)));
        assert_eq!(
            orchestrator.status("dup").unwrap().status,
            RequestState::Completed
        );
    }
}
