//! Execution context for research agents
//!
//! The `AgentContext` carries what every unit of a request shares: the
//! request id, the deadline computed once at request start, the retry budget,
//! and, for synthesis, the terminal outcomes of the sibling agents.

use crate::{AgentKind, AgentOutput, AgentStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Longest span a deadline may lie ahead of its start
pub const MAX_DEADLINE_SPAN: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + span`, saturating at [`MAX_DEADLINE_SPAN`] instead of overflowing
pub fn deadline_after(start: Instant, span: Duration) -> Instant {
    start
        .checked_add(span.min(MAX_DEADLINE_SPAN))
        .unwrap_or(start)
}

/// Terminal outcome of a sibling agent, as seen by synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorOutcome {
    pub kind: AgentKind,
    pub status: AgentStatus,
    pub output: Option<AgentOutput>,
    pub error: Option<String>,
}

impl PriorOutcome {
    pub fn success(output: AgentOutput) -> Self {
        Self {
            kind: output.kind,
            status: AgentStatus::Success,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(kind: AgentKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            status: AgentStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }

    pub fn timed_out(kind: AgentKind) -> Self {
        Self {
            kind,
            status: AgentStatus::TimedOut,
            output: None,
            error: Some("did not complete before the deadline".to_string()),
        }
    }
}

/// Context passed to agents during execution
///
/// # Example
///
/// ```
/// use research_core::AgentContext;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = AgentContext::new("req-123", Duration::from_secs(30))
///     .with_max_iterations(2);
///
/// assert_eq!(ctx.request_id(), "req-123");
/// assert!(!ctx.is_expired());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AgentContext {
    request_id: String,
    deadline: Instant,
    max_iterations: u32,
    attempt: u32,
    prior: Vec<PriorOutcome>,
}

impl AgentContext {
    /// Create a context whose deadline is `budget` from now
    pub fn new(request_id: impl Into<String>, budget: Duration) -> Self {
        Self::with_deadline(request_id, deadline_after(Instant::now(), budget))
    }

    /// Create a context sharing an already computed deadline
    pub fn with_deadline(request_id: impl Into<String>, deadline: Instant) -> Self {
        Self {
            request_id: request_id.into(),
            deadline,
            max_iterations: 3,
            attempt: 1,
            prior: Vec::new(),
        }
    }

    // =========== Builder Methods ===========

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Tighten the deadline; a later instant than the current one is ignored
    pub fn with_local_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = self.deadline.min(deadline);
        self
    }

    pub fn with_prior(mut self, prior: Vec<PriorOutcome>) -> Self {
        self.prior = prior;
        self
    }

    /// Set the 1-based attempt number
    pub fn set_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
    }

    // =========== Accessors ===========

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline (zero once passed)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Sibling outcomes (empty for non-synthesis agents)
    pub fn prior(&self) -> &[PriorOutcome] {
        &self.prior
    }

    /// Outputs of siblings that succeeded
    pub fn successful_outputs(&self) -> impl Iterator<Item = &AgentOutput> {
        self.prior.iter().filter_map(|p| p.output.as_ref())
    }

    /// Outcome recorded for a given sibling
    pub fn outcome(&self, kind: AgentKind) -> Option<&PriorOutcome> {
        self.prior.iter().find(|p| p.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentPayload;

    #[tokio::test]
    async fn test_deadline_and_remaining() {
        let ctx = AgentContext::new("req", Duration::from_secs(10));
        assert!(!ctx.is_expired());
        assert!(ctx.remaining() <= Duration::from_secs(10));
        assert!(ctx.remaining() > Duration::from_secs(9));

        let expired = AgentContext::new("req", Duration::ZERO);
        assert!(expired.is_expired());
        assert_eq!(expired.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_deadline_after_saturates() {
        let now = Instant::now();
        assert_eq!(deadline_after(now, Duration::from_secs(2)), now + Duration::from_secs(2));
        assert_eq!(deadline_after(now, Duration::MAX), now + MAX_DEADLINE_SPAN);

        let ctx = AgentContext::new("req", Duration::from_secs_f64(1.5e19));
        assert!(!ctx.is_expired());
    }

    #[tokio::test]
    async fn test_local_deadline_only_tightens() {
        let now = Instant::now();
        let ctx = AgentContext::with_deadline("req", now + Duration::from_secs(5))
            .with_local_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), now + Duration::from_secs(5));

        let ctx = ctx.with_local_deadline(now + Duration::from_secs(1));
        assert_eq!(ctx.deadline(), now + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_prior_outcomes() {
        let news = AgentOutput::new(AgentKind::News, AgentPayload::summary("upbeat"));
        let ctx = AgentContext::new("req", Duration::from_secs(1)).with_prior(vec![
            PriorOutcome::success(news),
            PriorOutcome::failed(AgentKind::Filings, "EDGAR down"),
            PriorOutcome::timed_out(AgentKind::Price),
        ]);

        assert_eq!(ctx.successful_outputs().count(), 1);
        assert_eq!(
            ctx.outcome(AgentKind::Price).map(|p| p.status),
            Some(AgentStatus::TimedOut)
        );
        assert!(ctx.outcome(AgentKind::Patents).is_none());
    }

    #[test]
    fn test_max_iterations_floor() {
        let ctx = AgentContext::with_deadline("req", Instant::now()).with_max_iterations(0);
        assert_eq!(ctx.max_iterations(), 1);
        assert_eq!(ctx.attempt(), 1);
    }
}
