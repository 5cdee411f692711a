//! Per-request status tracking
//!
//! One entry per request id, created at request start and never removed
//! implicitly. Entries live in a sharded concurrent map so that status reads
//! for one request never wait on writers of another.

use crate::error::{ResearchError, Result};
use crate::models::{AnalysisResult, RequestState, RequestStatus, ResultLookup};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A progress milestone
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub progress: f32,
    pub current_step: String,
}

impl StatusUpdate {
    pub fn new(progress: f32, current_step: impl Into<String>) -> Self {
        Self {
            progress,
            current_step: current_step.into(),
        }
    }
}

struct Entry {
    status: RequestStatus,
    cancel: CancellationToken,
    result: Option<Arc<AnalysisResult>>,
}

impl Entry {
    fn ensure_processing(&self) -> Result<()> {
        if self.status.status.is_terminal() {
            return Err(ResearchError::AlreadyTerminal {
                request_id: self.status.request_id.clone(),
                status: self.status.status,
            });
        }
        Ok(())
    }

    fn finish(&mut self, state: RequestState, step: impl Into<String>) {
        let now = Utc::now();
        self.status.status = state;
        self.status.current_step = step.into();
        self.status.updated_at = now;
        self.status.completed_at = Some(now);
    }
}

/// Concurrent map of request id to status
#[derive(Default)]
pub struct StatusTracker {
    entries: DashMap<String, Entry>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request in `processing` state
    ///
    /// Returns the token that fires when the request is cancelled.
    pub fn create(&self, request_id: &str) -> Result<CancellationToken> {
        match self.entries.entry(request_id.to_string()) {
            MapEntry::Occupied(_) => Err(ResearchError::InvalidQuery(format!(
                "request id {request_id} is already in use"
            ))),
            MapEntry::Vacant(slot) => {
                let cancel = CancellationToken::new();
                slot.insert(Entry {
                    status: RequestStatus::processing(request_id),
                    cancel: cancel.clone(),
                    result: None,
                });
                debug!(request_id, "Tracking new request");
                Ok(cancel)
            }
        }
    }

    /// Record a milestone; progress never moves backwards
    ///
    /// A non-finite progress value only updates the step.
    pub fn update(&self, request_id: &str, update: StatusUpdate) -> Result<()> {
        let mut entry = self
            .entries
            .get_mut(request_id)
            .ok_or_else(|| ResearchError::not_found(request_id))?;
        entry.ensure_processing()?;

        let status = &mut entry.status;
        if update.progress.is_finite() {
            status.progress = update.progress.clamp(status.progress, 100.0);
        }
        status.current_step = update.current_step;
        status.updated_at = Utc::now();
        Ok(())
    }

    /// Mark a request completed and store its result
    pub fn complete(&self, request_id: &str, result: Arc<AnalysisResult>) -> Result<()> {
        let mut entry = self
            .entries
            .get_mut(request_id)
            .ok_or_else(|| ResearchError::not_found(request_id))?;
        entry.ensure_processing()?;

        entry.finish(RequestState::Completed, "Analysis complete");
        entry.status.progress = 100.0;
        entry.result = Some(result);
        Ok(())
    }

    /// Mark a request failed with a message
    pub fn fail(&self, request_id: &str, error: impl Into<String>) -> Result<()> {
        let mut entry = self
            .entries
            .get_mut(request_id)
            .ok_or_else(|| ResearchError::not_found(request_id))?;
        entry.ensure_processing()?;

        let error = error.into();
        entry.finish(RequestState::Failed, format!("Error: {error}"));
        entry.status.error = Some(error);
        Ok(())
    }

    /// Cancel an in-flight request
    ///
    /// Terminal requests are left untouched and reported as
    /// `AlreadyTerminal`.
    pub fn cancel(&self, request_id: &str) -> Result<RequestStatus> {
        let mut entry = self
            .entries
            .get_mut(request_id)
            .ok_or_else(|| ResearchError::not_found(request_id))?;
        entry.ensure_processing()?;

        entry.finish(RequestState::Cancelled, "Analysis cancelled by user");
        entry.cancel.cancel();
        info!(request_id, "Request cancelled");
        Ok(entry.status.clone())
    }

    /// Snapshot of a request's status
    pub fn get(&self, request_id: &str) -> Result<RequestStatus> {
        self.entries
            .get(request_id)
            .map(|entry| entry.status.clone())
            .ok_or_else(|| ResearchError::not_found(request_id))
    }

    /// The finished result, or the current status while still running
    ///
    /// Failed and cancelled requests report their status as well.
    pub fn result(&self, request_id: &str) -> Result<ResultLookup> {
        let entry = self
            .entries
            .get(request_id)
            .ok_or_else(|| ResearchError::not_found(request_id))?;

        Ok(match &entry.result {
            Some(result) => ResultLookup::Completed(Arc::clone(result)),
            None => ResultLookup::Pending(entry.status.clone()),
        })
    }

    /// Explicitly forget a request
    pub fn remove(&self, request_id: &str) -> Option<RequestStatus> {
        self.entries.remove(request_id).map(|(_, entry)| entry.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for StatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusTracker")
            .field("requests", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(request_id: &str) -> Arc<AnalysisResult> {
        let now = Utc::now();
        Arc::new(AnalysisResult {
            request_id: request_id.to_string(),
            query: "Analyze AAPL".to_string(),
            insights: vec![],
            total_latency_ms: 12.0,
            tickers_analyzed: vec!["AAPL".to_string()],
            agents_used: vec![],
            started_at: now,
            completed_at: now,
        })
    }

    #[test]
    fn test_lifecycle() {
        let tracker = StatusTracker::new();
        tracker.create("r1").unwrap();

        let status = tracker.get("r1").unwrap();
        assert_eq!(status.status, RequestState::Processing);
        assert_eq!(status.progress, 0.0);
        assert_eq!(status.current_step, "Initializing analysis");

        tracker.update("r1", StatusUpdate::new(20.0, "Dispatching")).unwrap();
        // Progress is monotonic
        tracker.update("r1", StatusUpdate::new(10.0, "Late update")).unwrap();
        let status = tracker.get("r1").unwrap();
        assert_eq!(status.progress, 20.0);
        assert_eq!(status.current_step, "Late update");

        tracker.complete("r1", result("r1")).unwrap();
        let status = tracker.get("r1").unwrap();
        assert_eq!(status.status, RequestState::Completed);
        assert_eq!(status.progress, 100.0);
        assert!(status.completed_at.is_some());

        assert!(matches!(
            tracker.result("r1").unwrap(),
            ResultLookup::Completed(r) if r.request_id == "r1"
        ));
    }

    #[test]
    fn test_non_finite_progress_is_ignored() {
        let tracker = StatusTracker::new();
        tracker.create("r1").unwrap();
        tracker.update("r1", StatusUpdate::new(20.0, "Dispatching")).unwrap();

        tracker.update("r1", StatusUpdate::new(f32::NAN, "Odd update")).unwrap();
        tracker.update("r1", StatusUpdate::new(f32::INFINITY, "Odder update")).unwrap();
        tracker.update("r1", StatusUpdate::new(30.0, "Next unit")).unwrap();

        let status = tracker.get("r1").unwrap();
        assert_eq!(status.progress, 30.0);
        assert_eq!(status.current_step, "Next unit");
    }

    #[test]
    fn test_get_is_idempotent() {
        let tracker = StatusTracker::new();
        tracker.create("r1").unwrap();
        assert_eq!(tracker.get("r1").unwrap(), tracker.get("r1").unwrap());
    }

    #[test]
    fn test_unknown_request() {
        let tracker = StatusTracker::new();
        assert!(matches!(
            tracker.get("nope"),
            Err(ResearchError::StatusNotFound { .. })
        ));
        assert!(matches!(
            tracker.cancel("nope"),
            Err(ResearchError::StatusNotFound { .. })
        ));
        assert!(tracker.update("nope", StatusUpdate::new(1.0, "x")).is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let tracker = StatusTracker::new();
        tracker.create("r1").unwrap();
        assert!(tracker.create("r1").is_err());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_cancel_fires_token() {
        let tracker = StatusTracker::new();
        let token = tracker.create("r1").unwrap();

        let status = tracker.cancel("r1").unwrap();
        assert_eq!(status.status, RequestState::Cancelled);
        assert_eq!(status.current_step, "Analysis cancelled by user");
        assert!(token.is_cancelled());

        // Writers can no longer move a cancelled request
        assert!(matches!(
            tracker.complete("r1", result("r1")),
            Err(ResearchError::AlreadyTerminal {
                status: RequestState::Cancelled,
                ..
            })
        ));
        assert!(matches!(
            tracker.result("r1").unwrap(),
            ResultLookup::Pending(s) if s.status == RequestState::Cancelled
        ));
    }

    #[test]
    fn test_cancel_terminal_is_rejected() {
        let tracker = StatusTracker::new();
        tracker.create("done").unwrap();
        tracker.complete("done", result("done")).unwrap();
        tracker.create("broken").unwrap();
        tracker.fail("broken", "No valid stock tickers found in query").unwrap();

        for id in ["done", "broken"] {
            let before = tracker.get(id).unwrap();
            assert!(matches!(
                tracker.cancel(id),
                Err(ResearchError::AlreadyTerminal { .. })
            ));
            assert_eq!(tracker.get(id).unwrap(), before);
        }

        let failed = tracker.get("broken").unwrap();
        assert_eq!(failed.status, RequestState::Failed);
        assert_eq!(
            failed.error.as_deref(),
            Some("No valid stock tickers found in query")
        );
    }

    #[test]
    fn test_remove() {
        let tracker = StatusTracker::new();
        tracker.create("r1").unwrap();
        assert!(tracker.remove("r1").is_some());
        assert!(tracker.is_empty());
        assert!(tracker.get("r1").is_err());
    }
}
