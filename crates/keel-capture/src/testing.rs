//! Mock collaborators for tests.
//!
//! Record every request and answer with pre-configured results, so capture and
//! recall behavior can be checked without a running service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use keel_types::{
    ExtractionRequest, ExtractionService, ExtractionSummary, RecallContext, RecallQuery,
    RecallService, ServiceError,
};
use parking_lot::Mutex;

/// Extraction service double.
#[derive(Debug, Default)]
pub struct MockExtractor {
    decisions_found: u32,
    fail: bool,
    delay: Option<Duration>,
    request_log: Mutex<Vec<ExtractionRequest>>,
    completed: AtomicUsize,
}

impl MockExtractor {
    /// Succeeds and reports zero decisions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeeds and reports `decisions` decisions per batch.
    pub fn with_decisions(decisions: u32) -> Self {
        Self {
            decisions_found: decisions,
            ..Self::default()
        }
    }

    /// Fails every call with a transport error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Wait this long (tokio time) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.request_log.lock().clone()
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }

    /// Number of requests that have been answered, successfully or not.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionService for MockExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionSummary, ServiceError> {
        self.request_log.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(ServiceError::Transport(
                "MockExtractor: simulated failure".to_string(),
            ));
        }
        Ok(ExtractionSummary {
            decisions_found: self.decisions_found,
            ..Default::default()
        })
    }
}

/// Recall service double.
#[derive(Debug, Default)]
pub struct MockRecall {
    response: Option<RecallContext>,
    query_log: Mutex<Vec<RecallQuery>>,
}

impl MockRecall {
    /// Answers every query with the given context.
    pub fn with_context(context: impl Into<String>, decisions_included: u32) -> Self {
        Self {
            response: Some(RecallContext {
                context: context.into(),
                decisions_included,
            }),
            query_log: Mutex::new(Vec::new()),
        }
    }

    /// Fails every query with a status error.
    pub fn failing() -> Self {
        Self::default()
    }

    /// All queries received so far.
    pub fn queries(&self) -> Vec<RecallQuery> {
        self.query_log.lock().clone()
    }

    /// Number of queries received.
    pub fn query_count(&self) -> usize {
        self.query_log.lock().len()
    }
}

#[async_trait]
impl RecallService for MockRecall {
    async fn recall(&self, query: RecallQuery) -> Result<RecallContext, ServiceError> {
        self.query_log.lock().push(query);
        self.response.clone().ok_or_else(|| ServiceError::Status {
            status: 503,
            message: "MockRecall: simulated failure".to_string(),
        })
    }
}
