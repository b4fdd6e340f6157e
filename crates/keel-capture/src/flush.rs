//! Hand-off of buffered batches to the extraction service.

use keel_types::{BufferedMessage, ChannelKey, ExtractionRequest, SharedExtractionService};
use tracing::{debug, info, warn};

/// What happened to a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// There was nothing buffered for the channel.
    Empty,
    /// Too few messages to be worth extracting; dropped without a call.
    Discarded { messages: usize },
    /// The extraction service accepted the batch.
    Extracted {
        messages: usize,
        decisions_found: u32,
    },
    /// The extraction call failed; the batch was dropped.
    Failed { messages: usize, error: String },
}

impl FlushOutcome {
    /// Whether an extraction call was made.
    pub fn called_service(&self) -> bool {
        matches!(
            self,
            FlushOutcome::Extracted { .. } | FlushOutcome::Failed { .. }
        )
    }

    /// Number of messages consumed by the flush.
    pub fn messages(&self) -> usize {
        match self {
            FlushOutcome::Empty => 0,
            FlushOutcome::Discarded { messages }
            | FlushOutcome::Extracted { messages, .. }
            | FlushOutcome::Failed { messages, .. } => *messages,
        }
    }
}

/// Sends batches to the extraction service, at most once per trigger.
///
/// A batch is always consumed: below the size floor it is discarded, and a
/// failed call is logged and dropped rather than retried.
pub struct FlushCoordinator {
    extractor: SharedExtractionService,
    source: String,
    min_flush_messages: usize,
}

impl FlushCoordinator {
    /// Create a coordinator.
    pub fn new(
        extractor: SharedExtractionService,
        source: impl Into<String>,
        min_flush_messages: usize,
    ) -> Self {
        Self {
            extractor,
            source: source.into(),
            min_flush_messages,
        }
    }

    /// Flush one detached batch for `channel`.
    pub async fn flush_batch(
        &self,
        channel: &ChannelKey,
        messages: Vec<BufferedMessage>,
    ) -> FlushOutcome {
        let count = messages.len();
        if count == 0 {
            return FlushOutcome::Empty;
        }
        if count < self.min_flush_messages {
            debug!(
                channel = %channel,
                messages = count,
                min = self.min_flush_messages,
                "Batch below extraction floor, discarding"
            );
            return FlushOutcome::Discarded { messages: count };
        }

        let request = ExtractionRequest {
            messages,
            source: self.source.clone(),
            channel: channel.clone(),
        };

        match self.extractor.extract(request).await {
            Ok(summary) => {
                info!(
                    channel = %channel,
                    messages = count,
                    decisions_found = summary.decisions_found,
                    "Extraction batch processed"
                );
                FlushOutcome::Extracted {
                    messages: count,
                    decisions_found: summary.decisions_found,
                }
            }
            Err(e) => {
                warn!(
                    channel = %channel,
                    messages = count,
                    error = %e,
                    "Extraction failed, dropping batch"
                );
                FlushOutcome::Failed {
                    messages: count,
                    error: e.to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for FlushCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushCoordinator")
            .field("source", &self.source)
            .field("min_flush_messages", &self.min_flush_messages)
            .finish_non_exhaustive()
    }
}
