//! Shutdown drain: flush everything before the service stops.

use keel_types::ChannelKey;
use tracing::info;

use crate::flush::FlushOutcome;
use crate::registry::ConversationBufferRegistry;

/// Result of draining a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Channels whose silence timer was cancelled.
    pub cancelled_timers: Vec<ChannelKey>,
    /// Flush outcome per buffered channel, in registration order.
    pub outcomes: Vec<(ChannelKey, FlushOutcome)>,
}

impl DrainReport {
    /// Number of extraction calls made during the drain.
    pub fn extraction_calls(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.called_service())
            .count()
    }

    /// Number of messages consumed during the drain.
    pub fn messages(&self) -> usize {
        self.outcomes.iter().map(|(_, outcome)| outcome.messages()).sum()
    }
}

impl ConversationBufferRegistry {
    /// Cancel all timers and flush every buffered channel, one at a time.
    ///
    /// After the drain starts the registry is closed: later captures are
    /// ignored, so no timer can be armed during or after the drain. Silence
    /// and overflow flushes that were already running are awaited before the
    /// drain returns. Each flush is bounded by the extraction service's own
    /// request timeout.
    pub async fn drain_all(&self) -> DrainReport {
        *self.inner.closed.write() = true;

        let cancelled_timers = self.inner.debouncer.cancel_all();
        let channels = self.inner.store.keys();

        info!(
            channels = channels.len(),
            timers = cancelled_timers.len(),
            in_flight = self.in_flight(),
            "Draining conversation buffers"
        );

        let mut outcomes = Vec::with_capacity(channels.len());
        for key in channels {
            let outcome = self.inner.flush_taken(&key).await;
            outcomes.push((key, outcome));
        }

        self.inner.tasks.close();
        self.inner.tasks.wait().await;

        let report = DrainReport {
            cancelled_timers,
            outcomes,
        };
        info!(
            extraction_calls = report.extraction_calls(),
            messages = report.messages(),
            "Drain complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;
    use crate::registry::CaptureOutcome;
    use crate::testing::MockExtractor;
    use keel_types::RawMessage;
    use std::sync::Arc;
    use std::time::Duration;

    fn messages(n: usize) -> Vec<RawMessage> {
        (0..n)
            .map(|i| RawMessage::new("user", format!("drain message {i}")))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_flushes_and_discards_in_order() {
        let mock = Arc::new(MockExtractor::new());
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), mock.clone()).unwrap();
        let a = ChannelKey::from("channel-a");
        let b = ChannelKey::from("channel-b");

        registry.capture(&a, &messages(5)).await;
        registry.capture(&b, &messages(2)).await;
        assert_eq!(registry.pending_timers(), 2);

        let report = registry.drain_all().await;

        assert_eq!(report.cancelled_timers, vec![a.clone(), b.clone()]);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].0, a);
        assert!(matches!(
            report.outcomes[0].1,
            FlushOutcome::Extracted { messages: 5, .. }
        ));
        assert_eq!(report.outcomes[1], (b, FlushOutcome::Discarded { messages: 2 }));
        assert_eq!(report.extraction_calls(), 1);
        assert_eq!(report.messages(), 7);

        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.requests()[0].channel, a);
        assert_eq!(registry.pending_timers(), 0);
        assert!(registry.channels().is_empty());

        // Cancelled timers never fire afterwards.
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_capture_after_drain_is_rejected() {
        let mock = Arc::new(MockExtractor::new());
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), mock.clone()).unwrap();
        let key = ChannelKey::from("late");

        registry.drain_all().await;
        assert!(registry.is_closed());

        let outcome = registry.capture(&key, &messages(4)).await;
        assert_eq!(outcome, CaptureOutcome::Closed);
        assert_eq!(registry.size(&key), 0);
        assert_eq!(registry.pending_timers(), 0);
    }

    #[tokio::test]
    async fn test_drain_with_failing_service_still_empties() {
        let mock = Arc::new(MockExtractor::failing());
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), mock.clone()).unwrap();

        registry.capture(&ChannelKey::from("x"), &messages(4)).await;
        registry.capture(&ChannelKey::from("y"), &messages(8)).await;

        let report = registry.drain_all().await;
        assert_eq!(report.extraction_calls(), 2);
        assert!(
            report
                .outcomes
                .iter()
                .all(|(_, o)| matches!(o, FlushOutcome::Failed { .. }))
        );
        assert_eq!(registry.stats().buffered_messages, 0);
    }

    #[tokio::test]
    async fn test_drain_empty_registry() {
        let mock = Arc::new(MockExtractor::new());
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), mock.clone()).unwrap();
        let report = registry.drain_all().await;
        assert_eq!(report, DrainReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_running_silence_flush() {
        let mock = Arc::new(MockExtractor::new().with_delay(Duration::from_secs(20)));
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), mock.clone()).unwrap();
        let key = ChannelKey::from("quiet");

        registry.capture(&key, &messages(6)).await;
        tokio::time::sleep(Duration::from_secs(301)).await;

        // The timer fired and its flush is mid-call: no handle, no buffer.
        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.completed_count(), 0);
        assert_eq!(registry.pending_timers(), 0);
        assert!(registry.channels().is_empty());

        let started = tokio::time::Instant::now();
        let report = registry.drain_all().await;

        assert!(report.outcomes.is_empty());
        assert_eq!(mock.completed_count(), 1);
        assert!(started.elapsed() >= Duration::from_secs(19));
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_overflow_flush() {
        let mock = Arc::new(MockExtractor::new().with_delay(Duration::from_secs(20)));
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), mock.clone()).unwrap();
        let key = ChannelKey::from("busy");

        let outcome = registry.capture(&key, &messages(20)).await;
        assert!(matches!(outcome, CaptureOutcome::Overflowed { batch: 16, .. }));

        let report = registry.drain_all().await;

        // The retained tail is flushed by the drain, the head by its own task.
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.extraction_calls(), 1);
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.completed_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_captures_leave_nothing_behind() {
        let mock = Arc::new(MockExtractor::new());
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), mock.clone()).unwrap();

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let key = ChannelKey::from(format!("writer-{i}"));
                    for _ in 0..200 {
                        if registry.capture(&key, &messages(3)).await == CaptureOutcome::Closed {
                            break;
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        tokio::task::yield_now().await;
        registry.drain_all().await;
        for writer in writers {
            writer.await.unwrap();
        }

        // Every append either landed before the drain and was flushed, or
        // was rejected; no timer outlives the drain.
        assert_eq!(registry.pending_timers(), 0);
        assert_eq!(registry.stats().buffered_messages, 0);
    }
}
