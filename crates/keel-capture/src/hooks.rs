//! Host runtime hook surface.
//!
//! The host calls [`MemoryHooks::before_response`] ahead of each model turn
//! (the recall path), [`MemoryHooks::after_response`] with the messages the
//! turn produced (the capture path), and [`MemoryHooks::on_stop`] once when
//! the service stops. None of these fail: collaborator errors are logged and
//! the turn proceeds without memory.

use keel_types::{AfterResponseEvent, BeforeResponseEvent, RecallQuery, SharedRecallService};
use tracing::{debug, warn};

use crate::drain::DrainReport;
use crate::filter::{Relevance, RelevanceFilter, select_recall_text};
use crate::registry::{CaptureOutcome, ConversationBufferRegistry};

/// Default token budget for recalled context.
pub const DEFAULT_RECALL_MAX_TOKENS: u32 = 1500;

/// Memory context to prepend to the model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedContext {
    /// Rendered block, ready to prepend.
    pub text: String,
    /// Decisions the service reported as included.
    pub decisions_included: u32,
}

impl InjectedContext {
    fn render(context: &str, decisions_included: u32) -> Self {
        let text = format!(
            "<relevant-memory decisions=\"{decisions_included}\">\n{}\n</relevant-memory>",
            context.trim()
        );
        Self {
            text,
            decisions_included,
        }
    }
}

/// Hook handlers wired to one registry.
#[derive(Clone)]
pub struct MemoryHooks {
    registry: ConversationBufferRegistry,
    capture_enabled: bool,
    recall: Option<SharedRecallService>,
    max_tokens: u32,
}

impl MemoryHooks {
    /// Hooks with capture enabled and recall disabled.
    pub fn new(registry: ConversationBufferRegistry) -> Self {
        Self {
            registry,
            capture_enabled: true,
            recall: None,
            max_tokens: DEFAULT_RECALL_MAX_TOKENS,
        }
    }

    /// Enable the recall path with the given service and token budget.
    pub fn with_recall(mut self, recall: SharedRecallService, max_tokens: u32) -> Self {
        self.recall = Some(recall);
        self.max_tokens = max_tokens;
        self
    }

    /// Enable or disable the capture path.
    pub fn with_capture(mut self, enabled: bool) -> Self {
        self.capture_enabled = enabled;
        self
    }

    /// The registry behind these hooks.
    pub fn registry(&self) -> &ConversationBufferRegistry {
        &self.registry
    }

    /// Whether the capture path is registered.
    pub fn capture_enabled(&self) -> bool {
        self.capture_enabled
    }

    /// Whether the recall path is registered.
    pub fn recall_enabled(&self) -> bool {
        self.recall.is_some()
    }

    /// Recall path: maybe produce memory context for the upcoming response.
    pub async fn before_response(&self, event: &BeforeResponseEvent) -> Option<InjectedContext> {
        let recall = self.recall.as_ref()?;
        let channel = event.channel_key();

        let text = select_recall_text(event)?;
        if let Relevance::Skip(reason) = RelevanceFilter::global().classify(&text) {
            debug!(channel = %channel, reason = %reason, "Skipping memory recall");
            return None;
        }

        let query = RecallQuery {
            query: text,
            max_tokens: self.max_tokens,
        };
        match recall.recall(query).await {
            Ok(ctx) if ctx.is_empty() => {
                debug!(channel = %channel, "Recall returned no context");
                None
            }
            Ok(ctx) => {
                debug!(
                    channel = %channel,
                    decisions = ctx.decisions_included,
                    "Injecting recalled context"
                );
                Some(InjectedContext::render(&ctx.context, ctx.decisions_included))
            }
            Err(e) => {
                warn!(
                    channel = %channel,
                    error = %e,
                    "Memory recall failed, continuing without context"
                );
                None
            }
        }
    }

    /// Capture path: buffer the messages produced by a turn.
    pub async fn after_response(&self, event: &AfterResponseEvent) -> CaptureOutcome {
        if !self.capture_enabled {
            return CaptureOutcome::Disabled;
        }
        let channel = event.channel_key();
        self.registry.capture(&channel, event.messages()).await
    }

    /// Service stop: drain every buffer.
    pub async fn on_stop(&self) -> DrainReport {
        self.registry.drain_all().await
    }
}

impl std::fmt::Debug for MemoryHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHooks")
            .field("capture_enabled", &self.capture_enabled)
            .field("recall_enabled", &self.recall_enabled())
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;
    use crate::testing::{MockExtractor, MockRecall};
    use keel_types::RawMessage;
    use std::sync::Arc;

    const QUESTION: &str = "What did we decide about the AWS migration budget last quarter?";

    fn hooks_with(recall: Arc<MockRecall>) -> (MemoryHooks, Arc<MockExtractor>) {
        let extractor = Arc::new(MockExtractor::new());
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), extractor.clone()).unwrap();
        (MemoryHooks::new(registry).with_recall(recall, 800), extractor)
    }

    #[tokio::test]
    async fn test_recall_injects_context() {
        let recall = Arc::new(MockRecall::with_context(
            "Budget capped at $40k (approved 03/02)",
            1,
        ));
        let (hooks, _) = hooks_with(recall.clone());

        let event = BeforeResponseEvent::with_messages(vec![RawMessage::new("user", QUESTION)]);
        let injected = hooks.before_response(&event).await.unwrap();

        assert_eq!(injected.decisions_included, 1);
        assert!(injected.text.starts_with("<relevant-memory decisions=\"1\">"));
        assert!(injected.text.contains("Budget capped at $40k"));

        let queries = recall.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].query, QUESTION);
        assert_eq!(queries[0].max_tokens, 800);
    }

    #[tokio::test]
    async fn test_casual_message_skips_recall() {
        let recall = Arc::new(MockRecall::with_context("unused", 1));
        let (hooks, _) = hooks_with(recall.clone());

        let event = BeforeResponseEvent::with_messages(vec![
            RawMessage::new("user", QUESTION),
            RawMessage::new("assistant", "We capped it at 40k."),
            RawMessage::new("user", "thanks!"),
        ]);
        assert!(hooks.before_response(&event).await.is_none());
        assert_eq!(recall.query_count(), 0);
    }

    #[tokio::test]
    async fn test_recall_uses_prompt_fallback() {
        let recall = Arc::new(MockRecall::with_context("Ship date moved to May", 2));
        let (hooks, _) = hooks_with(recall.clone());

        let event = BeforeResponseEvent::with_prompt("When is the ship date we agreed on?");
        assert!(hooks.before_response(&event).await.is_some());
        assert_eq!(recall.query_count(), 1);
    }

    #[tokio::test]
    async fn test_recall_failure_degrades_to_none() {
        let recall = Arc::new(MockRecall::failing());
        let (hooks, _) = hooks_with(recall.clone());

        let event = BeforeResponseEvent::with_prompt(QUESTION);
        assert!(hooks.before_response(&event).await.is_none());
        assert_eq!(recall.query_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_recall_context_is_not_injected() {
        let recall = Arc::new(MockRecall::with_context("   ", 0));
        let (hooks, _) = hooks_with(recall);

        let event = BeforeResponseEvent::with_prompt(QUESTION);
        assert!(hooks.before_response(&event).await.is_none());
    }

    #[tokio::test]
    async fn test_recall_disabled() {
        let extractor = Arc::new(MockExtractor::new());
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), extractor).unwrap();
        let hooks = MemoryHooks::new(registry);
        assert!(!hooks.recall_enabled());

        let event = BeforeResponseEvent::with_prompt(QUESTION);
        assert!(hooks.before_response(&event).await.is_none());
    }

    #[tokio::test]
    async fn test_after_response_buffers_under_channel() {
        let recall = Arc::new(MockRecall::failing());
        let (hooks, _) = hooks_with(recall);

        let event = AfterResponseEvent::new(
            "agent:main:slack",
            vec![
                RawMessage::new("user", "Let's move standup to 10am"),
                RawMessage::new("assistant", "Done, standup is now at 10am."),
            ],
        );
        let outcome = hooks.after_response(&event).await;
        assert_eq!(outcome, CaptureOutcome::Buffered { added: 2, size: 2 });
        assert_eq!(
            hooks
                .registry()
                .size(&keel_types::ChannelKey::from("agent:main:slack")),
            2
        );
    }

    #[tokio::test]
    async fn test_after_response_disabled() {
        let recall = Arc::new(MockRecall::failing());
        let (hooks, _) = hooks_with(recall);
        let hooks = hooks.with_capture(false);

        let event = AfterResponseEvent::new(
            "s",
            vec![RawMessage::new("user", "a long enough message")],
        );
        assert_eq!(hooks.after_response(&event).await, CaptureOutcome::Disabled);
        assert!(hooks.registry().channels().is_empty());
    }

    #[tokio::test]
    async fn test_on_stop_drains() {
        let recall = Arc::new(MockRecall::failing());
        let (hooks, extractor) = hooks_with(recall);

        let messages: Vec<RawMessage> = (0..4)
            .map(|i| RawMessage::new("user", format!("planning item {i}")))
            .collect();
        hooks.after_response(&AfterResponseEvent::new("s", messages)).await;

        let report = hooks.on_stop().await;
        assert_eq!(report.extraction_calls(), 1);
        assert_eq!(extractor.request_count(), 1);
        assert!(hooks.registry().is_closed());
    }
}
