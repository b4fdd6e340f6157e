//! The conversation buffer registry.
//!
//! Ties the buffer store, the debouncer and the flush coordinator together.
//! Create one registry per service lifetime and hand clones of it to whatever
//! wires up the host hooks; clones share state, separate registries do not.

use std::sync::Arc;

use keel_types::{BufferedMessage, ChannelKey, RawMessage, SharedExtractionService};
use parking_lot::RwLock;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::buffer::ChannelBufferStore;
use crate::config::BufferConfig;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::flush::{FlushCoordinator, FlushOutcome};

/// What a capture call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Nothing in the event qualified for buffering.
    Ignored,
    /// Messages were buffered and the silence timer re-armed.
    Buffered { added: usize, size: usize },
    /// The buffer hit its limit. The head of the buffer was handed to a
    /// background flush and the overlap seed stays as the live buffer.
    Overflowed {
        added: usize,
        retained: usize,
        batch: usize,
    },
    /// Capture is disabled by configuration.
    Disabled,
    /// The registry has been drained; no more content is accepted.
    Closed,
}

/// Point-in-time registry statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Channels with a live buffer.
    pub channels: usize,
    /// Messages buffered across all channels.
    pub buffered_messages: usize,
    /// Live silence timers.
    pub pending_timers: usize,
}

pub(crate) struct RegistryInner {
    pub(crate) store: ChannelBufferStore,
    pub(crate) debouncer: Debouncer,
    pub(crate) coordinator: FlushCoordinator,
    pub(crate) config: BufferConfig,
    /// Set by the drain. Captures hold the read side across append and arm.
    pub(crate) closed: RwLock<bool>,
    /// Silence and overflow flushes still running.
    pub(crate) tasks: TaskTracker,
}

impl RegistryInner {
    /// Take the whole live buffer for `key` and flush it.
    ///
    /// The buffer leaves the store before the remote call, so messages that
    /// arrive while the call is in flight start a fresh buffer.
    pub(crate) async fn flush_taken(&self, key: &ChannelKey) -> FlushOutcome {
        match self.store.take(key) {
            Some(batch) => self.coordinator.flush_batch(key, batch).await,
            None => FlushOutcome::Empty,
        }
    }
}

/// Owner of all per-channel buffers and silence timers.
#[derive(Clone)]
pub struct ConversationBufferRegistry {
    pub(crate) inner: Arc<RegistryInner>,
}

impl ConversationBufferRegistry {
    /// Create a registry that flushes into `extractor`.
    pub fn new(config: BufferConfig, extractor: SharedExtractionService) -> Result<Self> {
        config.validate()?;

        let tasks = TaskTracker::new();
        let inner = RegistryInner {
            store: ChannelBufferStore::new(config.min_content_chars),
            debouncer: Debouncer::new(config.silence_window).with_tracker(tasks.clone()),
            coordinator: FlushCoordinator::new(
                extractor,
                config.source.clone(),
                config.min_flush_messages,
            ),
            config,
            closed: RwLock::new(false),
            tasks,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// The registry configuration.
    pub fn config(&self) -> &BufferConfig {
        &self.inner.config
    }

    /// Buffer the qualifying messages of an event for `key`.
    ///
    /// Any successful append re-arms the channel's silence timer. When the
    /// append brings the buffer to `max_buffer_size`, everything but the last
    /// `overlap` messages is detached and flushed on a background task; the
    /// retained tail becomes the live buffer. Capture never waits for the
    /// extraction service.
    pub async fn capture(&self, key: &ChannelKey, messages: &[RawMessage]) -> CaptureOutcome {
        // The drain flips `closed` under the write side, so it either sees
        // this append and its timer or the capture sees the registry closed.
        let closed = self.inner.closed.read();
        if *closed {
            warn!(channel = %key, "Registry drained, ignoring captured messages");
            return CaptureOutcome::Closed;
        }

        let appended = self.inner.store.append(key, messages);
        if appended.added == 0 {
            return CaptureOutcome::Ignored;
        }

        self.arm(key.clone());

        let config = &self.inner.config;
        if appended.size < config.max_buffer_size {
            return CaptureOutcome::Buffered {
                added: appended.added,
                size: appended.size,
            };
        }

        let Some(batch) = self.inner.store.split_overflow(key, config.overlap) else {
            return CaptureOutcome::Buffered {
                added: appended.added,
                size: appended.size,
            };
        };

        let retained = self.inner.store.size(key);
        let size = batch.len();
        debug!(
            channel = %key,
            batch = size,
            retained,
            "Buffer full, flushing early"
        );

        let inner = Arc::clone(&self.inner);
        let channel = key.clone();
        self.inner.tasks.spawn(async move {
            let outcome = inner.coordinator.flush_batch(&channel, batch).await;
            debug!(channel = %channel, outcome = ?outcome, "Overflow flush finished");
        });

        CaptureOutcome::Overflowed {
            added: appended.added,
            retained,
            batch: size,
        }
    }

    /// Flush the whole buffer for `key` now, cancelling its silence timer.
    pub async fn flush(&self, key: &ChannelKey) -> FlushOutcome {
        self.inner.debouncer.cancel(key);
        self.inner.flush_taken(key).await
    }

    /// Number of messages buffered for `key`.
    pub fn size(&self, key: &ChannelKey) -> usize {
        self.inner.store.size(key)
    }

    /// Copy of the buffer for `key`.
    pub fn snapshot(&self, key: &ChannelKey) -> Vec<BufferedMessage> {
        self.inner.store.snapshot(key)
    }

    /// Drop the buffer and timer for `key` without flushing.
    pub fn clear(&self, key: &ChannelKey) -> usize {
        self.inner.debouncer.cancel(key);
        self.inner.store.clear(key)
    }

    /// Replace the buffer for `key`. Does not touch its timer.
    pub fn replace(&self, key: &ChannelKey, messages: Vec<BufferedMessage>) {
        self.inner.store.replace(key, messages);
    }

    /// Channels with a live buffer, in registration order.
    pub fn channels(&self) -> Vec<ChannelKey> {
        self.inner.store.keys()
    }

    /// Whether `key` has a live silence timer.
    pub fn is_pending(&self, key: &ChannelKey) -> bool {
        self.inner.debouncer.is_pending(key)
    }

    /// Number of live silence timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.debouncer.pending_count()
    }

    /// Whether the registry has been drained.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.read()
    }

    /// Number of background flushes and timers still running.
    pub fn in_flight(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Registry statistics.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            channels: self.inner.store.len(),
            buffered_messages: self.inner.store.total_messages(),
            pending_timers: self.inner.debouncer.pending_count(),
        }
    }

    fn arm(&self, key: ChannelKey) {
        let registry = Arc::downgrade(&self.inner);
        self.inner.debouncer.arm(key, move |key| async move {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            let outcome = inner.flush_taken(&key).await;
            debug!(channel = %key, outcome = ?outcome, "Silence flush finished");
        });
    }
}

impl std::fmt::Debug for ConversationBufferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationBufferRegistry")
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}
