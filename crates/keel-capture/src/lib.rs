//! Conversation capture: per-channel buffering and extraction triggers.
//!
//! This crate sits between the host runtime's hook events and the remote
//! memory service:
//! - A relevance filter decides whether an incoming message is worth a recall
//! - Qualifying messages are buffered per channel in arrival order
//! - Each channel gets a silence timer that flushes after a quiet period
//! - Full buffers flush early, carrying a short overlap into the next batch
//! - On stop, every buffer is drained in one pass
//!
//! # Example
//!
//! ```rust,ignore
//! use keel_capture::{BufferConfig, ConversationBufferRegistry, MemoryHooks};
//!
//! let registry = ConversationBufferRegistry::new(BufferConfig::default(), client.clone())?;
//! let hooks = MemoryHooks::new(registry).with_recall(client, 1500);
//!
//! hooks.after_response(&event).await;
//! let report = hooks.on_stop().await;
//! ```

mod buffer;
mod config;
mod debounce;
mod drain;
mod error;
mod filter;
mod flush;
mod hooks;
mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use buffer::{Appended, ChannelBufferStore};
pub use config::{
    BufferConfig, DEFAULT_MAX_BUFFER_SIZE, DEFAULT_MIN_CONTENT_CHARS, DEFAULT_MIN_FLUSH_MESSAGES,
    DEFAULT_OVERLAP, DEFAULT_SILENCE_WINDOW, DEFAULT_SOURCE,
};
pub use debounce::Debouncer;
pub use drain::DrainReport;
pub use error::{Error, Result};
pub use filter::{
    CasualKind, MEMORY_KEYWORDS, Relevance, RelevanceFilter, SHORT_TEXT_CHARS, SkipReason,
    has_keyword, select_recall_text, should_consult_memory,
};
pub use flush::{FlushCoordinator, FlushOutcome};
pub use hooks::{DEFAULT_RECALL_MAX_TOKENS, InjectedContext, MemoryHooks};
pub use registry::{CaptureOutcome, ConversationBufferRegistry, RegistryStats};
