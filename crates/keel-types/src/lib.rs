//! Shared types for the Keel capture layer.
//!
//! These types are shared between `keel-capture` (buffering, debouncing and
//! flush decisions), `keel-client` (the HTTP collaborator) and the `keel`
//! binary (the host bridge).

pub mod channel;
pub mod error;
pub mod event;
pub mod message;
pub mod service;

pub use channel::{ChannelKey, DEFAULT_CHANNEL};
pub use error::ServiceError;
pub use event::{AfterResponseEvent, BeforeResponseEvent};
pub use message::{BufferedMessage, RawMessage, Role, flatten_content};
pub use service::{
    ExtractionRequest, ExtractionService, ExtractionSummary, RecallContext, RecallQuery,
    RecallService, SharedExtractionService, SharedRecallService,
};
