//! Errors reported by the remote collaborators.

use thiserror::Error;

/// Failure of an extraction or recall call.
///
/// The capture layer never propagates these to the host; they are logged and
/// the batch or query is dropped.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The request could not be delivered or timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The service rejected our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ServiceError {
    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Transport(_))
    }
}
