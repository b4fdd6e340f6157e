//! Error types for capture layer setup.
//!
//! Runtime operations (append, flush, drain) never fail; collaborator errors
//! are reported through [`crate::FlushOutcome`] instead.

/// Error type for capture layer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Buffer configuration is inconsistent.
    #[error("Invalid buffer configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for capture layer operations.
pub type Result<T> = std::result::Result<T, Error>;
