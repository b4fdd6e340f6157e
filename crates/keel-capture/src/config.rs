//! Configuration for channel buffering and flush triggers.

use std::time::Duration;

use crate::error::{Error, Result};

/// Quiet period after which a channel's buffer is flushed.
pub const DEFAULT_SILENCE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Buffer size that forces an immediate flush.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 20;

/// Messages retained across an overflow flush.
pub const DEFAULT_OVERLAP: usize = 4;

/// Smallest batch worth sending for extraction (two exchanges).
pub const DEFAULT_MIN_FLUSH_MESSAGES: usize = 4;

/// Messages must be longer than this many characters to be buffered.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 5;

/// Source tag attached to every extraction batch.
pub const DEFAULT_SOURCE: &str = "conversation";

/// Configuration for the conversation buffer registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Silence period after the last message before a debounced flush.
    pub silence_window: Duration,

    /// Buffer length at which an overflow flush happens immediately.
    pub max_buffer_size: usize,

    /// Trailing messages kept as the seed of the next buffer after an
    /// overflow flush.
    pub overlap: usize,

    /// Batches smaller than this are discarded without an extraction call.
    pub min_flush_messages: usize,

    /// Minimum content length (exclusive, in characters) for a message to be
    /// buffered.
    pub min_content_chars: usize,

    /// Source tag sent with each extraction batch.
    pub source: String,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            silence_window: DEFAULT_SILENCE_WINDOW,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            overlap: DEFAULT_OVERLAP,
            min_flush_messages: DEFAULT_MIN_FLUSH_MESSAGES,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl BufferConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the silence window.
    pub fn with_silence_window(mut self, window: Duration) -> Self {
        self.silence_window = window;
        self
    }

    /// Set the overflow threshold.
    pub fn with_max_buffer_size(mut self, max: usize) -> Self {
        self.max_buffer_size = max;
        self
    }

    /// Set the number of messages retained across an overflow flush.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Set the minimum batch size for extraction.
    pub fn with_min_flush_messages(mut self, min: usize) -> Self {
        self.min_flush_messages = min;
        self
    }

    /// Set the minimum content length for buffered messages.
    pub fn with_min_content_chars(mut self, chars: usize) -> Self {
        self.min_content_chars = chars;
        self
    }

    /// Set the source tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Check that the settings describe a workable buffer.
    pub fn validate(&self) -> Result<()> {
        if self.silence_window.is_zero() {
            return Err(Error::InvalidConfig(
                "silence_window must be greater than zero".to_string(),
            ));
        }
        if self.max_buffer_size <= self.overlap {
            return Err(Error::InvalidConfig(format!(
                "max_buffer_size ({}) must exceed overlap ({})",
                self.max_buffer_size, self.overlap
            )));
        }
        if self.min_flush_messages == 0 {
            return Err(Error::InvalidConfig(
                "min_flush_messages must be at least 1".to_string(),
            ));
        }
        if self.source.trim().is_empty() {
            return Err(Error::InvalidConfig("source must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BufferConfig::default();
        assert_eq!(config.silence_window, Duration::from_secs(300));
        assert_eq!(config.max_buffer_size, 20);
        assert_eq!(config.overlap, 4);
        assert_eq!(config.min_flush_messages, 4);
        assert_eq!(config.min_content_chars, 5);
        assert_eq!(config.source, "conversation");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_below_max() {
        let config = BufferConfig::new().with_max_buffer_size(4).with_overlap(4);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = BufferConfig::new().with_silence_window(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_min_flush_rejected() {
        let config = BufferConfig::new().with_min_flush_messages(0);
        assert!(config.validate().is_err());
    }
}
