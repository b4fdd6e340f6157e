//! Configuration types.
//!
//! Every section is optional in the file; a section present in a later layer
//! replaces the whole section from an earlier one.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default memory service address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8900";

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration.
///
/// ```toml
/// [service]
/// base_url = "http://127.0.0.1:8900"
/// timeout_secs = 30
///
/// [capture]
/// enabled = true
///
/// [recall]
/// max_tokens = 1500
///
/// [buffer]
/// silence_window_secs = 300
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeelConfig {
    /// Remote memory service connection.
    pub service: Option<ServiceConfig>,
    /// Automatic capture of conversation turns.
    pub capture: Option<CaptureConfig>,
    /// Automatic recall before responses.
    pub recall: Option<RecallConfig>,
    /// Buffering and flush thresholds.
    pub buffer: Option<BufferSection>,
    /// Log output.
    pub logging: Option<LoggingConfig>,
}

impl KeelConfig {
    /// Create an empty config (all sections absent).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: KeelConfig) {
        if other.service.is_some() {
            self.service = other.service;
        }
        if other.capture.is_some() {
            self.capture = other.capture;
        }
        if other.recall.is_some() {
            self.recall = other.recall;
        }
        if other.buffer.is_some() {
            self.buffer = other.buffer;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[service]` section, or defaults.
    pub fn service(&self) -> ServiceConfig {
        self.service.clone().unwrap_or_default()
    }

    /// The `[capture]` section, or defaults.
    pub fn capture(&self) -> CaptureConfig {
        self.capture.clone().unwrap_or_default()
    }

    /// The `[recall]` section, or defaults.
    pub fn recall(&self) -> RecallConfig {
        self.recall.clone().unwrap_or_default()
    }

    /// The `[buffer]` section, or defaults.
    pub fn buffer(&self) -> BufferSection {
        self.buffer.clone().unwrap_or_default()
    }

    /// The `[logging]` section, or defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

/// Memory service connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service base URL. Falls back to `KEEL_API_URL`, then the default.
    pub base_url: Option<String>,
    /// Bearer token. `KEEL_API_KEY` takes priority when set.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    /// Whether the file carries a plaintext API key.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Explicit on/off. Unset defers to `KEEL_AUTO_CAPTURE`.
    pub enabled: Option<bool>,
    /// Source tag attached to extraction batches.
    pub source: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            source: "conversation".to_string(),
        }
    }
}

/// Recall settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Explicit on/off. Unset defers to `KEEL_AUTO_RECALL`.
    pub enabled: Option<bool>,
    /// Token budget for recalled context.
    pub max_tokens: u32,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            max_tokens: 1500,
        }
    }
}

/// Buffer thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSection {
    /// Quiet period before a channel is flushed.
    pub silence_window_secs: u64,
    /// Buffer size that triggers an immediate flush.
    pub max_buffer_size: usize,
    /// Messages carried into the next batch after an overflow flush.
    pub overlap: usize,
    /// Batches smaller than this are discarded.
    pub min_flush_messages: usize,
}

impl Default for BufferSection {
    fn default() -> Self {
        Self {
            silence_window_secs: 300,
            max_buffer_size: 20,
            overlap: 4,
            min_flush_messages: 4,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write a daily JSON log file in addition to stderr.
    pub json_file: bool,
    /// Log directory. Defaults to `logs/` under the config directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_file: true,
            directory: None,
        }
    }
}
