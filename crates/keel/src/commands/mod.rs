//! CLI command handlers.

pub mod classify;
pub mod health;
pub mod run;

use std::time::Duration;

use anyhow::{Context as _, Result};
use keel_capture::BufferConfig;
use keel_client::KeelClient;
use keel_config::{KeelConfig, ServiceSettings};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration layers.
    pub config: KeelConfig,
    /// `--server` value, if given.
    pub server_override: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Effective service settings after config, environment and CLI overrides.
    pub fn service_settings(&self) -> ServiceSettings {
        let settings = ServiceSettings::resolve(&self.config);
        match &self.server_override {
            Some(url) => settings.with_base_url(url.clone()),
            None => settings,
        }
    }

    /// Build an API client from the effective settings.
    pub fn client(&self) -> Result<KeelClient> {
        let settings = self.service_settings();
        KeelClient::builder()
            .base_url(&settings.base_url)
            .maybe_api_key(settings.api_key)
            .timeout(settings.timeout)
            .build()
            .with_context(|| format!("invalid service URL '{}'", settings.base_url))
    }

    /// Buffer thresholds from the `[buffer]` and `[capture]` sections.
    pub fn buffer_config(&self) -> BufferConfig {
        let buffer = self.config.buffer();
        BufferConfig::new()
            .with_silence_window(Duration::from_secs(buffer.silence_window_secs))
            .with_max_buffer_size(buffer.max_buffer_size)
            .with_overlap(buffer.overlap)
            .with_min_flush_messages(buffer.min_flush_messages)
            .with_source(self.config.capture().source)
    }
}
