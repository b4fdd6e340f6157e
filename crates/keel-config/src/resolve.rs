//! Resolution of effective settings from config plus environment.
//!
//! Explicit config values win, then environment variables, then defaults.
//! The one exception is the API key, where the environment wins so a secret
//! never has to live in a file.

use std::time::Duration;

use crate::types::{DEFAULT_BASE_URL, KeelConfig};

/// Service base URL fallback.
pub const API_URL_ENV: &str = "KEEL_API_URL";

/// Service bearer token.
pub const API_KEY_ENV: &str = "KEEL_API_KEY";

/// Capture on/off fallback.
pub const AUTO_CAPTURE_ENV: &str = "KEEL_AUTO_CAPTURE";

/// Recall on/off fallback.
pub const AUTO_RECALL_ENV: &str = "KEEL_AUTO_RECALL";

/// Parse a flag value: `1/true/yes/on` or `0/false/no/off`, case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    ["1", "true", "yes", "on"]
        .iter()
        .any(|v| value.eq_ignore_ascii_case(v))
        .then_some(true)
        .or_else(|| {
            ["0", "false", "no", "off"]
                .iter()
                .any(|v| value.eq_ignore_ascii_case(v))
                .then_some(false)
        })
}

/// Resolve one flag. Unset and unparseable values both default to on.
pub fn resolve_flag(configured: Option<bool>, env_value: Option<&str>) -> bool {
    configured
        .or_else(|| env_value.and_then(parse_flag))
        .unwrap_or(true)
}

/// Whether each hook path is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub capture: bool,
    pub recall: bool,
}

impl FeatureFlags {
    /// Resolve against the process environment.
    pub fn resolve(config: &KeelConfig) -> Self {
        Self::resolve_with(config, |var| std::env::var(var).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with(config: &KeelConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            capture: resolve_flag(
                config.capture().enabled,
                env(AUTO_CAPTURE_ENV).as_deref(),
            ),
            recall: resolve_flag(config.recall().enabled, env(AUTO_RECALL_ENV).as_deref()),
        }
    }
}

/// Effective service connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ServiceSettings {
    /// Resolve against the process environment.
    pub fn resolve(config: &KeelConfig) -> Self {
        Self::resolve_with(config, |var| std::env::var(var).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with(config: &KeelConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let service = config.service();
        let non_empty = |v: String| (!v.trim().is_empty()).then_some(v);

        let base_url = service
            .base_url
            .and_then(non_empty)
            .or_else(|| env(API_URL_ENV).and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = env(API_KEY_ENV)
            .and_then(non_empty)
            .or_else(|| service.api_key.and_then(non_empty));

        Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(service.timeout_secs),
        }
    }

    /// Replace the base URL (e.g. from a `--server` argument).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
