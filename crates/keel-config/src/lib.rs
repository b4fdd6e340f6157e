//! Configuration for Keel.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (user config dir + project-local `keel.toml`)
//! - Environment fallbacks for the service address and feature flags
//! - Environment override for the API key

pub mod discovery;
pub mod error;
pub mod resolve;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use resolve::{
    API_KEY_ENV, API_URL_ENV, AUTO_CAPTURE_ENV, AUTO_RECALL_ENV, FeatureFlags, ServiceSettings,
    parse_flag, resolve_flag,
};
pub use types::*;
