//! HTTP client for the Keel memory service.
//!
//! Provides a typed client for the extraction, context and health endpoints,
//! and implements the `keel-types` collaborator traits so the capture layer
//! can use it directly.
//!
//! # Example
//!
//! ```no_run
//! use keel_client::{KeelClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = KeelClient::builder()
//!     .base_url("http://127.0.0.1:8900")
//!     .api_key("secret")
//!     .build()?;
//!
//! if client.health().is_healthy().await {
//!     println!("Service is healthy!");
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
mod service;
pub mod types;

pub use client::{ClientBuilder, DEFAULT_TIMEOUT, KeelClient};
pub use error::{Error, Result};
pub use types::HealthResponse;
