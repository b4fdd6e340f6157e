//! Response types that are not part of the collaborator contracts.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status (ok, degraded, unhealthy).
    #[serde(default)]
    pub status: String,
    /// Service version.
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthResponse {
    /// Whether the service reports itself as healthy.
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok") || self.status.eq_ignore_ascii_case("healthy")
    }
}
