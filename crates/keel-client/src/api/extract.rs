//! Extraction API.

use keel_types::{ExtractionRequest, ExtractionSummary};

use crate::client::KeelClient;
use crate::error::Result;

/// Extraction API client.
pub struct ExtractApi {
    client: KeelClient,
}

impl ExtractApi {
    pub(crate) fn new(client: KeelClient) -> Self {
        Self { client }
    }

    /// Submit a conversation batch for decision extraction.
    pub async fn submit(&self, request: &ExtractionRequest) -> Result<ExtractionSummary> {
        self.client.post("extract", request).await
    }
}
