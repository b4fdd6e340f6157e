//! Context (recall) API.

use keel_types::{RecallContext, RecallQuery};

use crate::client::KeelClient;
use crate::error::Result;

/// Context API client.
pub struct ContextApi {
    client: KeelClient,
}

impl ContextApi {
    pub(crate) fn new(client: KeelClient) -> Self {
        Self { client }
    }

    /// Fetch memory context for a free-text query.
    pub async fn query(&self, query: impl Into<String>, max_tokens: u32) -> Result<RecallContext> {
        self.fetch(&RecallQuery {
            query: query.into(),
            max_tokens,
        })
        .await
    }

    /// Fetch memory context for a prepared query.
    pub async fn fetch(&self, query: &RecallQuery) -> Result<RecallContext> {
        self.client.post("context", query).await
    }
}
