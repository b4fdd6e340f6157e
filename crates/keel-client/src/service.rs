//! Collaborator trait implementations backed by the HTTP API.

use async_trait::async_trait;
use keel_types::{
    ExtractionRequest, ExtractionService, ExtractionSummary, RecallContext, RecallQuery,
    RecallService, ServiceError,
};
use tracing::debug;

use crate::client::KeelClient;

#[async_trait]
impl ExtractionService for KeelClient {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionSummary, ServiceError> {
        debug!(
            channel = %request.channel,
            messages = request.messages.len(),
            "POST extract"
        );
        Ok(self.extract().submit(&request).await?)
    }
}

#[async_trait]
impl RecallService for KeelClient {
    async fn recall(&self, query: RecallQuery) -> Result<RecallContext, ServiceError> {
        debug!(max_tokens = query.max_tokens, "POST context");
        Ok(self.context().fetch(&query).await?)
    }
}
