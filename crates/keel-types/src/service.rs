//! Collaborator contracts for the remote extraction and recall service.
//!
//! The traits are defined here so that `keel-capture` can drive extraction and
//! recall without depending on `keel-client`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::channel::ChannelKey;
use crate::error::ServiceError;
use crate::message::BufferedMessage;

/// A batch of buffered conversation handed to the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Messages in conversational order.
    pub messages: Vec<BufferedMessage>,
    /// Fixed tag identifying where the batch came from.
    pub source: String,
    /// Channel the messages were buffered under.
    pub channel: ChannelKey,
}

/// What the extraction service reports back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    #[serde(default)]
    pub decisions_found: u32,
    /// Any additional fields the service includes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A free-text memory query with a token budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallQuery {
    pub query: String,
    pub max_tokens: u32,
}

/// Context assembled by the recall service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallContext {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub decisions_included: u32,
}

impl RecallContext {
    /// Whether there is anything worth injecting.
    pub fn is_empty(&self) -> bool {
        self.context.trim().is_empty()
    }
}

/// Remote decision extraction.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Submit one batch for extraction.
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionSummary, ServiceError>;
}

/// Remote context retrieval.
#[async_trait]
pub trait RecallService: Send + Sync {
    /// Retrieve memory context relevant to the query.
    async fn recall(&self, query: RecallQuery) -> Result<RecallContext, ServiceError>;
}

/// Shared extraction service type for use across crates.
pub type SharedExtractionService = Arc<dyn ExtractionService>;

/// Shared recall service type for use across crates.
pub type SharedRecallService = Arc<dyn RecallService>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_keeps_extra_fields() {
        let summary: ExtractionSummary = serde_json::from_value(json!({
            "decisionsFound": 3,
            "entities": ["budget"]
        }))
        .unwrap();
        assert_eq!(summary.decisions_found, 3);
        assert_eq!(summary.extra["entities"], json!(["budget"]));
    }

    #[test]
    fn test_recall_query_wire_shape() {
        let query = RecallQuery {
            query: "what did we pick".to_string(),
            max_tokens: 1500,
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"query": "what did we pick", "maxTokens": 1500})
        );
    }

    #[test]
    fn test_recall_context_emptiness() {
        let ctx: RecallContext = serde_json::from_value(json!({"context": "  "})).unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.decisions_included, 0);
    }
}
