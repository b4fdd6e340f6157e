//! Host runtime hook payloads.
//!
//! The host invokes two hooks per turn: one before the model responds (the
//! recall path) and one after (the capture path). Both payloads are read-only
//! inputs to Keel.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::channel::ChannelKey;
use crate::message::{RawMessage, Role};

/// Payload of the "before response" hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeforeResponseEvent {
    /// Conversation so far, oldest first.
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Option<Vec<RawMessage>>,
    /// Flat prompt string, used when the host sends no message list.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "sessionKey")]
    pub session_key: Option<String>,
    #[serde(default, alias = "channelId")]
    pub channel_id: Option<String>,
}

impl BeforeResponseEvent {
    /// Event carrying a message list.
    pub fn with_messages(messages: Vec<RawMessage>) -> Self {
        Self {
            messages: Some(messages),
            ..Default::default()
        }
    }

    /// Event carrying only a flat prompt.
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// Channel this event belongs to.
    pub fn channel_key(&self) -> ChannelKey {
        ChannelKey::resolve(self.session_key.as_deref(), self.channel_id.as_deref())
    }

    /// Text of the most recent user message with non-empty content.
    pub fn last_user_text(&self) -> Option<String> {
        self.messages.as_ref().and_then(|messages| {
            messages
                .iter()
                .rev()
                .filter(|m| m.role() == Some(Role::User))
                .filter_map(RawMessage::text)
                .find(|text| !text.trim().is_empty())
        })
    }
}

/// Payload of the "after response" hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AfterResponseEvent {
    /// Messages produced during the turn, oldest first.
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Option<Vec<RawMessage>>,
    #[serde(default, alias = "sessionKey")]
    pub session_key: Option<String>,
    #[serde(default, alias = "channelId")]
    pub channel_id: Option<String>,
}

impl AfterResponseEvent {
    /// Event for the given channel carrying the given messages.
    pub fn new(session_key: impl Into<String>, messages: Vec<RawMessage>) -> Self {
        Self {
            messages: Some(messages),
            session_key: Some(session_key.into()),
            channel_id: None,
        }
    }

    /// Channel this event belongs to.
    pub fn channel_key(&self) -> ChannelKey {
        ChannelKey::resolve(self.session_key.as_deref(), self.channel_id.as_deref())
    }

    /// Messages carried by the event (empty when absent).
    pub fn messages(&self) -> &[RawMessage] {
        self.messages.as_deref().unwrap_or_default()
    }
}

/// Accept any JSON for `messages`: arrays keep their object entries, anything
/// else is treated as absent.
fn lenient_messages<'de, D>(deserializer: D) -> Result<Option<Vec<RawMessage>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(RawMessage::from_value)
                .collect(),
        ),
        _ => None,
    })
}
