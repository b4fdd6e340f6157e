//! Message types observed from the host runtime and held in channel buffers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    /// Parse a host-provided role name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }

    /// Whether messages with this role are kept in channel buffers.
    pub fn is_conversational(self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A message held in a channel buffer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl BufferedMessage {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::with_timestamp(role, content, Utc::now())
    }

    /// Create a message with an explicit timestamp.
    pub fn with_timestamp(
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A message as delivered by the host, before any validation.
///
/// Hosts send loosely shaped JSON; the role is kept as a raw string and the
/// content as an arbitrary value so that malformed entries degrade to
/// "no text" rather than failing the whole event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl RawMessage {
    /// Create a raw message with plain text content.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Value::String(content.into()),
        }
    }

    /// Create a raw message with structured (multi-part) content.
    pub fn with_parts(role: impl Into<String>, parts: Value) -> Self {
        Self {
            role: Some(role.into()),
            content: parts,
        }
    }

    /// Build from an arbitrary JSON value. Non-object values yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// The parsed role, if known.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }

    /// The flattened text content, if any.
    pub fn text(&self) -> Option<String> {
        flatten_content(&self.content)
    }
}

/// Flatten message content into a single text.
///
/// Plain strings are returned as-is. Arrays of parts contribute their text
/// parts (bare strings or `{"type": "text", "text": ...}` objects), joined
/// with newlines; other part types are ignored. Any other shape, or an array
/// without text parts, yields `None`.
pub fn flatten_content(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts.iter().filter_map(part_text).collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
        _ => None,
    }
}

fn part_text(part: &Value) -> Option<&str> {
    match part {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => {
            let is_text = map
                .get("type")
                .and_then(Value::as_str)
                .is_none_or(|t| t == "text");
            if is_text {
                map.get("text").and_then(Value::as_str)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("Assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("narrator"), None);
        assert!(Role::User.is_conversational());
        assert!(!Role::Tool.is_conversational());
    }

    #[test]
    fn test_flatten_plain_string() {
        assert_eq!(
            flatten_content(&json!("hello there")),
            Some("hello there".to_string())
        );
    }

    #[test]
    fn test_flatten_parts() {
        let content = json!([
            {"type": "text", "text": "first"},
            {"type": "image", "url": "https://example.com/a.png"},
            "second",
            {"type": "text", "text": "third"}
        ]);
        assert_eq!(
            flatten_content(&content),
            Some("first\nsecond\nthird".to_string())
        );
    }

    #[test]
    fn test_flatten_unsupported_shapes() {
        assert_eq!(flatten_content(&json!(42)), None);
        assert_eq!(flatten_content(&json!(null)), None);
        assert_eq!(flatten_content(&json!({"text": "loose"})), None);
        assert_eq!(flatten_content(&json!([{"type": "image"}])), None);
    }

    #[test]
    fn test_raw_message_from_value() {
        let raw = RawMessage::from_value(json!({"role": "user", "content": "hi"})).unwrap();
        assert_eq!(raw.role(), Some(Role::User));
        assert_eq!(raw.text().as_deref(), Some("hi"));

        assert!(RawMessage::from_value(json!("not an object")).is_none());

        let missing = RawMessage::from_value(json!({})).unwrap();
        assert_eq!(missing.role(), None);
        assert_eq!(missing.text(), None);
    }

    #[test]
    fn test_buffered_message_wire_shape() {
        let ts = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let msg = BufferedMessage::with_timestamp(Role::Assistant, "Shipping Friday", ts);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "Shipping Friday");
        assert_eq!(value["timestamp"], "2026-03-01T12:00:00Z");
    }
}
