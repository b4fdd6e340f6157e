//! Channel identity.

use serde::{Deserialize, Serialize};

/// Key used when an event carries no session or channel identity.
pub const DEFAULT_CHANNEL: &str = "default";

/// Identity of a logical conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKey(String);

impl ChannelKey {
    /// Create a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive a key from an event's identity fields.
    ///
    /// The session key wins over the channel id; blank values count as absent,
    /// and with neither present the [`DEFAULT_CHANNEL`] key is used.
    pub fn resolve(session_key: Option<&str>, channel_id: Option<&str>) -> Self {
        session_key
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| channel_id.map(str::trim).filter(|s| !s.is_empty()))
            .map(Self::new)
            .unwrap_or_default()
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the fallback key.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_CHANNEL
    }
}

impl Default for ChannelKey {
    fn default() -> Self {
        Self(DEFAULT_CHANNEL.to_string())
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChannelKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ChannelKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_wins() {
        let key = ChannelKey::resolve(Some("agent:main:telegram"), Some("telegram"));
        assert_eq!(key.as_str(), "agent:main:telegram");
    }

    #[test]
    fn test_channel_id_fallback() {
        let key = ChannelKey::resolve(None, Some("slack-42"));
        assert_eq!(key.as_str(), "slack-42");

        let key = ChannelKey::resolve(Some("   "), Some("slack-42"));
        assert_eq!(key.as_str(), "slack-42");
    }

    #[test]
    fn test_default_when_absent() {
        let key = ChannelKey::resolve(None, None);
        assert!(key.is_default());
        assert_eq!(key, ChannelKey::default());

        let key = ChannelKey::resolve(Some(""), Some(""));
        assert!(key.is_default());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let key = ChannelKey::from("ops");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"ops\"");
    }
}
