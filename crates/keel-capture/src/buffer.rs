//! Per-channel message buffers.

use indexmap::IndexMap;
use keel_types::{BufferedMessage, ChannelKey, RawMessage};
use parking_lot::Mutex;
use tracing::trace;

/// Result of an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// Number of qualifying messages added.
    pub added: usize,
    /// Buffer length after the append.
    pub size: usize,
}

/// Keyed, insertion-ordered buffers of conversation messages.
///
/// The store owns every buffered message. A key exists only while its buffer
/// holds at least one message; keys iterate in registration order.
#[derive(Debug)]
pub struct ChannelBufferStore {
    buffers: Mutex<IndexMap<ChannelKey, Vec<BufferedMessage>>>,
    min_content_chars: usize,
}

impl ChannelBufferStore {
    /// Create an empty store that keeps messages longer than
    /// `min_content_chars` characters.
    pub fn new(min_content_chars: usize) -> Self {
        Self {
            buffers: Mutex::new(IndexMap::new()),
            min_content_chars,
        }
    }

    /// Turn a raw host message into a buffered one, if it qualifies.
    ///
    /// Qualifying messages come from the user or the assistant and carry more
    /// than `min_content_chars` characters of flattened text.
    pub fn qualify(&self, raw: &RawMessage) -> Option<BufferedMessage> {
        let role = raw.role().filter(|r| r.is_conversational())?;
        let content = raw.text()?;
        if content.chars().count() <= self.min_content_chars {
            return None;
        }
        Some(BufferedMessage::new(role, content))
    }

    /// Append all qualifying messages to the buffer for `key`.
    ///
    /// The buffer is created on first use. When nothing qualifies the store is
    /// left untouched and `added` is zero.
    pub fn append(&self, key: &ChannelKey, messages: &[RawMessage]) -> Appended {
        let qualifying: Vec<BufferedMessage> =
            messages.iter().filter_map(|m| self.qualify(m)).collect();

        let mut buffers = self.buffers.lock();
        if qualifying.is_empty() {
            let size = buffers.get(key).map_or(0, Vec::len);
            return Appended { added: 0, size };
        }

        let added = qualifying.len();
        let buffer = buffers.entry(key.clone()).or_default();
        buffer.extend(qualifying);
        let size = buffer.len();

        trace!(channel = %key, added, size, "Messages buffered");
        Appended { added, size }
    }

    /// Number of messages buffered for `key`.
    pub fn size(&self, key: &ChannelKey) -> usize {
        self.buffers.lock().get(key).map_or(0, Vec::len)
    }

    /// Copy of the buffer for `key`, in arrival order.
    pub fn snapshot(&self, key: &ChannelKey) -> Vec<BufferedMessage> {
        self.buffers.lock().get(key).cloned().unwrap_or_default()
    }

    /// Whether a buffer exists for `key`.
    pub fn contains(&self, key: &ChannelKey) -> bool {
        self.buffers.lock().contains_key(key)
    }

    /// Drop the buffer for `key`. Returns how many messages were dropped.
    pub fn clear(&self, key: &ChannelKey) -> usize {
        self.buffers
            .lock()
            .shift_remove(key)
            .map_or(0, |buffer| buffer.len())
    }

    /// Replace the buffer for `key`. An empty replacement removes the key.
    pub fn replace(&self, key: &ChannelKey, messages: Vec<BufferedMessage>) {
        let mut buffers = self.buffers.lock();
        if messages.is_empty() {
            buffers.shift_remove(key);
        } else {
            buffers.insert(key.clone(), messages);
        }
    }

    /// Remove and return the whole buffer for `key`.
    pub fn take(&self, key: &ChannelKey) -> Option<Vec<BufferedMessage>> {
        self.buffers.lock().shift_remove(key)
    }

    /// Split an overflowing buffer in one step.
    ///
    /// Everything except the trailing `keep` messages is returned; the
    /// trailing messages stay as the live buffer. Returns `None` when the
    /// buffer does not hold more than `keep` messages.
    pub fn split_overflow(&self, key: &ChannelKey, keep: usize) -> Option<Vec<BufferedMessage>> {
        let mut buffers = self.buffers.lock();
        let buffer = buffers.get_mut(key)?;
        if buffer.len() <= keep {
            return None;
        }
        let retained = buffer.split_off(buffer.len() - keep);
        let batch = std::mem::replace(buffer, retained);
        if buffer.is_empty() {
            buffers.shift_remove(key);
        }
        Some(batch)
    }

    /// Buffered channel keys, in registration order.
    pub fn keys(&self) -> Vec<ChannelKey> {
        self.buffers.lock().keys().cloned().collect()
    }

    /// Number of channels with a buffer.
    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Whether no channel has a buffer.
    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }

    /// Total messages across all channels.
    pub fn total_messages(&self) -> usize {
        self.buffers.lock().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::Role;
    use serde_json::json;

    fn store() -> ChannelBufferStore {
        ChannelBufferStore::new(5)
    }

    fn key(k: &str) -> ChannelKey {
        ChannelKey::from(k)
    }

    #[test]
    fn test_qualify_rules() {
        let store = store();
        assert!(store.qualify(&RawMessage::new("user", "hello world")).is_some());
        assert!(store.qualify(&RawMessage::new("assistant", "sure thing")).is_some());
        // Exactly five characters is not enough.
        assert!(store.qualify(&RawMessage::new("user", "12345")).is_none());
        assert!(store.qualify(&RawMessage::new("user", "123456")).is_some());
        assert!(store.qualify(&RawMessage::new("system", "you are helpful")).is_none());
        assert!(store.qualify(&RawMessage::new("tool", "{\"ok\": true}")).is_none());
        assert!(
            store
                .qualify(&RawMessage::with_parts("user", json!(42)))
                .is_none()
        );
    }

    #[test]
    fn test_qualify_flattens_parts() {
        let store = store();
        let msg = store
            .qualify(&RawMessage::with_parts(
                "user",
                json!([{"type": "text", "text": "abc"}, {"type": "text", "text": "def"}]),
            ))
            .unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "abc\ndef");
    }

    #[test]
    fn test_append_preserves_order() {
        let store = store();
        let k = key("chan");
        store.append(&k, &[RawMessage::new("user", "first message")]);
        let appended = store.append(
            &k,
            &[
                RawMessage::new("assistant", "second message"),
                RawMessage::new("user", "third message"),
            ],
        );
        assert_eq!(appended, Appended { added: 2, size: 3 });

        let contents: Vec<String> = store.snapshot(&k).into_iter().map(|m| m.content).collect();
        assert_eq!(
            contents,
            vec!["first message", "second message", "third message"]
        );
    }

    #[test]
    fn test_append_nothing_qualifying_does_not_create_key() {
        let store = store();
        let k = key("chan");
        let appended = store.append(&k, &[RawMessage::new("user", "ok"), RawMessage::default()]);
        assert_eq!(appended, Appended { added: 0, size: 0 });
        assert!(!store.contains(&k));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_and_take_remove_key() {
        let store = store();
        let k = key("chan");
        store.append(&k, &[RawMessage::new("user", "first message")]);
        assert_eq!(store.clear(&k), 1);
        assert!(!store.contains(&k));
        assert_eq!(store.clear(&k), 0);

        store.append(&k, &[RawMessage::new("user", "second message")]);
        let taken = store.take(&k).unwrap();
        assert_eq!(taken.len(), 1);
        assert!(store.take(&k).is_none());
    }

    #[test]
    fn test_replace_with_empty_removes_key() {
        let store = store();
        let k = key("chan");
        store.replace(&k, vec![BufferedMessage::user("seeded message")]);
        assert_eq!(store.size(&k), 1);
        store.replace(&k, Vec::new());
        assert!(!store.contains(&k));
    }

    #[test]
    fn test_split_overflow_keeps_tail() {
        let store = store();
        let k = key("chan");
        let raw: Vec<RawMessage> = (0..10)
            .map(|i| RawMessage::new("user", format!("message {i}")))
            .collect();
        store.append(&k, &raw);

        let batch = store.split_overflow(&k, 4).unwrap();
        assert_eq!(batch.len(), 6);
        assert_eq!(batch[0].content, "message 0");
        assert_eq!(batch[5].content, "message 5");

        let live: Vec<String> = store.snapshot(&k).into_iter().map(|m| m.content).collect();
        assert_eq!(
            live,
            vec!["message 6", "message 7", "message 8", "message 9"]
        );
    }

    #[test]
    fn test_split_overflow_too_small() {
        let store = store();
        let k = key("chan");
        store.append(&k, &[RawMessage::new("user", "only message")]);
        assert!(store.split_overflow(&k, 4).is_none());
        assert!(store.split_overflow(&key("missing"), 4).is_none());
        assert_eq!(store.size(&k), 1);
    }

    #[test]
    fn test_keys_in_registration_order() {
        let store = store();
        for name in ["b", "a", "c"] {
            store.append(&key(name), &[RawMessage::new("user", "some message")]);
        }
        store.append(&key("a"), &[RawMessage::new("user", "another message")]);
        assert_eq!(store.keys(), vec![key("b"), key("a"), key("c")]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.total_messages(), 4);
    }
}
