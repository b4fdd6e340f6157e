//! Silence-window timers, one per channel.
//!
//! Arming a channel cancels its previous timer and schedules a fresh one, so
//! the callback only runs once the channel has been quiet for the whole
//! window.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use keel_types::ChannelKey;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

/// Handle for a scheduled silence flush.
#[derive(Debug)]
struct PendingTimer {
    /// Distinguishes this timer from later ones armed for the same key.
    id: u64,
    token: CancellationToken,
}

type TimerTable = Arc<Mutex<IndexMap<ChannelKey, PendingTimer>>>;

/// Per-channel debounce scheduler.
///
/// Holds at most one live timer per key. Timers run as tokio tasks on the
/// debouncer's [`TaskTracker`], so [`Debouncer::arm`] must be called from
/// within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    timers: TimerTable,
    next_id: AtomicU64,
    silence_window: Duration,
    tasks: TaskTracker,
}

impl Debouncer {
    /// Create a debouncer with the given silence window.
    pub fn new(silence_window: Duration) -> Self {
        Self {
            timers: Arc::new(Mutex::new(IndexMap::new())),
            next_id: AtomicU64::new(0),
            silence_window,
            tasks: TaskTracker::new(),
        }
    }

    /// Spawn timer tasks on `tasks`, so their callbacks can be awaited.
    pub fn with_tracker(mut self, tasks: TaskTracker) -> Self {
        self.tasks = tasks;
        self
    }

    /// (Re)arm the timer for `key`.
    ///
    /// Any existing timer for the key is cancelled. After the silence window
    /// elapses without another `arm` or `cancel`, the timer removes its own
    /// handle and then runs `on_fire(key)` exactly once.
    pub fn arm<F, Fut>(&self, key: ChannelKey, on_fire: F)
    where
        F: FnOnce(ChannelKey) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        {
            let mut timers = self.timers.lock();
            // Re-insert at the back so arming order is preserved.
            if let Some(previous) = timers.shift_remove(&key) {
                previous.token.cancel();
                trace!(channel = %key, "Debounce timer reset");
            }
            timers.insert(key.clone(), PendingTimer { id, token });
        }

        let timers = Arc::clone(&self.timers);
        let window = self.silence_window;
        self.tasks.spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => return,
                _ = tokio::time::sleep(window) => {}
            }

            {
                let mut timers = timers.lock();
                match timers.get(&key) {
                    Some(timer) if timer.id == id => {
                        timers.shift_remove(&key);
                    }
                    // Superseded or cancelled while waking up.
                    _ => return,
                }
            }

            debug!(channel = %key, "Silence window elapsed");
            on_fire(key).await;
        });
    }

    /// Cancel the timer for `key`, if any. Returns whether one was live.
    pub fn cancel(&self, key: &ChannelKey) -> bool {
        match self.timers.lock().shift_remove(key) {
            Some(timer) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every timer. Returns the keys that had a live timer, in
    /// arming order.
    pub fn cancel_all(&self) -> Vec<ChannelKey> {
        let drained: Vec<(ChannelKey, PendingTimer)> = self.timers.lock().drain(..).collect();
        drained
            .into_iter()
            .map(|(key, timer)| {
                timer.token.cancel();
                key
            })
            .collect()
    }

    /// Whether `key` has a live timer.
    pub fn is_pending(&self, key: &ChannelKey) -> bool {
        self.timers.lock().contains_key(key)
    }

    /// Number of live timers.
    pub fn pending_count(&self) -> usize {
        self.timers.lock().len()
    }

    /// Keys with a live timer, in arming order.
    pub fn pending_keys(&self) -> Vec<ChannelKey> {
        self.timers.lock().keys().cloned().collect()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        for (_, timer) in self.timers.lock().drain(..) {
            timer.token.cancel();
        }
    }
}
