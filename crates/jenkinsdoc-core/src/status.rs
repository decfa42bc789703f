//! Status indicator text and update throttling.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::DocConfig;
use crate::knowledge_base::KnowledgeBase;

/// Key under which the indicator is published.
pub const STATUS_KEY: &str = "jenkins_doc";

/// Minimum time between two updates for the same document.
pub const STATUS_THROTTLE: Duration = Duration::from_millis(500);

/// Indicator text for a document, or `None` when it should be cleared.
pub fn status_text(config: &DocConfig, kb: &KnowledgeBase, is_jenkins: bool) -> Option<String> {
    if !config.show_status_bar || !is_jenkins {
        return None;
    }

    let text = &config.status_bar_text;
    let steps = kb.instructions().len();
    if steps == 0 {
        return Some(format!("{text} (no data)"));
    }
    if config.show_instruction_count {
        Some(format!("{text} ({steps} steps)"))
    } else {
        Some(text.clone())
    }
}

/// Drops status updates that arrive too soon after the previous one for
/// the same key.
#[derive(Debug)]
pub struct StatusThrottle<K> {
    interval: Duration,
    last_update: Mutex<HashMap<K, Instant>>,
}

impl<K: Hash + Eq> Default for StatusThrottle<K> {
    fn default() -> Self {
        Self::new(STATUS_THROTTLE)
    }
}

impl<K: Hash + Eq> StatusThrottle<K> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_update: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true (and records the time) when an update for `key` may go out now.
    pub fn should_update(&self, key: K) -> bool {
        let now = Instant::now();
        let mut last_update = self.last_update.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = last_update.get(&key) {
            if now.duration_since(*previous) < self.interval {
                return false;
            }
        }
        last_update.insert(key, now);
        true
    }

    /// Forget `key`, e.g. when its document closes.
    pub fn forget(&self, key: &K) {
        self.last_update
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}
