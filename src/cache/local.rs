// In-process cache store.
// Lock-guarded map of JSON payloads with a per-entry TTL; state does not
// survive the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};

/// One cached payload. Live while `now - stored_at < ttl`.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    stored_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// In-process key-value store with TTL eviction.
///
/// Stale entries are evicted lazily on lookup rather than by a background
/// sweeper; a process doing no lookups keeps no timer alive.
#[derive(Debug)]
pub struct LocalStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Construct with an injected clock (tests).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Return the live value for `key`, evicting it first if it has expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key`, replacing any existing entry.
    pub fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
    }

    /// Remove `key` if present. Absent keys are a no-op.
    pub fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}
