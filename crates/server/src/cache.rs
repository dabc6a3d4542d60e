//! Read cache for the dashboard snapshot. The raw collections are re-read
//! from the store at most once per TTL window; writes invalidate eagerly.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A cached value with its load time.
struct Entry<T> {
    loaded_at: Instant,
    value: T,
}

pub struct SnapshotCache<T> {
    ttl: Duration,
    entry: Mutex<Option<Entry<T>>>,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: Mutex::new(None) }
    }

    /// Returns the cached value if it is still fresh. A poisoned lock is
    /// treated as a miss.
    pub fn get(&self) -> Option<T> {
        let guard = self.entry.lock().ok()?;
        let entry = guard.as_ref()?;
        if entry.loaded_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, value: T) {
        if let Ok(mut guard) = self.entry.lock() {
            *guard = Some(Entry { loaded_at: Instant::now(), value });
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.entry.lock() {
            *guard = None;
        }
    }
}
