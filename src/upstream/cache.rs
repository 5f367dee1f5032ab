//! TTL response cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde_json::Value;

use crate::observability::metrics;

/// Source of wall-clock time, expressed as time since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Duration) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis() as u64),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, to: Duration) {
        self.millis.store(to.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

struct CacheEntry {
    value: Value,
    expires_at: Duration,
}

/// Thread-safe upstream response cache with a fixed TTL.
///
/// Expired entries are dropped when they are next looked up; nothing sweeps
/// the map in the background.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Return the live entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let live = self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());

        match live {
            Some(value) => {
                metrics::record_cache_lookup(true);
                Some(value)
            }
            None => {
                self.evict_if_expired(key, now);
                metrics::record_cache_lookup(false);
                None
            }
        }
    }

    /// Remove `key` only if it is still expired at `now`; an entry a
    /// concurrent miss stored in the meantime survives.
    fn evict_if_expired(&self, key: &str, now: Duration) {
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
    }

    pub fn insert(&self, key: String, value: Value) {
        let entry = CacheEntry {
            value,
            expires_at: self.clock.now() + self.ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
