//! Single-namespace TTL store
//!
//! Expiry is re-checked on every read, so a stale entry is never returned
//! even if the periodic sweep has not run yet. `sweep` only reclaims memory.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// A cached value and the moment it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > ttl
    }
}

/// Concurrent key -> value map with one TTL for all keys
///
/// Entries are replaced whole under a shard lock, so a reader sees either a
/// complete entry or a miss.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Look up a live entry as of `now` (used by tests to move time forward)
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl, now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        // The read guard is gone by now, removing cannot deadlock the shard.
        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.is_expired(self.ttl, now));
        }
        None
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key, value, Instant::now());
    }

    pub fn put_at(&self, key: impl Into<String>, value: V, stored_at: Instant) {
        self.entries.insert(key.into(), CacheEntry { value, stored_at });
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every entry older than the TTL, returns how many were removed
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(self.ttl, now));
        before.saturating_sub(self.entries.len())
    }

    /// Physical entry count, including expired entries not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
