//! crates/teeforge_core/src/cache.rs
//!
//! The single TTL cache abstraction behind every caching site in the
//! service (gateway proxy, catalog, shop products). A plain in-memory
//! expiring map: not shared across processes, not persisted, cleared by
//! restart.
//!
//! Time is passed in explicitly by the `*_at` methods so expiry behavior
//! is testable without sleeping; the plain methods use `Instant::now()`.

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Hit/miss/occupancy counters, reported by the cache-stats endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// A string-keyed expiring map with explicit get/insert/remove/clear.
///
/// Expired entries are counted as misses but are only evicted by
/// [`TtlCache::purge_expired`] (or overwrite), so callers that degrade to
/// stale data on upstream rate limits can still reach them through
/// [`TtlCache::get_stale`].
pub struct TtlCache<V> {
    entries: HashMap<String, Entry<V>>,
    hits: u64,
    misses: u64,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert_at(key, value, ttl, Instant::now());
    }

    pub fn insert_at(&mut self, key: impl Into<String>, value: V, ttl: Duration, now: Instant) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Returns the live value for `key`, counting a hit or miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Returns the value for `key` even if expired. Does not touch the
    /// hit/miss counters; used only for stale-on-rate-limit fallback.
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn purge_expired(&mut self) {
        self.purge_expired_at(Instant::now());
    }

    pub fn purge_expired_at(&mut self, now: Instant) {
        self.entries.retain(|_, e| now < e.expires_at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_live_just_before_ttl_and_dead_just_after() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        cache.insert_at("GET:/catalog/blueprints.json", "body", Duration::from_secs(3600), t0);

        // t = 3599s: hit.
        let hit = cache.get_at("GET:/catalog/blueprints.json", t0 + Duration::from_secs(3599));
        assert_eq!(hit, Some("body"));

        // t = 3601s: miss, triggering a re-fetch in the caller.
        let miss = cache.get_at("GET:/catalog/blueprints.json", t0 + Duration::from_secs(3601));
        assert_eq!(miss, None);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn expired_entries_stay_reachable_as_stale_until_purged() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        cache.insert_at("k", 42, Duration::from_secs(1), t0);

        let later = t0 + Duration::from_secs(10);
        assert_eq!(cache.get_at("k", later), None);
        assert_eq!(cache.get_stale("k"), Some(42));

        cache.purge_expired_at(later);
        assert_eq!(cache.get_stale("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = TtlCache::new();
        cache.insert("a", 1, Duration::from_secs(60));
        cache.insert("b", 2, Duration::from_secs(60));
        assert_eq!(cache.remove("a"), Some(1));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_replaces_value_and_expiry() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        cache.insert_at("k", 1, Duration::from_secs(1), t0);
        cache.insert_at("k", 2, Duration::from_secs(600), t0 + Duration::from_secs(5));
        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(300)), Some(2));
    }
}
