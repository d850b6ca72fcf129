//! Bounded LRU store with lazy TTL expiration and optional statistics.
//!
//! The recency list comes from the `lru` crate; this wrapper adds per-entry
//! expiry, hit/miss/eviction/expiration counters, and the ordered iteration
//! the resource cache relies on. Expired entries are reaped lazily: an
//! expired key found during `get`/`contains`/iteration is removed at that
//! moment, never by a background task.
//!
//! Every operation is O(1) amortized except `keys`/`values`/`len`, which walk
//! the live entries. Access order: `get` and `set` promote the touched key to
//! most-recent; `contains` deliberately does not.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Counters collected when the store is built `with_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LruStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Bounded key-value store with LRU eviction and per-entry TTL.
pub struct LruStore<K: Hash + Eq + Clone, V> {
    inner: LruCache<K, Entry<V>>,
    default_ttl: Option<Duration>,
    stats: Option<LruStats>,
}

impl<K: Hash + Eq + Clone, V> LruStore<K, V> {
    /// Create a store holding at most `max_items` entries.
    pub fn new(max_items: NonZeroUsize) -> Self {
        Self {
            inner: LruCache::new(max_items),
            default_ttl: None,
            stats: None,
        }
    }

    /// Apply this TTL to entries stored without an explicit one.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Enable hit/miss/eviction/expiration counting.
    pub fn with_stats(mut self) -> Self {
        self.stats = Some(LruStats::default());
        self
    }

    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    fn bump(stats: &mut Option<LruStats>, f: impl FnOnce(&mut LruStats)) {
        if let Some(stats) = stats.as_mut() {
            f(stats);
        }
    }

    /// Remove `key` if it has expired; returns true when a removal happened.
    fn reap_if_expired(&mut self, key: &K, now: Instant) -> bool {
        let expired = self
            .inner
            .peek(key)
            .is_some_and(|entry| entry.is_expired(now));
        if expired {
            self.inner.pop(key);
            Self::bump(&mut self.stats, |s| s.expirations += 1);
        }
        expired
    }

    /// Look up `key`, promoting it to most-recent on a hit. Expired entries
    /// are removed and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = Instant::now();
        if self.reap_if_expired(key, now) || !self.inner.contains(key) {
            Self::bump(&mut self.stats, |s| s.misses += 1);
            return None;
        }
        Self::bump(&mut self.stats, |s| s.hits += 1);
        self.inner.get(key).map(|entry| &entry.value)
    }

    /// Insert or replace `key`. A replaced key is promoted and given the new
    /// value and TTL; inserting over capacity evicts exactly one
    /// least-recently-used entry.
    pub fn set(&mut self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = ttl
            .or(self.default_ttl)
            .map(|ttl| Instant::now() + ttl);
        let entry = Entry { value, expires_at };
        if let Some((evicted_key, _)) = self.inner.push(key.clone(), entry) {
            if evicted_key != key {
                Self::bump(&mut self.stats, |s| s.evictions += 1);
            }
        }
    }

    /// Expiry-aware membership test that does not disturb recency order.
    pub fn contains(&mut self, key: &K) -> bool {
        let now = Instant::now();
        if self.reap_if_expired(key, now) {
            return false;
        }
        self.inner.contains(key)
    }

    /// Remove `key`, returning its live value if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let now = Instant::now();
        if self.reap_if_expired(key, now) {
            return None;
        }
        self.inner.pop(key).map(|entry| entry.value)
    }

    /// Drop every entry and reset statistics.
    pub fn clear(&mut self) {
        self.inner.clear();
        if let Some(stats) = self.stats.as_mut() {
            *stats = LruStats::default();
        }
    }

    fn reap_all_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<K> = self
            .inner
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.inner.pop(&key);
            Self::bump(&mut self.stats, |s| s.expirations += 1);
        }
    }

    /// Live keys, least-recent first.
    pub fn keys(&mut self) -> Vec<K> {
        self.reap_all_expired();
        self.inner.iter().rev().map(|(key, _)| key.clone()).collect()
    }

    /// Live values, least-recent first.
    pub fn values(&mut self) -> Vec<&V> {
        self.reap_all_expired();
        self.inner
            .iter()
            .rev()
            .map(|(_, entry)| &entry.value)
            .collect()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&mut self) -> usize {
        self.reap_all_expired();
        self.inner.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Current statistics, if collection was enabled.
    pub fn stats(&self) -> Option<LruStats> {
        self.stats
    }
}

impl<K: Hash + Eq + Clone, V> std::fmt::Debug for LruStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruStore")
            .field("capacity", &self.capacity())
            .field("entries", &self.inner.len())
            .field("stats", &self.stats)
            .finish()
    }
}
