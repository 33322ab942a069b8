use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Key → (value, inserted-at) with a fixed time-to-live and a size bound.
///
/// Expiry is checked on read; stale entries are evicted lazily when touched
/// or by `purge_expired`. At capacity the least recently used key goes.
pub struct TtlCache<K: Hash + Eq, V> {
    entries: LruCache<K, (V, Instant)>,
    ttl: Duration,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Lookup as of `now`. An entry is live while `now - inserted < ttl`.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.peek(key) {
            None => return None,
            Some((_, inserted)) => now.saturating_duration_since(*inserted) >= self.ttl,
        };

        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|(v, _)| v.clone())
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.entries.put(key, (value, now));
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, (_, inserted))| now.saturating_duration_since(*inserted) >= self.ttl)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
