//! Process-wide record cache
//!
//! A best-effort accelerator in front of the record files. The record files
//! stay authoritative; the cache only saves a read + decode.
//!
//! - One cache shared by all channels, keyed by `"{channel}:{id}"`
//! - Bounded: least-recently-used entry is evicted at capacity
//! - Capacity 0 disables caching entirely
//! - Entries hold the full envelope, deleted or not; visibility is decided by
//!   the channel on every hit

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::envelope::Envelope;

/// Default number of cached envelopes.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Composite cache key for a channel record.
pub fn cache_key(channel: &str, id: u64) -> String {
    format!("{}:{}", channel, id)
}

/// Cache statistics (passive only).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted due to capacity.
    pub evictions: u64,
}

#[derive(Debug)]
struct CacheEntry {
    envelope: Envelope,
    tick: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    tick: u64,
    stats: CacheStats,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }
}

/// Bounded LRU cache of decoded envelopes.
#[derive(Debug)]
pub struct RecordCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl RecordCache {
    /// Create a cache holding at most `capacity` envelopes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Create a cache that stores nothing.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    // Poisoning ignored: entries are whole envelopes
    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or refresh the envelope for `(channel, id)`.
    pub fn set(&self, channel: &str, id: u64, envelope: Envelope) {
        if self.capacity == 0 {
            return;
        }

        let key = cache_key(channel, id);
        let mut inner = self.lock();
        inner.remove(&key);

        if inner.entries.len() >= self.capacity {
            if let Some((_, oldest)) = inner.recency.pop_first() {
                inner.entries.remove(&oldest);
                inner.stats.evictions += 1;
            }
        }

        let tick = inner.next_tick();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(key, CacheEntry { envelope, tick });
    }

    /// Look up `(channel, id)`, marking it most recently used.
    pub fn get(&self, channel: &str, id: u64) -> Option<Envelope> {
        let key = cache_key(channel, id);
        let mut inner = self.lock();

        let Some(old_tick) = inner.entries.get(&key).map(|entry| entry.tick) else {
            inner.stats.misses += 1;
            return None;
        };

        let tick = inner.next_tick();
        inner.recency.remove(&old_tick);
        inner.recency.insert(tick, key.clone());
        inner.stats.hits += 1;

        inner.entries.get_mut(&key).map(|entry| {
            entry.tick = tick;
            entry.envelope.clone()
        })
    }

    /// Whether `(channel, id)` is cached. Does not touch recency or stats.
    pub fn contains(&self, channel: &str, id: u64) -> bool {
        self.lock().entries.contains_key(&cache_key(channel, id))
    }

    /// Drop the entry for `(channel, id)`.
    pub fn invalidate(&self, channel: &str, id: u64) {
        self.lock().remove(&cache_key(channel, id));
    }

    /// Drop every entry belonging to `channel`.
    pub fn invalidate_channel(&self, channel: &str) -> usize {
        let prefix = format!("{}:", channel);
        let mut inner = self.lock();
        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in &keys {
            inner.remove(key);
        }
        keys.len()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
