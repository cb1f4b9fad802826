//! In-memory content cache with time-based revalidation.
//!
//! [`ContentCache`] maps opaque string keys to [`CacheEntry`] values and is
//! the only owner of the entries it creates. Lookups never block: staleness
//! checks and reloads all happen off the calling path through
//! [`CacheEntry::revalidate`] and [`CacheEntry::await_ready`], so a burst of
//! requests against one stale key costs one reload and N deferred wake-ups.
//!
//! Entries are unbounded by count and never evicted automatically; they go
//! away only through [`ContentCache::remove`] or [`ContentCache::clear`].

pub mod entry;
pub mod source;

pub use entry::{CacheEntry, CacheError, CachedPayload, DEFAULT_TTL};
pub use source::{ByteStream, FileSource, HttpSource, ReloadSource, SourceData};

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Keyed collection of cache entries. Cloning shares the underlying map.
#[derive(Clone)]
pub struct ContentCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl ContentCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the entry for `key`, creating an empty one (default TTL, no
    /// source, no media type) if none exists.
    pub fn get(&self, key: &str) -> CacheEntry {
        self.get_with(key, || CacheEntry::new(key, self.default_ttl, None))
    }

    /// Return the entry for `key`, creating it with `init` if none exists.
    ///
    /// Creation is atomic: under concurrent first access for one key, `init`
    /// runs at most once and every caller gets the same entry, so the
    /// create-and-first-populate sequence cannot fork into two entries.
    pub fn get_with(&self, key: &str, init: impl FnOnce() -> CacheEntry) -> CacheEntry {
        self.entries
            .entry(key.to_string())
            .or_insert_with(init)
            .value()
            .clone()
    }

    /// Look up `key` without creating anything.
    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Register a pre-built entry unconditionally, replacing any existing
    /// entry under the same key. Used to seed generated content that has no
    /// filesystem backing.
    pub fn put(&self, entry: CacheEntry) -> CacheEntry {
        self.entries.insert(entry.key().to_string(), entry.clone());
        entry
    }

    /// Drop one entry. A load already in flight completes against the
    /// detached entry; its result simply no longer lands in the cache.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
