//! Session scoped cache of complete bulk results.
//!
//! Entries are keyed by the canonical serialization of a
//! [`RequestDescriptor`], so filter order does not matter. By default the
//! cache is unbounded and lives as long as its owner; [`ResultCache::bounded`]
//! turns it into an LRU for long running sessions.

use std::{fmt, num::NonZeroUsize};

use lru::LruCache;

use crate::types::{Record, RequestDescriptor};

/// Cache key derived from a [`RequestDescriptor`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `descriptor`.
    pub fn of(descriptor: &RequestDescriptor) -> Self {
        Self(descriptor.canonical_json())
    }

    /// Serialized form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory map from request descriptor to the full row set it produced.
///
/// Only complete results should be inserted; the client loader never stores
/// a failed or cancelled load.
pub struct ResultCache {
    entries: LruCache<CacheKey, Vec<Record>>,
}

impl ResultCache {
    /// Unbounded cache, cleared only through [`ResultCache::clear`].
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
        }
    }

    /// Cache holding at most `capacity` result sets, evicting the least
    /// recently used one.
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Rows stored for `descriptor`, if any.
    pub fn get(&mut self, descriptor: &RequestDescriptor) -> Option<&[Record]> {
        self.entries
            .get(&CacheKey::of(descriptor))
            .map(Vec::as_slice)
    }

    /// Whether `descriptor` has an entry, without touching recency.
    pub fn contains(&self, descriptor: &RequestDescriptor) -> bool {
        self.entries.contains(&CacheKey::of(descriptor))
    }

    /// Store `rows` for `descriptor`, replacing any previous entry.
    pub fn put(&mut self, descriptor: &RequestDescriptor, rows: Vec<Record>) {
        let key = CacheKey::of(descriptor);
        tracing::debug!(%key, rows = rows.len(), "caching bulk result");
        if let Some((evicted, _)) = self.entries.push(key.clone(), rows) {
            if evicted != key {
                tracing::debug!(key = %evicted, "evicted cached bulk result");
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        tracing::info!("result cache cleared");
    }

    /// Number of cached result sets.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
