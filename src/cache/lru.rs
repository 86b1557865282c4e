//! Bounded LRU result cache with secure erasure
//!
//! Keys of short inputs embed the raw text, and values are masked output of
//! sensitive input, so both are zeroized when an entry is evicted, replaced
//! or cleared.

use super::{ResultCache, DEFAULT_CACHE_CAPACITY};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One cached result.
#[derive(Zeroize, ZeroizeOnDrop)]
struct CacheEntry {
    value: String,
    #[zeroize(skip)]
    hits: u64,
}

/// LRU-backed [`ResultCache`].
pub struct LruResultCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    capacity: usize,
}

impl LruResultCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
            capacity: cap.get(),
        }
    }

    /// Number of times `key` was served, if present. Does not promote.
    pub fn hit_count(&self, key: &str) -> Option<u64> {
        self.inner.lock().peek(key).map(|e| e.hits)
    }
}

impl Default for LruResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for LruResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruResultCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl ResultCache for LruResultCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock();
        let entry = inner.get_mut(key)?;
        entry.hits += 1;
        Some(entry.value.clone())
    }

    fn put(&self, key: String, value: String) {
        let mut inner = self.inner.lock();
        // push returns either the replaced entry for this key or the evicted LRU one
        if let Some((mut old_key, _old_entry)) = inner.push(key, CacheEntry { value, hits: 0 }) {
            old_key.zeroize();
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        while let Some((mut key, _entry)) = inner.pop_lru() {
            key.zeroize();
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
