//! Result caching
//!
//! The engine and each desensitizer memoize masked output behind the
//! [`ResultCache`] capability. Keys come from [`CacheKeyCodec`], which keeps
//! short inputs readable and hashes long ones.
//!
//! ```text
//! (namespace, text) ──► CacheKeyCodec ──► key ──► ResultCache (LRU)
//!                                                   │
//!                                     evicted ◄─────┘ zeroized
//! ```

pub mod key;
pub mod lru;

pub use self::key::{fnv1a64, CacheKeyCodec, INLINE_KEY_LIMIT, MAX_CONTEXT_MEMO};
pub use self::lru::LruResultCache;

use serde::{Deserialize, Serialize};

/// Default number of cached results.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Injected cache capability.
///
/// Any bounded, approximately recency-evicting container satisfying this
/// shape may back the engine.
pub trait ResultCache: Send + Sync {
    /// Look up a cached value.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value, possibly evicting an older one.
    fn put(&self, key: String, value: String);

    /// Drop every entry.
    fn clear(&self);

    /// Current number of entries.
    fn len(&self) -> usize;

    /// Maximum number of entries.
    fn capacity(&self) -> usize;

    /// Whether the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn put(&self, _key: String, _value: String) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }

    fn capacity(&self) -> usize {
        0
    }
}

/// Hit/miss counters plus occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups served from cache (0.0 when unused).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_cache() {
        let cache = NoopCache;
        cache.put("k".into(), "v".into());
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            size: 2,
            capacity: 10,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
