//! Parse memo.
//!
//! [`RouteCache`] remembers what [`RouteParser`](crate::parser::RouteParser)
//! returned for a reference, including "could not parse". Parsing is pure,
//! so a hit is always valid for the parser configuration it was recorded
//! under; the parser clears the cache whenever that configuration changes.
//!
//! Gated behind the `cache` feature, backed by the [`lru`] crate.
//!
//! # Examples
//!
//! ```
//! use canvas_navigator::cache::{CacheKey, RouteCache};
//!
//! let mut cache = RouteCache::new();
//! let key = CacheKey::new("/courses/x", None);
//! cache.insert(key.clone(), None);
//!
//! assert_eq!(cache.get(&key), Some(None));
//! assert_eq!(cache.stats().hits, 1);
//! ```

use crate::route::{ContextRef, RouteDescriptor};
use crate::{debug_log, trace_log};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Memo key: the raw reference plus the context it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    reference: String,
    known_context: Option<ContextRef>,
}

impl CacheKey {
    pub fn new(reference: impl Into<String>, known_context: Option<ContextRef>) -> Self {
        Self {
            reference: reference.into(),
            known_context,
        }
    }
}

/// Counters tracking memo effectiveness.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Number of full invalidations (via [`RouteCache::clear`]).
    pub invalidations: usize,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`; `0.0` before any lookup.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU memo of parse results.
#[derive(Debug)]
pub struct RouteCache {
    entries: LruCache<CacheKey, Option<RouteDescriptor>>,
    stats: CacheStats,
}

impl RouteCache {
    /// Default number of memoised references.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a cache holding up to `capacity` references; zero is treated
    /// as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    /// Look up a memoised result. The outer `Option` is the hit/miss, the
    /// inner one the parse result.
    pub fn get(&mut self, key: &CacheKey) -> Option<Option<RouteDescriptor>> {
        if let Some(entry) = self.entries.get(key) {
            self.stats.hits += 1;
            trace_log!("Parse memo hit for '{}'", key.reference);
            Some(entry.clone())
        } else {
            self.stats.misses += 1;
            trace_log!("Parse memo miss for '{}'", key.reference);
            None
        }
    }

    /// Record a parse result.
    pub fn insert(&mut self, key: CacheKey, result: Option<RouteDescriptor>) {
        self.entries.push(key, result);
    }

    /// Drop every entry and count an invalidation.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.invalidations += 1;
        debug_log!(
            "Parse memo cleared: {} entries removed ({} invalidations, hit rate {:.1}%)",
            removed,
            self.stats.invalidations,
            self.stats.hit_rate() * 100.0
        );
    }

    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of memoised references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RouteCache {
    fn clone(&self) -> Self {
        let mut entries = LruCache::new(self.entries.cap());
        for (key, value) in self.entries.iter().rev() {
            entries.push(key.clone(), value.clone());
        }
        Self {
            entries,
            stats: self.stats.clone(),
        }
    }
}
