//! Resolution result cache
//!
//! Caches resolved IPv4 addresses keyed by `(server spec, domain)`. Entries
//! are written once and never expire: a hostname resolved for one
//! subscription document stays available for every later document in the
//! same process. The map is concurrency-safe so concurrent substitution
//! operations may race on the same key; the loser simply overwrites with an
//! identical value.
//!
//! # Example
//!
//! ```
//! use subrelay::dns::ResolveCache;
//!
//! let cache = ResolveCache::new();
//! cache.insert("udp://8.8.8.8:53", "example.com", vec!["93.184.216.34".into()]);
//!
//! let hit = cache.get("udp://8.8.8.8:53", "example.com").unwrap();
//! assert_eq!(hit, vec!["93.184.216.34".to_string()]);
//! assert_eq!(cache.stats().hits(), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Cache statistics with atomic counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl CacheStats {
    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an insertion
    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get hit count
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get miss count
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get insert count
    #[must_use]
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }
}

/// Process-wide cache of resolved IPv4 addresses
///
/// Constructed once at startup and handed to the resolver by reference;
/// there is no global instance. Keys pair the normalized server spec string
/// with the queried domain, so the same domain resolved through different
/// servers occupies distinct entries.
#[derive(Debug, Default)]
pub struct ResolveCache {
    entries: DashMap<(String, String), Vec<String>>,
    stats: CacheStats,
}

impl ResolveCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the addresses cached for `(server, domain)`
    ///
    /// A hit returns a clone of the stored list in its original order.
    #[must_use]
    pub fn get(&self, server: &str, domain: &str) -> Option<Vec<String>> {
        let key = (server.to_string(), domain.to_string());
        match self.entries.get(&key) {
            Some(addrs) => {
                self.stats.record_hit();
                Some(addrs.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Store the addresses resolved for `(server, domain)`
    pub fn insert(&self, server: &str, domain: &str, addrs: Vec<String>) {
        self.stats.record_insert();
        self.entries
            .insert((server.to_string(), domain.to_string()), addrs);
    }

    /// Number of cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Access the cache statistics
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
