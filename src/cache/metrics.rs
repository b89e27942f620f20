//! Cache observability surface.
//!
//! Mirrors the BTreeMap-based reporting convention used elsewhere in the
//! ambient metrics surface: deterministic key ordering makes snapshots
//! diffable across runs and stable under serialization.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Running counters for a single [`BoundedCache`](crate::cache::BoundedCache)
/// or [`SharedBoundedCache`](crate::cache::shared::SharedBoundedCache).
#[derive(Debug, Default, Clone)]
pub struct BoundedCacheMetrics {
    /// Total `get` calls.
    pub requests: u64,
    /// `get` calls that found a live, non-expired entry.
    pub hits: u64,
    /// `get` calls that found nothing, or found an expired entry the
    /// delegate declined to keep.
    pub misses: u64,
    /// Entries removed by LRU-tail eviction to satisfy a budget.
    pub evictions: u64,
    /// Entries removed because they were found expired on `get` or during
    /// `purge`/`shrink`.
    pub expirations: u64,
}

impl BoundedCacheMetrics {
    /// Records a successful lookup.
    pub fn record_hit(&mut self) {
        self.requests += 1;
        self.hits += 1;
    }

    /// Records a failed lookup (absent key, or expired entry not kept).
    pub fn record_miss(&mut self) {
        self.requests += 1;
        self.misses += 1;
    }

    /// Records an LRU-tail eviction.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Records an expiry-driven removal.
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    /// Fraction of requests that hit, or `0.0` with no requests yet.
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }

    /// Snapshot as an ordered map, suitable for logging or export.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        out.insert("evictions".to_string(), self.evictions as f64);
        out.insert("expirations".to_string(), self.expirations as f64);
        out.insert("hit_rate".to_string(), self.hit_rate());
        out.insert("hits".to_string(), self.hits as f64);
        out.insert("misses".to_string(), self.misses as f64);
        out.insert("requests".to_string(), self.requests as f64);
        out
    }
}

/// Point-in-time snapshot returned by
/// [`BoundedCache::description`](crate::cache::BoundedCache::description),
/// the reimplementation's counterpart to the source's process-wide
/// "list live caches" registry entry for a single cache.
#[derive(Debug, Clone)]
pub struct CacheDescription {
    /// The cache's configured name, if any.
    pub name: Option<String>,
    /// Current number of entries.
    pub count: usize,
    /// Configured maximum entry count (0 means unbounded).
    pub max_objects: usize,
    /// Current total of `size_bytes` across all entries.
    pub current_bytes: u64,
    /// Configured maximum byte total (0 means unbounded).
    pub max_bytes: u64,
    /// Configured default lifetime in seconds (0 means never-expires).
    pub lifetime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_zero_with_no_requests() {
        let m = BoundedCacheMetrics::default();
        assert_eq!(m.hit_rate(), 0.0);
    }

    #[test]
    fn counters_accumulate() {
        let mut m = BoundedCacheMetrics::default();
        m.record_hit();
        m.record_hit();
        m.record_miss();
        m.record_eviction();
        m.record_expiration();
        assert_eq!(m.requests, 3);
        assert_eq!(m.hits, 2);
        assert_eq!(m.misses, 1);
        assert_eq!(m.evictions, 1);
        assert_eq!(m.expirations, 1);
        assert!((m.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
