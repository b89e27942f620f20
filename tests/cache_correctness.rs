//! End-to-end correctness checks for [`BoundedCache`] covering eviction,
//! TTL expiry, and delegate-mediated refresh/veto behavior.

use perfprims_rs::cache::delegate::CacheDelegate;
use perfprims_rs::cache::BoundedCache;
use perfprims_rs::config::BoundedCacheConfig;
use perfprims_rs::Ticker;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn cache<V: PartialEq>(max_objects: usize, ticker: Arc<Ticker>) -> BoundedCache<&'static str, V> {
    let config = BoundedCacheConfig {
        max_objects,
        ..Default::default()
    };
    BoundedCache::new(config, ticker)
}

#[test]
fn lru_eviction_picks_the_least_recently_touched_entry() {
    let mut c = cache::<i32>(3, Arc::new(Ticker::new()));
    c.put("a", 1);
    c.put("b", 2);
    c.put("c", 3);
    c.get(&"a"); // a -> MRU, b now least recent
    c.put("d", 4); // evicts b
    assert_eq!(c.get(&"b"), None);
    assert_eq!(c.get(&"a"), Some(&1));
    assert_eq!(c.get(&"c"), Some(&3));
    assert_eq!(c.get(&"d"), Some(&4));
}

#[test]
fn ttl_expiry_removes_entries_past_their_lifetime() {
    let ticker = Arc::new(Ticker::new());
    let config = BoundedCacheConfig {
        max_objects: 8,
        lifetime_seconds: 10,
        ..Default::default()
    };
    let mut c: BoundedCache<&str, &str> = BoundedCache::new(config, Arc::clone(&ticker));
    c.put("session", "token");
    assert_eq!(c.get(&"session"), Some(&"token"));
    for _ in 0..11 {
        ticker.tick();
    }
    assert_eq!(c.get(&"session"), None);
    assert_eq!(c.metrics().expirations, 1);
}

struct RefreshCounter {
    refreshes: Arc<AtomicUsize>,
}

impl CacheDelegate<&'static str, i32> for RefreshCounter {
    fn may_refresh(&self, _value: &i32, _key: &&'static str, _lifetime: u64, _remaining: u64) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn delegate_is_advised_once_past_the_halfway_point() {
    let ticker = Arc::new(Ticker::new());
    let config = BoundedCacheConfig {
        max_objects: 8,
        lifetime_seconds: 10,
        ..Default::default()
    };
    let refreshes = Arc::new(AtomicUsize::new(0));
    let mut c: BoundedCache<&str, i32> = BoundedCache::new(config, Arc::clone(&ticker));
    c.set_delegate(Arc::new(RefreshCounter {
        refreshes: Arc::clone(&refreshes),
    }));
    c.put("k", 1);
    for _ in 0..6 {
        ticker.tick();
    }
    c.get(&"k");
    c.get(&"k");
    c.get(&"k");
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

struct AlwaysKeep;

impl CacheDelegate<&'static str, i32> for AlwaysKeep {
    fn should_keep(&self, _value: &i32, _key: &&'static str, _lifetime: u64, _expired_ago: u64) -> bool {
        true
    }
}

#[test]
fn delegate_can_veto_expiry_and_reset_the_lifetime() {
    let ticker = Arc::new(Ticker::new());
    let config = BoundedCacheConfig {
        max_objects: 8,
        lifetime_seconds: 5,
        ..Default::default()
    };
    let mut c: BoundedCache<&str, i32> = BoundedCache::new(config, Arc::clone(&ticker));
    c.set_delegate(Arc::new(AlwaysKeep));
    c.put("k", 1);
    for _ in 0..6 {
        ticker.tick();
    }
    assert_eq!(c.get(&"k"), Some(&1));
    assert_eq!(c.metrics().expirations, 0);
}

#[test]
fn byte_budget_evicts_independently_of_entry_count() {
    let ticker = Arc::new(Ticker::new());
    let config = BoundedCacheConfig {
        max_objects: 100,
        max_bytes: 10,
        ..Default::default()
    };
    let mut c: BoundedCache<&str, Vec<u8>> = BoundedCache::new(config, ticker);
    c.set_size_fn(Box::new(|v, _excl| v.len()));
    c.put("a", vec![0u8; 6]);
    c.put("b", vec![0u8; 6]); // pushes current_bytes to 12 > 10, evicts "a"
    assert_eq!(c.get(&"a"), None);
    assert_eq!(c.get(&"b"), Some(&vec![0u8; 6]));
}
