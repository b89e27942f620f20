//! Single-lock, multi-thread-shared wrapper around [`BoundedCache`].
//!
//! The teacher's concurrent caches shard the key space across many
//! `parking_lot::Mutex`-guarded segments for near-linear scaling. The
//! design here asks for something narrower: "a single read/write lock
//! wrapping all map and LRU mutations," with delegate callbacks firing
//! outside the lock. `SharedBoundedCache` follows that letter rather than
//! reusing the segmented pattern — one [`parking_lot::Mutex`] around one
//! [`BoundedCache`], not sixteen segments around sixteen.
//!
//! The delegate itself is held in its own, separately-locked slot rather
//! than inside the wrapped [`BoundedCache`]: `get` takes the cache lock
//! only long enough to learn whether a delegate decision is needed (via
//! [`BoundedCache::get_or_decide`]), drops it, clones the delegate handle
//! out of its own short-lived lock, invokes the delegate with no lock of
//! this cache held, and then reacquires the cache lock to apply the
//! verdict via [`BoundedCache::resolve_expiry`] — which re-validates the
//! entry rather than trusting a verdict that may now be stale.

extern crate alloc;

use super::{BoundedCache, BoundedCacheMetrics, CacheDelegate, CacheDescription, GetOutcome, SizeFn};
use crate::config::BoundedCacheConfig;
use crate::ticker::Ticker;
use alloc::sync::Arc;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use parking_lot::Mutex;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;

/// A [`BoundedCache`] behind one mutex, safe to share across threads via
/// `Arc<SharedBoundedCache<K, V>>`.
pub struct SharedBoundedCache<K, V, S = DefaultHashBuilder> {
    inner: Mutex<BoundedCache<K, V, S>>,
    delegate: Mutex<Option<Arc<dyn CacheDelegate<K, V>>>>,
}

impl<K: Hash + Eq, V, S: BuildHasher + Default> SharedBoundedCache<K, V, S> {
    /// Creates a shared cache from a configuration and a shared tick source.
    pub fn new(config: BoundedCacheConfig, ticker: Arc<Ticker>) -> Self {
        SharedBoundedCache {
            inner: Mutex::new(BoundedCache::new(config, ticker)),
            delegate: Mutex::new(None),
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> SharedBoundedCache<K, V, S> {
    /// Attaches (or replaces) the optional expiry delegate. Stored in its
    /// own lock, separate from the wrapped cache's, so `get` can clone it
    /// out without holding the cache lock.
    pub fn set_delegate(&self, delegate: Arc<dyn CacheDelegate<K, V>>) {
        *self.delegate.lock() = Some(delegate);
    }

    /// Detaches any expiry delegate.
    pub fn clear_delegate(&self) {
        *self.delegate.lock() = None;
    }

    /// Attaches (or replaces) the byte-footprint capability.
    pub fn set_size_fn(&self, size_fn: SizeFn<V>) {
        self.inner.lock().set_size_fn(size_fn);
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Current sum of `size_bytes` across all entries.
    pub fn current_bytes(&self) -> u64 {
        self.inner.lock().current_bytes()
    }

    /// A snapshot copy of this cache's counters (cloned out from behind
    /// the lock since the guard cannot outlive this call).
    pub fn metrics(&self) -> BoundedCacheMetrics {
        self.inner.lock().metrics().clone()
    }

    /// A point-in-time description of this cache's configuration and
    /// occupancy.
    pub fn description(&self) -> CacheDescription {
        self.inner.lock().description()
    }

    /// Sets the entry-count budget, shrinking immediately if needed.
    pub fn set_max_objects(&self, max_objects: usize)
    where
        K: Clone,
    {
        self.inner.lock().set_max_objects(max_objects);
    }

    /// Sets the byte-total budget, shrinking immediately if needed.
    pub fn set_max_bytes(&self, max_bytes: u64)
    where
        K: Clone,
    {
        self.inner.lock().set_max_bytes(max_bytes);
    }

    /// Sets the default entry lifetime.
    pub fn set_lifetime(&self, lifetime_seconds: u64) {
        self.inner.lock().set_lifetime(lifetime_seconds);
    }

    /// Sets the cache's name.
    pub fn set_name(&self, name: impl Into<alloc::string::String>) {
        self.inner.lock().set_name(name);
    }
}

impl<K: Hash + Eq + Clone, V: Clone, S: BuildHasher> SharedBoundedCache<K, V, S> {
    /// Looks up `key`, returning a cloned value (the lock cannot be held
    /// past the call, so there is no borrowed-reference form).
    ///
    /// Runs any attached delegate's `should_keep`/`may_refresh` hook with
    /// this cache's lock released, re-validating the entry before applying
    /// the verdict (see the module docs).
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.inner.lock().get_or_decide(key) {
            GetOutcome::Hit(value) => Some(value),
            GetOutcome::Miss => None,
            GetOutcome::HasRefreshAdvice {
                key,
                value,
                lifetime_seconds,
                remaining_seconds,
            } => {
                let delegate = self.delegate.lock().clone();
                if let Some(delegate) = delegate {
                    delegate.may_refresh(&value, &key, lifetime_seconds, remaining_seconds);
                }
                Some(value)
            }
            GetOutcome::NeedsExpiryDecision {
                key,
                value,
                lifetime_seconds,
                expired_seconds_ago,
            } => {
                let delegate = self.delegate.lock().clone();
                let keep = delegate
                    .map(|d| d.should_keep(&value, &key, lifetime_seconds, expired_seconds_ago))
                    .unwrap_or(false);
                self.inner.lock().resolve_expiry(&key, keep)
            }
        }
    }

    /// Inserts or overwrites `key` with `value` using the cache's default
    /// lifetime.
    pub fn put(&self, key: K, value: V)
    where
        V: PartialEq,
    {
        self.inner.lock().put(key, value);
    }

    /// As [`put`](Self::put), with an explicit per-entry lifetime.
    pub fn put_with_lifetime(&self, key: K, value: V, lifetime_seconds: u64)
    where
        V: PartialEq,
    {
        self.inner.lock().put_with_lifetime(key, value, lifetime_seconds);
    }

    /// As [`BoundedCache::put_until`].
    pub fn put_until(&self, key: K, value: V, expiry_tick: u64)
    where
        V: PartialEq,
    {
        self.inner.lock().put_until(key, value, expiry_tick);
    }

    /// Removes `key` unconditionally, if present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().remove(key)
    }

    /// As [`BoundedCache::shrink`].
    pub fn shrink(&self, target_objects: usize, target_bytes: u64) {
        self.inner.lock().shrink(target_objects, target_bytes);
    }

    /// As [`BoundedCache::purge`].
    pub fn purge(&self) {
        self.inner.lock().purge();
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl<K: core::fmt::Debug + Hash + Eq, V, S> core::fmt::Debug for SharedBoundedCache<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedBoundedCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc as StdArc;
    extern crate std;
    use std::thread;

    fn shared(max_objects: usize) -> SharedBoundedCache<&'static str, i32> {
        let config = BoundedCacheConfig {
            max_objects,
            ..Default::default()
        };
        SharedBoundedCache::new(config, StdArc::new(Ticker::new()))
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = shared(4);
        cache.put("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
    }

    struct ReentrantDelegate {
        cache: StdArc<SharedBoundedCache<&'static str, i32>>,
    }

    impl CacheDelegate<&'static str, i32> for ReentrantDelegate {
        fn should_keep(&self, _value: &i32, _key: &&'static str, _lifetime: u64, _expired_ago: u64) -> bool {
            // Calling back into the same cache from inside a delegate hook
            // must not deadlock: `get` releases its lock before invoking
            // this hook.
            self.cache.len();
            false
        }
    }

    #[test]
    fn delegate_can_call_back_into_cache_without_deadlocking() {
        let ticker = StdArc::new(Ticker::new());
        let config = BoundedCacheConfig {
            max_objects: 4,
            lifetime_seconds: 1,
            ..Default::default()
        };
        let cache = StdArc::new(SharedBoundedCache::new(config, StdArc::clone(&ticker)));
        cache.set_delegate(StdArc::new(ReentrantDelegate {
            cache: StdArc::clone(&cache),
        }));
        cache.put("a", 1);
        for _ in 0..2 {
            ticker.tick();
        }
        // Would hang forever pre-fix, since `should_keep` used to run with
        // the cache's own mutex still held.
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn shared_across_threads() {
        let cache = StdArc::new(shared(64));
        let handles: alloc::vec::Vec<_> = (0..4)
            .map(|t| {
                let cache = StdArc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..16 {
                        let key: &'static str = alloc::boxed::Box::leak(alloc::format!("k{t}-{i}").into_boxed_str());
                        cache.put(key, i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 64);
    }
}
