//! Bounded, TTL-aware LRU cache.
//!
//! [`BoundedCache`] pairs a [`HashMap`] (key lookup) with an intrusive
//! [`LinkList`](crate::list::LinkList) (recency order), the same structure
//! the teacher's LRU segment used, generalized with per-entry lifetimes,
//! a byte budget, and an optional [`CacheDelegate`] that can veto expiry
//! or advise a caller that a refresh is due.
//!
//! [`BoundedCache`] itself does no locking; [`shared::SharedBoundedCache`]
//! wraps one in a single read/write lock for direct multi-thread sharing.

extern crate alloc;

pub mod delegate;
pub mod entry;
pub mod metrics;
#[cfg(feature = "concurrent")]
pub mod shared;
pub mod size;

pub use delegate::CacheDelegate;
pub use entry::CacheEntry;
pub use metrics::{BoundedCacheMetrics, CacheDescription};
#[cfg(feature = "concurrent")]
pub use shared::SharedBoundedCache;
pub use size::ExcludeSet;

use crate::config::BoundedCacheConfig;
use crate::list::{Link, LinkList};
use crate::ticker::Ticker;
use alloc::boxed::Box;
use alloc::sync::Arc;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Byte-footprint capability: given a value and a set of already-counted
/// sub-object addresses, reports the portion of the value's size not
/// already counted. Attached per-cache via [`BoundedCache::set_size_fn`];
/// skipped entirely when `max_bytes == 0`.
pub type SizeFn<V> = Box<dyn Fn(&V, &mut ExcludeSet) -> usize + Send + Sync>;

/// Outcome of [`BoundedCache::get_or_decide`], a delegate-free lookup used
/// to run delegate callbacks outside a wrapping lock (see
/// [`SharedBoundedCache`]'s `get`).
#[derive(Debug, Clone)]
pub enum GetOutcome<K, V> {
    /// Present, non-expired, no refresh advice due. Already promoted to MRU.
    Hit(V),
    /// Absent.
    Miss,
    /// Present but expired; the caller must consult a delegate's
    /// `should_keep` and report the verdict via
    /// [`BoundedCache::resolve_expiry`].
    NeedsExpiryDecision {
        /// The entry's key, for the delegate call.
        key: K,
        /// The entry's value, for the delegate call.
        value: V,
        /// The entry's configured lifetime in seconds.
        lifetime_seconds: u64,
        /// How many seconds ago the entry expired.
        expired_seconds_ago: u64,
    },
    /// Present, non-expired, and due for the advisory `may_refresh` hook.
    /// Already promoted to MRU; the returned value is final regardless of
    /// what the delegate does with this hook.
    HasRefreshAdvice {
        /// The entry's key, for the delegate call.
        key: K,
        /// The entry's value, both for the delegate call and to return.
        value: V,
        /// The entry's configured lifetime in seconds.
        lifetime_seconds: u64,
        /// Seconds remaining before expiry.
        remaining_seconds: u64,
    },
}

/// A mapping from keys to values with independent entry-count and
/// byte-total budgets and an optional default lifetime.
///
/// Not internally synchronized: callers on more than one thread must wrap
/// it themselves, or use [`SharedBoundedCache`] instead.
pub struct BoundedCache<K, V, S = DefaultHashBuilder> {
    config: BoundedCacheConfig,
    list: LinkList<CacheEntry<K, V>>,
    map: HashMap<K, *mut Link<CacheEntry<K, V>>, S>,
    ticker: Arc<Ticker>,
    metrics: BoundedCacheMetrics,
    current_bytes: u64,
    delegate: Option<Arc<dyn CacheDelegate<K, V>>>,
    size_fn: Option<SizeFn<V>>,
}

// SAFETY: all raw pointers in `map` point exclusively at nodes owned by
// `list`; mutation always goes through `&mut self`.
unsafe impl<K: Send, V: Send, S: Send> Send for BoundedCache<K, V, S> {}

impl<K: Hash + Eq, V, S: BuildHasher + Default> BoundedCache<K, V, S> {
    /// Creates a cache from a configuration and a shared tick source.
    pub fn new(config: BoundedCacheConfig, ticker: Arc<Ticker>) -> Self {
        let list_cap = NonZeroUsize::new(config.max_objects.max(1)).unwrap_or(NonZeroUsize::new(1).unwrap());
        let map_capacity = config.max_objects.max(1).next_power_of_two();
        #[cfg(feature = "std")]
        if let Some(name) = &config.name {
            crate::registry::register_cache(name);
        }
        BoundedCache {
            config,
            list: LinkList::new(list_cap),
            map: HashMap::with_capacity_and_hasher(map_capacity, S::default()),
            ticker,
            metrics: BoundedCacheMetrics::default(),
            current_bytes: 0,
            delegate: None,
            size_fn: None,
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> BoundedCache<K, V, S> {
    /// Attaches (or replaces) the optional expiry delegate.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CacheDelegate<K, V>>) {
        self.delegate = Some(delegate);
    }

    /// Detaches any expiry delegate.
    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    /// Attaches (or replaces) the byte-footprint capability used when
    /// `max_bytes > 0`.
    pub fn set_size_fn(&mut self, size_fn: SizeFn<V>) {
        self.size_fn = Some(size_fn);
    }

    /// Current number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Current sum of `size_bytes` across all entries.
    #[inline]
    pub fn current_bytes(&self) -> u64 {
        self.current_bytes
    }

    /// A read-only snapshot of this cache's counters.
    pub fn metrics(&self) -> &BoundedCacheMetrics {
        &self.metrics
    }

    /// A point-in-time description of this cache's configuration and
    /// occupancy, the reimplementation's counterpart to the source's
    /// process-wide cache registry entry.
    pub fn description(&self) -> CacheDescription {
        CacheDescription {
            name: self.config.name.clone(),
            count: self.map.len(),
            max_objects: self.config.max_objects,
            current_bytes: self.current_bytes,
            max_bytes: self.config.max_bytes,
            lifetime_seconds: self.config.lifetime_seconds,
        }
    }

    /// Sets the entry-count budget, shrinking immediately if the new
    /// value is lower than the current entry count.
    pub fn set_max_objects(&mut self, max_objects: usize)
    where
        K: Clone,
    {
        self.config.max_objects = max_objects;
        if self.map.len() > max_objects {
            self.shrink(max_objects, self.config.max_bytes);
        }
    }

    /// Sets the byte-total budget, shrinking immediately if the new value
    /// is lower than the current byte total.
    pub fn set_max_bytes(&mut self, max_bytes: u64)
    where
        K: Clone,
    {
        self.config.max_bytes = max_bytes;
        if self.current_bytes > max_bytes {
            self.shrink(self.config.max_objects, max_bytes);
        }
    }

    /// Sets the default entry lifetime. Does not retroactively change
    /// already-inserted entries.
    pub fn set_lifetime(&mut self, lifetime_seconds: u64) {
        self.config.lifetime_seconds = lifetime_seconds;
    }

    /// Sets the cache's name, surfaced via [`description`](Self::description)
    /// and the process-global registry.
    pub fn set_name(&mut self, name: impl Into<alloc::string::String>) {
        let name = name.into();
        #[cfg(feature = "std")]
        {
            if let Some(old) = &self.config.name {
                crate::registry::unregister_cache(old);
            }
            crate::registry::register_cache(&name);
        }
        self.config.name = Some(name);
    }
}

#[cfg(feature = "std")]
impl<K, V, S> Drop for BoundedCache<K, V, S> {
    fn drop(&mut self) {
        if let Some(name) = &self.config.name {
            crate::registry::unregister_cache(name);
        }
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> BoundedCache<K, V, S> {
    fn now(&self) -> u64 {
        self.ticker.now()
    }

    fn object_size(&self, value: &V) -> u64 {
        if self.config.max_bytes == 0 {
            return 0;
        }
        match &self.size_fn {
            Some(size_fn) => {
                let mut exclude = ExcludeSet::new();
                size_fn(value, &mut exclude) as u64
            }
            None => 0,
        }
    }

    /// Looks up `key`. A present, non-expired entry is promoted to MRU and
    /// returned. A present, expired entry is removed and counted as a
    /// miss, unless the delegate's `should_keep` vetoes the removal, in
    /// which case the entry's lifetime is reset and the value returned.
    /// An entry crossing the halfway point of its lifetime additionally
    /// triggers the delegate's advisory `may_refresh` hook.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let now = self.now();
        let node = *self.map.get(key)?;

        // SAFETY: node came from our map and is attached to our list.
        let entry = unsafe { (*node).get_value_mut() };

        if entry.is_expired(now) {
            let expired_seconds_ago = entry.expired_seconds_ago(now);
            let lifetime = entry.lifetime_seconds();
            let keep = self
                .delegate
                .as_ref()
                .map(|d| d.should_keep(&entry.value, &entry.key, lifetime, expired_seconds_ago))
                .unwrap_or(false);

            if keep {
                entry.reset_birth(now);
            } else {
                let removed_key = entry.key.clone();
                let size = entry.size_bytes;
                // SAFETY: node is attached to this list via map, not yet removed.
                unsafe { self.list.remove(node) };
                self.map.remove(&removed_key);
                self.current_bytes = self.current_bytes.saturating_sub(size);
                self.metrics.record_miss();
                self.metrics.record_expiration();
                return None;
            }
        } else if entry.due_for_refresh_advice(now) {
            let remaining = entry.remaining_seconds(now);
            let lifetime = entry.lifetime_seconds();
            if let Some(delegate) = &self.delegate {
                delegate.may_refresh(&entry.value, &entry.key, lifetime, remaining);
            }
            entry.mark_refresh_advised();
        }

        // SAFETY: node remains attached (no removal happened above).
        unsafe { self.list.move_to_front(node) };
        self.metrics.record_hit();
        // SAFETY: node is attached and holds an initialized entry.
        Some(&unsafe { (*node).get_value() }.value)
    }

    /// Delegate-free counterpart to [`get`](Self::get), used by
    /// [`SharedBoundedCache`](crate::cache::shared::SharedBoundedCache) to
    /// run delegate callbacks with its lock released.
    ///
    /// On a live, non-expired entry with no refresh advice due, behaves
    /// exactly like `get` and returns [`GetOutcome::Hit`]. When the entry
    /// is due for the advisory refresh hook or has expired, returns enough
    /// cloned state for the caller to invoke the delegate outside any lock
    /// and come back with the decision via [`resolve_expiry`](Self::resolve_expiry).
    pub fn get_or_decide<Q>(&mut self, key: &Q) -> GetOutcome<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        let now = self.now();
        let Some(&node) = self.map.get(key) else {
            return GetOutcome::Miss;
        };

        // SAFETY: node came from our map and is attached to our list.
        let entry = unsafe { (*node).get_value_mut() };

        if entry.is_expired(now) {
            return GetOutcome::NeedsExpiryDecision {
                key: entry.key.clone(),
                value: entry.value.clone(),
                lifetime_seconds: entry.lifetime_seconds(),
                expired_seconds_ago: entry.expired_seconds_ago(now),
            };
        }

        if entry.due_for_refresh_advice(now) {
            let outcome = GetOutcome::HasRefreshAdvice {
                key: entry.key.clone(),
                value: entry.value.clone(),
                lifetime_seconds: entry.lifetime_seconds(),
                remaining_seconds: entry.remaining_seconds(now),
            };
            entry.mark_refresh_advised();
            // SAFETY: node remains attached (no removal happened above).
            unsafe { self.list.move_to_front(node) };
            self.metrics.record_hit();
            return outcome;
        }

        // SAFETY: node remains attached (no removal happened above).
        unsafe { self.list.move_to_front(node) };
        self.metrics.record_hit();
        GetOutcome::Hit(entry.value.clone())
    }

    /// Applies a delegate's expiry verdict gathered from a prior
    /// [`get_or_decide`](Self::get_or_decide) call that returned
    /// [`GetOutcome::NeedsExpiryDecision`].
    ///
    /// Re-validates the entry before acting: if `key` is no longer
    /// present, returns `None`; if it is present but no longer expired
    /// (another call reset its birth in the meantime), treats this as an
    /// ordinary hit instead of trusting the stale verdict. Otherwise
    /// applies `keep` exactly as [`get`](Self::get) would have inline.
    pub fn resolve_expiry<Q>(&mut self, key: &Q, keep: bool) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        let now = self.now();
        let &node = self.map.get(key)?;
        // SAFETY: node came from our map and is attached to our list.
        let entry = unsafe { (*node).get_value_mut() };

        if !entry.is_expired(now) {
            unsafe { self.list.move_to_front(node) };
            self.metrics.record_hit();
            return Some(entry.value.clone());
        }

        if keep {
            entry.reset_birth(now);
            let value = entry.value.clone();
            unsafe { self.list.move_to_front(node) };
            self.metrics.record_hit();
            Some(value)
        } else {
            let removed_key = entry.key.clone();
            let size = entry.size_bytes;
            // SAFETY: node is attached to this list via map, not yet removed.
            unsafe { self.list.remove(node) };
            self.map.remove(&removed_key);
            self.current_bytes = self.current_bytes.saturating_sub(size);
            self.metrics.record_miss();
            self.metrics.record_expiration();
            None
        }
    }

    /// Inserts or overwrites `key` with `value`, using the cache's default
    /// lifetime. Promotes to MRU and shrinks to restore budgets.
    ///
    /// If `key` already maps to a value and `value` compares equal to it,
    /// the stored value is left untouched (no clone, no drop) and only the
    /// lifetime stamp and MRU position are refreshed.
    pub fn put(&mut self, key: K, value: V)
    where
        V: PartialEq,
    {
        self.put_with_lifetime(key, value, self.config.lifetime_seconds);
    }

    /// As [`put`](Self::put), with an explicit per-entry lifetime overriding
    /// the cache's default.
    pub fn put_with_lifetime(&mut self, key: K, value: V, lifetime_seconds: u64)
    where
        V: PartialEq,
    {
        let now = self.now();

        if let Some(&node) = self.map.get(&key) {
            // SAFETY: node came from our map.
            let entry = unsafe { (*node).get_value_mut() };
            if entry.value == value {
                entry.reset_birth(now);
                unsafe { self.list.move_to_front(node) };
                return;
            }

            let old_size = entry.size_bytes;
            let new_size = self.object_size(&value);
            entry.value = value;
            entry.size_bytes = new_size;
            entry.reset_birth(now);
            self.current_bytes = self.current_bytes.saturating_sub(old_size) + new_size;
            unsafe { self.list.move_to_front(node) };
            return;
        }

        let size = self.object_size(&value);
        self.evict_for_incoming(size);

        let entry = CacheEntry::new(key.clone(), value, now, lifetime_seconds, size);
        let node = self.list.add_unchecked(entry);
        self.map.insert(key, node);
        self.current_bytes += size;
    }

    /// Removes `key`, translating `expiry_time - now` (both tick counts)
    /// into a lifetime. A non-positive delta removes the key; a delta
    /// larger than roughly 30 years (`946_728_000` seconds) is treated as
    /// never-expires.
    pub fn put_until(&mut self, key: K, value: V, expiry_tick: u64)
    where
        V: PartialEq,
    {
        let now = self.now();
        if expiry_tick <= now {
            self.remove(&key);
            return;
        }
        let delta = expiry_tick - now;
        const THIRTY_YEARS_SECS: u64 = 946_728_000;
        let lifetime = if delta > THIRTY_YEARS_SECS { 0 } else { delta };
        self.put_with_lifetime(key, value, lifetime);
    }

    /// Removes `key` unconditionally, if present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.remove(key)?;
        // SAFETY: node came from our map.
        let entry = unsafe { self.list.remove(node) }.expect("map entries are always attached");
        self.current_bytes = self.current_bytes.saturating_sub(entry.size_bytes);
        Some(entry.value)
    }

    /// First removes every expired entry (a no-op if no default lifetime
    /// is set and no entry carries its own), then evicts from the LRU tail
    /// until the count is at or below `target_objects` and the byte total
    /// is at or below `target_bytes`. `target_objects == 0` empties the
    /// cache.
    pub fn shrink(&mut self, target_objects: usize, target_bytes: u64) {
        self.purge();

        while self.map.len() > target_objects || self.current_bytes > target_bytes {
            let Some(evicted) = self.list.remove_last() else {
                break;
            };
            self.map.remove(&evicted.key);
            self.current_bytes = self.current_bytes.saturating_sub(evicted.size_bytes);
            self.metrics.record_eviction();
        }
    }

    /// Evicts from the LRU tail until inserting one more entry of
    /// `incoming_bytes` would not exceed either configured budget.
    /// `max_objects == 0` or `max_bytes == 0` disables that budget.
    fn evict_for_incoming(&mut self, incoming_bytes: u64) {
        while (self.config.max_objects != 0 && self.map.len() + 1 > self.config.max_objects)
            || (self.config.max_bytes != 0 && self.current_bytes + incoming_bytes > self.config.max_bytes)
        {
            let Some(evicted) = self.list.remove_last() else {
                break;
            };
            self.map.remove(&evicted.key);
            self.current_bytes = self.current_bytes.saturating_sub(evicted.size_bytes);
            self.metrics.record_eviction();
        }
    }

    /// Removes every expired entry.
    pub fn purge(&mut self) {
        if self.map.is_empty() {
            return;
        }
        let now = self.now();
        let mut expired_keys: alloc::vec::Vec<K> = alloc::vec::Vec::new();
        for (key, &node) in self.map.iter() {
            // SAFETY: node came from our map.
            if unsafe { (*node).get_value() }.is_expired(now) {
                expired_keys.push(key.clone());
            }
        }
        for key in expired_keys {
            if let Some(node) = self.map.remove(&key) {
                // SAFETY: node came from our map.
                let entry = unsafe { self.list.remove(node) }.expect("attached");
                self.current_bytes = self.current_bytes.saturating_sub(entry.size_bytes);
                self.metrics.record_expiration();
            }
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.list.clear();
        self.map.clear();
        self.current_bytes = 0;
    }
}

impl<K: core::fmt::Debug + Hash + Eq, V, S> core::fmt::Debug for BoundedCache<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.map.len())
            .field("max_objects", &self.config.max_objects)
            .field("max_bytes", &self.config.max_bytes)
            .field("current_bytes", &self.current_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache<V: PartialEq>(max_objects: usize) -> BoundedCache<&'static str, V> {
        let config = BoundedCacheConfig {
            max_objects,
            ..Default::default()
        };
        BoundedCache::new(config, Arc::new(Ticker::new()))
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut c = cache::<i32>(2);
        c.put("a", 1);
        assert_eq!(c.get(&"a"), Some(&1));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn evicts_lru_tail_on_overflow() {
        let mut c = cache::<i32>(2);
        c.put("a", 1);
        c.put("b", 2);
        c.get(&"a"); // a is now MRU, b is LRU
        c.put("c", 3); // evicts b
        assert_eq!(c.get(&"b"), None);
        assert_eq!(c.get(&"a"), Some(&1));
        assert_eq!(c.get(&"c"), Some(&3));
        assert_eq!(c.metrics().evictions, 1);
    }

    #[test]
    fn expired_entry_is_removed_without_delegate() {
        let ticker = Arc::new(Ticker::new());
        let config = BoundedCacheConfig {
            max_objects: 4,
            lifetime_seconds: 5,
            ..Default::default()
        };
        let mut c: BoundedCache<&str, i32> = BoundedCache::new(config, Arc::clone(&ticker));
        c.put("a", 1);
        for _ in 0..6 {
            ticker.tick();
        }
        assert_eq!(c.get(&"a"), None);
        assert_eq!(c.metrics().expirations, 1);
    }

    struct AlwaysKeep;
    impl CacheDelegate<&'static str, i32> for AlwaysKeep {
        fn should_keep(&self, _v: &i32, _k: &&'static str, _lifetime: u64, _expired_ago: u64) -> bool {
            true
        }
    }

    #[test]
    fn delegate_can_veto_expiry() {
        let ticker = Arc::new(Ticker::new());
        let config = BoundedCacheConfig {
            max_objects: 4,
            lifetime_seconds: 5,
            ..Default::default()
        };
        let mut c: BoundedCache<&str, i32> = BoundedCache::new(config, Arc::clone(&ticker));
        c.set_delegate(Arc::new(AlwaysKeep));
        c.put("a", 1);
        for _ in 0..6 {
            ticker.tick();
        }
        assert_eq!(c.get(&"a"), Some(&1));
    }

    #[test]
    fn put_same_value_only_resets_lifetime() {
        let mut c = cache::<i32>(4);
        c.put("a", 1);
        c.put("a", 1);
        assert_eq!(c.get(&"a"), Some(&1));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn shrink_to_zero_empties_cache() {
        let mut c = cache::<i32>(4);
        c.put("a", 1);
        c.put("b", 2);
        c.shrink(0, u64::MAX);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn purge_removes_only_expired() {
        let ticker = Arc::new(Ticker::new());
        let config = BoundedCacheConfig {
            max_objects: 4,
            lifetime_seconds: 5,
            ..Default::default()
        };
        let mut c: BoundedCache<&str, i32> = BoundedCache::new(config, Arc::clone(&ticker));
        c.put("a", 1);
        for _ in 0..6 {
            ticker.tick();
        }
        c.put("b", 2);
        c.purge();
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn remove_clears_entry() {
        let mut c = cache::<i32>(4);
        c.put("a", 1);
        assert_eq!(c.remove(&"a"), Some(1));
        assert_eq!(c.get(&"a"), None);
    }
}
