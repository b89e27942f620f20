//! Thread-safe content-addressed interning of immutable values.
//!
//! [`Uniquer<T>`] hands out [`Unique<T>`] handles such that two values that
//! compare equal are represented by the same backing allocation, so
//! equality tests on the handle reduce to pointer identity. The source
//! achieves the "remove from the intern table exactly when the last
//! external owner releases the value" requirement by swapping the value's
//! class for a subclass whose destructor unregisters it; here the intern
//! table stores only [`Weak`](alloc::sync::Weak) references, and
//! [`Unique::drop`] takes the uniquer's mutex and removes the entry
//! whenever it is dropping the last strong reference, which is the literal
//! translation of that requirement into ownership rather than reflection.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use std::collections::hash_map::DefaultHasher;
use std::sync::Mutex;

fn content_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

struct Inner<T> {
    // Keyed by content hash rather than the value itself, since values are
    // moved into their own `Arc` on first intern and we only ever look them
    // up by a freshly hashed candidate. Collisions are resolved by
    // upgrading each weak reference and comparing with `==`.
    table: Mutex<BTreeMap<u64, Vec<Weak<T>>>>,
}

impl<T: fmt::Debug> fmt::Debug for Inner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner").finish_non_exhaustive()
    }
}

/// Interns `T: Eq + Hash` values behind a content hash.
///
/// Cloning a `Uniquer` shares the same backing table; every clone observes
/// the same set of live, interned values.
pub struct Uniquer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Uniquer<T> {
    fn clone(&self) -> Self {
        Uniquer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Uniquer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Uniquer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uniquer").field("len", &self.len()).finish()
    }
}

impl<T> Uniquer<T> {
    /// Creates an empty intern table.
    #[must_use]
    pub fn new() -> Self {
        Uniquer {
            inner: Arc::new(Inner {
                table: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Number of distinct values currently interned.
    pub fn len(&self) -> usize {
        let table = self.inner.table.lock().unwrap_or_else(|e| e.into_inner());
        table.values().map(|bucket| bucket.iter().filter(|w| w.strong_count() > 0).count()).sum()
    }

    /// Returns `true` if no value is currently interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Eq + Hash> Uniquer<T> {
    /// Returns the canonical handle for `value`: if an equal value is
    /// already interned and still alive, a clone of its existing handle
    /// (sharing the same allocation); otherwise `value` is interned fresh.
    pub fn intern(&self, value: T) -> Unique<T> {
        let key = content_hash(&value);
        let mut table = self.inner.table.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = table.entry(key).or_default();

        bucket.retain(|weak| weak.strong_count() > 0);
        for weak in bucket.iter() {
            if let Some(existing) = weak.upgrade() {
                if *existing == value {
                    return Unique {
                        value: existing,
                        uniquer: Arc::clone(&self.inner),
                        key,
                    };
                }
            }
        }

        let arc = Arc::new(value);
        bucket.push(Arc::downgrade(&arc));
        Unique {
            value: arc,
            uniquer: Arc::clone(&self.inner),
            key,
        }
    }
}

/// A cheaply-cloneable handle to an interned value.
///
/// Two handles produced by the same [`Uniquer::intern`] call (or by
/// interning two equal values while at least one handle is still alive)
/// share the same backing allocation and compare equal by pointer. The
/// last clone to drop removes the entry from the owning [`Uniquer`]'s
/// table under its mutex.
pub struct Unique<T> {
    value: Arc<T>,
    uniquer: Arc<Inner<T>>,
    key: u64,
}

impl<T> Clone for Unique<T> {
    fn clone(&self) -> Self {
        Unique {
            value: Arc::clone(&self.value),
            uniquer: Arc::clone(&self.uniquer),
            key: self.key,
        }
    }
}

impl<T> Deref for Unique<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> PartialEq for Unique<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl<T> Eq for Unique<T> {}

impl<T: fmt::Debug> fmt::Debug for Unique<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unique").field(&self.value).finish()
    }
}

impl<T> Drop for Unique<T> {
    fn drop(&mut self) {
        // The strong-count check must happen under the same lock `intern`
        // takes, not before it: checking first and locking second would let
        // a concurrent `intern` of an equal value upgrade this value's weak
        // reference (and hand out a new live handle) in the window between
        // the check and the removal, so a last-handle drop must take the
        // lock before deciding whether it really is the last one.
        let mut table = self.uniquer.table.lock().unwrap_or_else(|e| e.into_inner());
        if Arc::strong_count(&self.value) == 1 {
            if let Some(bucket) = table.get_mut(&self.key) {
                bucket.retain(|weak| match weak.upgrade() {
                    Some(still_alive) => !Arc::ptr_eq(&still_alive, &self.value),
                    None => false,
                });
                if bucket.is_empty() {
                    table.remove(&self.key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;

    #[test]
    fn interning_equal_values_shares_allocation() {
        let uniquer: Uniquer<std::string::String> = Uniquer::new();
        let a = uniquer.intern(std::string::String::from("hello"));
        let b = uniquer.intern(std::string::String::from("hello"));
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.value, &b.value));
    }

    #[test]
    fn distinct_values_get_distinct_handles() {
        let uniquer: Uniquer<i32> = Uniquer::new();
        let a = uniquer.intern(1);
        let b = uniquer.intern(2);
        assert_ne!(a, b);
    }

    #[test]
    fn last_drop_removes_table_entry() {
        let uniquer: Uniquer<i32> = Uniquer::new();
        let a = uniquer.intern(42);
        assert_eq!(uniquer.len(), 1);
        let b = uniquer.intern(42);
        assert_eq!(uniquer.len(), 1);
        drop(a);
        assert_eq!(uniquer.len(), 1);
        drop(b);
        assert_eq!(uniquer.len(), 0);
    }

    #[test]
    fn concurrent_intern_and_drop_never_loses_a_live_entry() {
        // Regression test for a check-then-act race: `Unique::drop` must
        // not decide "I'm the last handle" outside the uniquer's lock,
        // since a concurrent `intern` of an equal value could upgrade the
        // weak reference and hand out a fresh live handle in that window.
        let uniquer: Uniquer<i32> = Uniquer::new();
        let handles: std::vec::Vec<_> = (0..8)
            .map(|_| {
                let uniquer = uniquer.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let h = uniquer.intern(42);
                        drop(h);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(uniquer.len(), 0);
    }

    #[test]
    fn reinterning_after_drop_allocates_fresh() {
        let uniquer: Uniquer<i32> = Uniquer::new();
        let a = uniquer.intern(7);
        let a_ptr = Arc::as_ptr(&a.value);
        drop(a);
        let b = uniquer.intern(7);
        // Not a strict guarantee of a different address (the allocator may
        // reuse it), but the table must no longer be pointing at the old
        // entry; `len()` staying at 1 for the fresh value is the real check.
        let _ = a_ptr;
        assert_eq!(uniquer.len(), 1);
        assert_eq!(*b, 7);
    }
}
