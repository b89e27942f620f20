//! Index-addressed probabilistic skip list.
//!
//! [`IndexedSkipList`] is keyed by integer position rather than by value:
//! `insert(i, v)`, `remove(i)`, `replace(i, v)`, and `get(i)` all address an
//! element by its current 0-based rank in the sequence, in expected
//! `O(log n)`. Each forward pointer carries a `span` ("delta" in the
//! design vocabulary) counting how many index positions it covers, so a
//! lookup can descend levels while accumulating position instead of
//! walking the full list.
//!
//! Not internally synchronized: calls are expected from one thread at a
//! time, same as [`BoundedCache`](crate::cache::BoundedCache).

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PrimitiveError, Result};

/// Maximum node level. Levels are drawn from a geometric distribution
/// (`p = 1/2`) and never exceed this cap.
const MAX_LEVEL: usize = 16;

struct Level<T> {
    /// Number of index positions spanned by following `forward`.
    span: u64,
    /// Next node at this level, or null past the last real node (the
    /// "sentinel" of the design vocabulary).
    forward: *mut Node<T>,
}

struct Node<T> {
    /// `None` only for the header.
    value: Option<T>,
    levels: Vec<Level<T>>,
}

impl<T> Node<T> {
    fn new_header() -> *mut Node<T> {
        let levels = (0..MAX_LEVEL)
            .map(|_| Level {
                span: 1,
                forward: ptr::null_mut(),
            })
            .collect();
        Box::into_raw(Box::new(Node { value: None, levels }))
    }

    fn new(value: T, level: usize) -> *mut Node<T> {
        let levels = (0..level)
            .map(|_| Level {
                span: 1,
                forward: ptr::null_mut(),
            })
            .collect();
        Box::into_raw(Box::new(Node {
            value: Some(value),
            levels,
        }))
    }
}

/// A small non-cryptographic xorshift generator, used only to pick each
/// inserted node's level. No external randomness source is pulled in so
/// the structure stays usable in the crate's `no_std` configurations.
struct Rng(u64);

static SEED_COUNTER: AtomicU64 = AtomicU64::new(0x9E37_79B9_7F4A_7C15);

impl Rng {
    fn fresh() -> Self {
        // Distinct instances get distinct starting states; this is a
        // level-balancing coin flip, not a security-sensitive draw.
        Rng(SEED_COUNTER.fetch_add(0x2545_F491_4F6C_DD1D, Ordering::Relaxed) | 1)
    }

    fn next_bool(&mut self) -> bool {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x & 1 == 1
    }
}

/// A random-access sequence backed by a probabilistic skip list, indexed
/// by position rather than by value.
///
/// `insert`, `remove`, `replace`, and `get` all run in expected `O(log n)`
/// time. The structure is not internally synchronized.
pub struct IndexedSkipList<T> {
    head: *mut Node<T>,
    level: usize,
    len: usize,
    rng: Rng,
}

// SAFETY: an `IndexedSkipList<T>` owns every node it allocates exclusively
// through `head`; no other pointer to a node escapes the structure, so it
// may be sent across threads like any other owned collection (callers
// must still serialize calls to it themselves, per the design's
// single-thread-at-a-time contract).
unsafe impl<T: Send> Send for IndexedSkipList<T> {}

impl<T> Default for IndexedSkipList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexedSkipList<T> {
    /// Creates an empty skip list.
    #[must_use]
    pub fn new() -> Self {
        IndexedSkipList {
            head: Node::new_header(),
            level: 1,
            len: 0,
            rng: Rng::fresh(),
        }
    }

    /// Number of elements currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.next_bool() {
            level += 1;
        }
        level
    }

    /// Descends from the header to just before `rank`, recording the
    /// per-level predecessor and the accumulated position reached at each
    /// level. Mirrors the lookup procedure used by `get`, `insert`,
    /// `remove`, and `replace`.
    ///
    /// # Safety
    /// `self.head` and every node reachable from it must be valid.
    unsafe fn descend(&self, rank: u64) -> ([*mut Node<T>; MAX_LEVEL], [u64; MAX_LEVEL]) {
        let mut update = [self.head; MAX_LEVEL];
        let mut acc_at = [0u64; MAX_LEVEL];

        let mut cur = self.head;
        let mut acc = 0u64;
        for level in (0..self.level).rev() {
            loop {
                // SAFETY: `cur` is always a live node owned by this list.
                let lvl = unsafe { &(*cur).levels[level] };
                if lvl.forward.is_null() || acc + lvl.span > rank {
                    break;
                }
                acc += lvl.span;
                cur = lvl.forward;
            }
            update[level] = cur;
            acc_at[level] = acc;
        }
        (update, acc_at)
    }

    /// Inserts `value` at index `i`, shifting everything at or after `i`
    /// one position later. `i` may equal `len()` (append).
    ///
    /// # Errors
    /// Returns [`PrimitiveError::InvariantViolation`] if `i > len()`.
    pub fn insert(&mut self, i: usize, value: T) -> Result<()> {
        if i > self.len {
            return Err(PrimitiveError::invariant(alloc::format!(
                "index {i} out of range for skip list of length {}",
                self.len
            )));
        }
        let rank = i as u64;

        // SAFETY: `self.head` is valid for the lifetime of `self`.
        let (mut update, mut acc_at) = unsafe { self.descend(rank) };

        let new_level = self.random_level();
        if new_level > self.level {
            for level in self.level..new_level {
                update[level] = self.head;
                acc_at[level] = 0;
            }
            self.level = new_level;
        }

        let new_node = Node::new(value, new_level);

        for level in 0..new_level {
            // SAFETY: `update[level]` is a live node from `descend`.
            let pred = unsafe { &mut (*update[level]).levels[level] };
            let old_span = pred.span;
            let old_forward = pred.forward;

            // SAFETY: `new_node` was just allocated with `new_level` levels.
            let node_lvl = unsafe { &mut (*new_node).levels[level] };
            node_lvl.span = acc_at[level] + old_span - rank;
            node_lvl.forward = old_forward;

            pred.span = rank - acc_at[level] + 1;
            pred.forward = new_node;
        }
        for level in new_level..self.level {
            // SAFETY: `update[level]` is a live node from `descend`.
            unsafe { (*update[level]).levels[level].span += 1 };
        }

        self.len += 1;
        Ok(())
    }

    /// Removes and returns the element at index `i`.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::InvariantViolation`] if `i >= len()`.
    pub fn remove(&mut self, i: usize) -> Result<T> {
        if i >= self.len {
            return Err(PrimitiveError::invariant(alloc::format!(
                "index {i} out of range for skip list of length {}",
                self.len
            )));
        }
        let rank = i as u64;

        // SAFETY: `self.head` is valid for the lifetime of `self`.
        let (update, _acc_at) = unsafe { self.descend(rank) };

        // SAFETY: level 0 always has span 1, so the loop in `descend`
        // stopped exactly one hop before `rank`; the target is live.
        let target = unsafe { (*update[0]).levels[0].forward };
        debug_assert!(!target.is_null());

        for level in 0..self.level {
            // SAFETY: `update[level]` is a live node from `descend`.
            let pred = unsafe { &mut (*update[level]).levels[level] };
            if ptr::eq(pred.forward, target) {
                // SAFETY: `target` is live and has at least this many levels
                // whenever `level < target`'s own level count; levels beyond
                // that were never reached by `pred.forward == target`.
                let target_span = unsafe { (*target).levels[level].span };
                let target_forward = unsafe { (*target).levels[level].forward };
                pred.span += target_span - 1;
                pred.forward = target_forward;
            } else {
                pred.span -= 1;
            }
        }

        while self.level > 1 {
            // SAFETY: `self.head` is always valid.
            if unsafe { (*self.head).levels[self.level - 1].forward.is_null() } {
                self.level -= 1;
            } else {
                break;
            }
        }

        self.len -= 1;
        // SAFETY: `target` was allocated by `Node::new` via `Box::into_raw`
        // and is being retired exactly once.
        let boxed = unsafe { Box::from_raw(target) };
        Ok(boxed.value.expect("non-header node always holds a value"))
    }

    /// Replaces the element at index `i`, returning the previous value. No
    /// structural change (levels, spans) is made.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::InvariantViolation`] if `i >= len()`.
    pub fn replace(&mut self, i: usize, value: T) -> Result<T> {
        let slot = self.node_at_mut(i)?;
        Ok(core::mem::replace(slot, value))
    }

    /// Returns a reference to the element at index `i`, or `None` if out
    /// of range.
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.len {
            return None;
        }
        // SAFETY: `self.head` is valid for the lifetime of `self`.
        let (update, _) = unsafe { self.descend(i as u64) };
        // SAFETY: level 0 target is live, as in `remove`.
        let target = unsafe { (*update[0]).levels[0].forward };
        // SAFETY: `target` is a non-header node, so its value is `Some`.
        unsafe { (*target).value.as_ref() }
    }

    /// As [`get`](Self::get), but returns [`PrimitiveError::InvariantViolation`]
    /// instead of `None` when `i` is out of range, matching the design's
    /// `at(i)` contract.
    pub fn at(&self, i: usize) -> Result<&T> {
        self.get(i).ok_or_else(|| {
            PrimitiveError::invariant(alloc::format!(
                "index {i} out of range for skip list of length {}",
                self.len
            ))
        })
    }

    fn node_at_mut(&mut self, i: usize) -> Result<&mut T> {
        if i >= self.len {
            return Err(PrimitiveError::invariant(alloc::format!(
                "index {i} out of range for skip list of length {}",
                self.len
            )));
        }
        // SAFETY: `self.head` is valid for the lifetime of `self`.
        let (update, _) = unsafe { self.descend(i as u64) };
        // SAFETY: level 0 target is live, as in `remove`.
        let target = unsafe { (*update[0]).levels[0].forward };
        // SAFETY: `target` is a non-header node, so its value is `Some`.
        Ok(unsafe { (*target).value.as_mut() }.expect("non-header node always holds a value"))
    }

    /// Iterates every element in index order.
    pub fn iter(&self) -> Iter<'_, T> {
        // SAFETY: `self.head` is valid; level 0 always links every node.
        let first = unsafe { (*self.head).levels[0].forward };
        Iter {
            cur: first,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<T> Drop for IndexedSkipList<T> {
    fn drop(&mut self) {
        let mut cur = self.head;
        loop {
            // SAFETY: every node in the chain is live until freed here, and
            // each is visited and freed exactly once.
            let next = unsafe { (*cur).levels[0].forward };
            let _ = unsafe { Box::from_raw(cur) };
            if next.is_null() {
                break;
            }
            cur = next;
        }
    }
}

/// Borrowing iterator over an [`IndexedSkipList`], produced by
/// [`IndexedSkipList::iter`].
pub struct Iter<'a, T> {
    cur: *mut Node<T>,
    _marker: core::marker::PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.cur.is_null() {
            return None;
        }
        // SAFETY: `self.cur` is borrowed from a live `IndexedSkipList<T>`
        // for lifetime `'a`, so every node in the chain is valid that long.
        let node = unsafe { &*self.cur };
        self.cur = node.levels[0].forward;
        node.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use std::vec::Vec as StdVec;

    fn values<T: Clone>(list: &IndexedSkipList<T>) -> StdVec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn insert_at_head_shifts_everything_right() {
        let mut list = IndexedSkipList::new();
        list.insert(0, "a").unwrap();
        list.insert(0, "b").unwrap();
        list.insert(0, "c").unwrap();
        assert_eq!(values(&list), alloc::vec!["c", "b", "a"]);
    }

    #[test]
    fn append_builds_forward_order() {
        let mut list = IndexedSkipList::new();
        for v in 0..100 {
            list.insert(list.len(), v).unwrap();
        }
        assert_eq!(list.len(), 100);
        assert_eq!(values(&list), (0..100).collect::<StdVec<_>>());
    }

    #[test]
    fn spec_worked_example() {
        // insert "a","b","c","d" at indices 0,0,1,3
        let mut list = IndexedSkipList::new();
        list.insert(0, "a").unwrap();
        list.insert(0, "b").unwrap();
        list.insert(1, "c").unwrap();
        list.insert(3, "d").unwrap();
        assert_eq!(values(&list), alloc::vec!["b", "c", "a", "d"]);

        let removed = list.remove(2).unwrap();
        assert_eq!(removed, "a");
        assert_eq!(values(&list), alloc::vec!["b", "c", "d"]);
    }

    #[test]
    fn remove_then_insert_equals_replace() {
        let mut a = IndexedSkipList::new();
        let mut b = IndexedSkipList::new();
        for v in ["x", "y", "z"] {
            a.insert(a.len(), v).unwrap();
            b.insert(b.len(), v).unwrap();
        }
        let old_a = a.remove(1).unwrap();
        a.insert(1, "new").unwrap();
        let old_b = b.replace(1, "new").unwrap();
        assert_eq!(old_a, old_b);
        assert_eq!(values(&a), values(&b));
    }

    #[test]
    fn replace_does_not_change_length() {
        let mut list = IndexedSkipList::new();
        for v in 0..5 {
            list.insert(list.len(), v).unwrap();
        }
        let prev = list.replace(2, 99).unwrap();
        assert_eq!(prev, 2);
        assert_eq!(list.len(), 5);
        assert_eq!(*list.at(2).unwrap(), 99);
    }

    #[test]
    fn out_of_range_is_invariant_violation() {
        let mut list: IndexedSkipList<i32> = IndexedSkipList::new();
        assert!(list.insert(1, 0).is_err());
        assert!(list.remove(0).is_err());
        assert!(list.at(0).is_err());
        list.insert(0, 1).unwrap();
        assert!(list.replace(5, 2).is_err());
    }

    #[test]
    fn random_level_never_exceeds_cap() {
        let mut list: IndexedSkipList<i32> = IndexedSkipList::new();
        for _ in 0..500 {
            assert!(list.random_level() <= MAX_LEVEL);
        }
    }

    #[test]
    fn large_sequence_round_trips_via_removal() {
        let mut list = IndexedSkipList::new();
        for v in 0..200 {
            list.insert(list.len(), v).unwrap();
        }
        let mut out = StdVec::new();
        while !list.is_empty() {
            out.push(list.remove(0).unwrap());
        }
        assert_eq!(out, (0..200).collect::<StdVec<_>>());
    }
}
