//! Lock-free single-producer/single-consumer ring.
//!
//! Resolves Open Question (a) of the design notes: the fast path makes its
//! memory ordering explicit rather than relying on a source language's
//! implicit fences. The producer does a `Relaxed` load of its own `head`,
//! an `Acquire` load of `tail` (to observe consumer progress), a plain slot
//! write, then a `Release` store of `head` to publish it. The consumer is
//! symmetric. Grounded in the documented ordering protocol of a lock-free
//! SPSC ring in the wider corpus; this version omits that design's
//! per-side cached-counter optimization for simplicity.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct SpscRing<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    capacity: usize,
    /// Written only by the producer.
    head: AtomicUsize,
    /// Written only by the consumer.
    tail: AtomicUsize,
}

// SAFETY: the producer only ever touches `slots[head % capacity]`, and only
// before publishing the new `head`; the consumer only ever touches
// `slots[tail % capacity]`, and only after observing that publish via an
// `Acquire` load of `head`. The two index sets are disjoint at all times,
// so concurrent producer/consumer access never touches the same slot.
unsafe impl<T: Send> Send for SpscRing<T> {}
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T> SpscRing<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));
        SpscRing {
            slots: slots.into_boxed_slice(),
            capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Producer-only. Enqueues `item`; returns it back if the ring is full.
    pub(crate) fn try_push(&self, item: T) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= self.capacity {
            return Some(item);
        }
        let idx = head % self.capacity;
        // SAFETY: the consumer only reads slots with index < head (mod
        // capacity) once it observes this `head` value via its own
        // `Acquire` load, which happens after the `Release` store below.
        unsafe { (*self.slots[idx].get()).write(item) };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        None
    }

    /// Consumer-only. Dequeues the oldest item, if any.
    pub(crate) fn try_pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let idx = tail % self.capacity;
        // SAFETY: `head` observed strictly ahead of `tail` means the
        // producer has published a fully initialized item at this slot and
        // will not revisit it until `tail` advances past it, which only
        // this function does.
        let item = unsafe { (*self.slots[idx].get()).assume_init_read() };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Consumer-only. Borrows the oldest item without consuming it.
    pub(crate) fn peek(&self) -> Option<&T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let idx = tail % self.capacity;
        // SAFETY: as in `try_pop`; the borrow does not outlive `&self` and
        // no mutation of this slot can occur until the consumer itself
        // calls `try_pop`.
        Some(unsafe { (*self.slots[idx].get()).assume_init_ref() })
    }
}

impl<T> Drop for SpscRing<T> {
    fn drop(&mut self) {
        let tail = *self.tail.get_mut();
        let head = *self.head.get_mut();
        let mut t = tail;
        while t != head {
            let idx = t % self.capacity;
            // SAFETY: `&mut self` gives exclusive access; every slot in
            // `[tail, head)` holds an item the consumer never read.
            unsafe { (*self.slots[idx].get()).assume_init_drop() };
            t = t.wrapping_add(1);
        }
    }
}

impl<T> fmt::Debug for SpscRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscRing")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_round_trips_in_order() {
        let ring = SpscRing::new(4);
        for v in 1..=4 {
            assert!(ring.try_push(v).is_none());
        }
        assert!(ring.try_push(5).is_some(), "ring should reject past capacity");
        for v in 1..=4 {
            assert_eq!(ring.try_pop(), Some(v));
        }
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn peek_does_not_consume() {
        let ring = SpscRing::new(2);
        ring.try_push(10).unwrap_or(());
        assert_eq!(ring.peek(), Some(&10));
        assert_eq!(ring.peek(), Some(&10));
        assert_eq!(ring.try_pop(), Some(10));
        assert_eq!(ring.peek(), None);
    }

    #[test]
    fn wraps_around_slot_indices() {
        let ring = SpscRing::new(2);
        for round in 0..10 {
            assert!(ring.try_push(round).is_none());
            assert_eq!(ring.try_pop(), Some(round));
        }
    }

    #[test]
    fn drop_releases_unread_items() {
        let ring = SpscRing::new(4);
        for v in 0..3 {
            ring.try_push(alloc::vec![v; 3]).unwrap_or(());
        }
        drop(ring); // miri/valgrind would flag a leak here if drop were wrong
    }
}
