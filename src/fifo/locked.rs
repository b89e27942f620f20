//! Mutex/condvar-backed FIFO mode, used whenever more than one producer or
//! more than one consumer is declared.
//!
//! Resolves Open Question (b) of the design notes: rather than reconstruct
//! a two-separate-locks wake-up ordering, both sides share one
//! `parking_lot::Condvar` and every empty/full transition calls
//! `notify_all`, with each waiter re-checking its own predicate (and
//! cumulative wait against the configured timeout) on every wake.

extern crate alloc;

use alloc::collections::VecDeque;
use core::fmt;
use core::time::Duration;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

pub(crate) struct LockedRing<T> {
    capacity: usize,
    queue: Mutex<VecDeque<T>>,
    condvar: Condvar,
}

impl<T> LockedRing<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        LockedRing {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub(crate) fn try_push(&self, item: T) -> Option<T> {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            return Some(item);
        }
        queue.push_back(item);
        self.condvar.notify_all();
        None
    }

    pub(crate) fn try_pop(&self) -> Option<T> {
        let mut queue = self.queue.lock();
        let item = queue.pop_front();
        if item.is_some() {
            self.condvar.notify_all();
        }
        item
    }

    pub(crate) fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.queue.lock().front().cloned()
    }

    /// Blocks until `item` is enqueued or `deadline` passes, waking on
    /// every transition and re-checking both conditions each time.
    /// Returns the item back on timeout.
    pub(crate) fn push_blocking(&self, item: T, granularity: Duration, deadline: Option<Instant>) -> Result<(), T> {
        let mut queue = self.queue.lock();
        loop {
            if queue.len() < self.capacity {
                queue.push_back(item);
                self.condvar.notify_all();
                return Ok(());
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(item);
                }
            }
            self.condvar.wait_for(&mut queue, granularity);
        }
    }

    /// Blocks until an item is available or `deadline` passes.
    pub(crate) fn pop_blocking(&self, granularity: Duration, deadline: Option<Instant>) -> Option<T> {
        let mut queue = self.queue.lock();
        loop {
            if let Some(item) = queue.pop_front() {
                self.condvar.notify_all();
                return Some(item);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return None;
                }
            }
            self.condvar.wait_for(&mut queue, granularity);
        }
    }
}

impl<T> fmt::Debug for LockedRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedRing")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
