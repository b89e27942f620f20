//! Bounded FIFO queue with a lock-free single-producer/single-consumer
//! fast path and a mutex/condvar-backed mode for multiple producers or
//! consumers.
//!
//! [`FifoRing`] picks its internal representation once, at construction,
//! from [`FifoConfig`]'s `multi_producer`/`multi_consumer` flags: both
//! false selects the lock-free [`spsc`] ring; either true selects the
//! [`locked`] mutex/condvar ring (which requires the `concurrent`
//! feature).

extern crate alloc;

#[cfg(feature = "concurrent")]
mod locked;
mod spsc;
mod stats;

pub use stats::FifoStats;

use crate::config::FifoConfig;
use crate::error::{PrimitiveError, Result};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "std")]
use core::time::Duration;
#[cfg(feature = "std")]
use std::time::Instant;

enum Mode<T> {
    Spsc(spsc::SpscRing<T>),
    #[cfg(feature = "concurrent")]
    Locked(locked::LockedRing<T>),
}

/// A bounded FIFO queue of opaque items.
///
/// Construction-time flags (`multi_producer`, `multi_consumer`) choose
/// between a lock-free single-producer/single-consumer fast path and a
/// mutex/condvar-backed mode supporting any number of producers and
/// consumers. See [`FifoConfig`] for capacity, granularity, and timeout.
pub struct FifoRing<T> {
    config: FifoConfig,
    mode: Mode<T>,
    stats: FifoStats,
    name: Option<String>,
}

impl<T> FifoRing<T> {
    /// Builds an unnamed FIFO from `config`.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Misuse`] if `config` requests a
    /// multi-producer or multi-consumer ring without the `concurrent`
    /// feature enabled.
    pub fn new(config: FifoConfig) -> Result<Self> {
        Self::named(config, None)
    }

    /// Builds a FIFO registered under `name` in the process-global
    /// registry (see [`crate::registry`]).
    ///
    /// # Errors
    /// Returns [`PrimitiveError::InvariantViolation`] if `name` is already
    /// registered, or [`PrimitiveError::Misuse`] as in [`new`](Self::new).
    pub fn named(config: FifoConfig, name: Option<String>) -> Result<Self> {
        #[cfg(feature = "std")]
        if let Some(n) = &name {
            crate::registry::register_fifo(n)?;
        }

        let needs_lock = config.multi_producer || config.multi_consumer;

        #[cfg(feature = "concurrent")]
        let mode = if needs_lock {
            Mode::Locked(locked::LockedRing::new(config.capacity.get()))
        } else {
            Mode::Spsc(spsc::SpscRing::new(config.capacity.get()))
        };
        #[cfg(not(feature = "concurrent"))]
        let mode = {
            if needs_lock {
                return Err(PrimitiveError::misuse(
                    "multi-producer/multi-consumer FIFOs require the `concurrent` feature",
                ));
            }
            Mode::Spsc(spsc::SpscRing::new(config.capacity.get()))
        };

        let stats = FifoStats::new(&config.histogram_boundaries_secs);
        Ok(FifoRing {
            config,
            mode,
            stats,
            name,
        })
    }

    /// Slot capacity `C`.
    pub fn capacity(&self) -> usize {
        self.config.capacity.get()
    }

    /// Current number of enqueued items.
    pub fn len(&self) -> usize {
        match &self.mode {
            Mode::Spsc(ring) => ring.len(),
            #[cfg(feature = "concurrent")]
            Mode::Locked(ring) => ring.len(),
        }
    }

    /// Returns `true` if the FIFO holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the FIFO is at capacity.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// This FIFO's registered name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Accumulated usage statistics.
    pub fn stats(&self) -> &FifoStats {
        &self.stats
    }

    /// Non-blocking enqueue. Returns `item` back if the FIFO is full.
    pub fn try_put(&self, item: T) -> Option<T> {
        let result = match &self.mode {
            Mode::Spsc(ring) => ring.try_push(item),
            #[cfg(feature = "concurrent")]
            Mode::Locked(ring) => ring.try_push(item),
        };
        self.stats.record_put_try(result.is_none());
        result
    }

    /// Non-blocking dequeue.
    pub fn try_get(&self) -> Option<T> {
        let result = match &self.mode {
            Mode::Spsc(ring) => ring.try_pop(),
            #[cfg(feature = "concurrent")]
            Mode::Locked(ring) => ring.try_pop(),
        };
        self.stats.record_get_try(result.is_some());
        result
    }

    /// Borrows or clones the head item without consuming it. Valid only
    /// when the caller holds whatever external exclusion the FIFO's mode
    /// requires (the designated single consumer in SPSC mode; any caller
    /// in locked mode, where the clone happens under the queue's lock).
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        match &self.mode {
            Mode::Spsc(ring) => ring.peek().cloned(),
            #[cfg(feature = "concurrent")]
            Mode::Locked(ring) => ring.peek(),
        }
    }

    /// Dequeues up to `count` items. If `block` is set and none are
    /// immediately available, waits for at least one (subject to the
    /// configured timeout) before returning whatever could be gathered.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Timeout`] if `block` is set and the
    /// initial wait exceeds the configured timeout.
    pub fn get_bulk(&self, count: usize, block: bool) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(count.min(self.capacity()));
        if block {
            out.push(self.blocking_get()?);
        }
        while out.len() < count {
            match self.try_get() {
                Some(item) => out.push(item),
                None => break,
            }
        }
        Ok(out)
    }

    /// Enqueues as many of `items` as fit. If `block` is set, waits for
    /// room for at least the first item (subject to the configured
    /// timeout) before returning whatever could not be enqueued.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Timeout`] if `block` is set and the
    /// initial wait exceeds the configured timeout.
    pub fn put_bulk(&self, items: Vec<T>, block: bool) -> Result<Vec<T>> {
        let mut iter = items.into_iter();
        if block {
            if let Some(first) = iter.next() {
                self.blocking_put(first)?;
            }
        }
        let mut leftover = Vec::new();
        for item in iter {
            if let Some(returned) = self.try_put(item) {
                leftover.push(returned);
            }
        }
        Ok(leftover)
    }

    /// Enqueues every item in `items`, blocking until all of them fit —
    /// never partially. Not available in single-producer/single-consumer
    /// mode.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Misuse`] in SPSC mode,
    /// [`PrimitiveError::InvariantViolation`] if `items.len()` exceeds
    /// capacity, or [`PrimitiveError::Timeout`] if the configured timeout
    /// elapses first.
    pub fn put_all(&self, items: Vec<T>) -> Result<()> {
        if matches!(self.mode, Mode::Spsc(_)) {
            return Err(PrimitiveError::misuse(
                "put_all is not available in single-producer/single-consumer mode",
            ));
        }
        if items.len() > self.capacity() {
            return Err(PrimitiveError::invariant(alloc::format!(
                "put_all with {} items exceeds capacity {}",
                items.len(),
                self.capacity()
            )));
        }
        for item in items {
            self.blocking_put(item)?;
        }
        Ok(())
    }

    #[cfg(feature = "std")]
    fn deadline(&self) -> Option<Instant> {
        if self.config.timeout_ms == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_millis(self.config.timeout_ms))
        }
    }

    #[cfg(feature = "std")]
    fn granularity(&self) -> Duration {
        Duration::from_millis(self.config.granularity_ms.max(1))
    }

    /// Blocking enqueue. Waits (respecting the configured granularity and
    /// cumulative timeout) until room is available.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Timeout`] if cumulative wait exceeds the
    /// configured timeout.
    #[cfg(feature = "std")]
    pub fn blocking_put(&self, mut item: T) -> Result<()> {
        let start = Instant::now();
        let deadline = self.deadline();

        loop {
            match &self.mode {
                Mode::Spsc(ring) => match ring.try_push(item) {
                    None => {
                        self.stats.record_put_try(true);
                        return Ok(());
                    }
                    Some(returned) => {
                        self.stats.record_put_try(false);
                        item = returned;
                    }
                },
                #[cfg(feature = "concurrent")]
                Mode::Locked(ring) => {
                    return match ring.push_blocking(item, self.granularity(), deadline) {
                        Ok(()) => {
                            self.stats.record_put_try(true);
                            Ok(())
                        }
                        Err(_lost_item) => {
                            self.stats.record_put_wait(start.elapsed().as_nanos() as u64);
                            Err(PrimitiveError::Timeout {
                                timeout_ms: self.config.timeout_ms,
                            })
                        }
                    };
                }
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    self.stats.record_put_wait(start.elapsed().as_nanos() as u64);
                    return Err(PrimitiveError::Timeout {
                        timeout_ms: self.config.timeout_ms,
                    });
                }
            }
            std::thread::sleep(self.granularity());
        }
    }

    /// Blocking dequeue. Waits (respecting the configured granularity and
    /// cumulative timeout) until an item is available.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Timeout`] if cumulative wait exceeds the
    /// configured timeout.
    #[cfg(feature = "std")]
    pub fn blocking_get(&self) -> Result<T> {
        let start = Instant::now();
        let deadline = self.deadline();

        loop {
            match &self.mode {
                Mode::Spsc(ring) => {
                    if let Some(item) = ring.try_pop() {
                        self.stats.record_get_try(true);
                        return Ok(item);
                    }
                    self.stats.record_get_try(false);
                }
                #[cfg(feature = "concurrent")]
                Mode::Locked(ring) => {
                    return match ring.pop_blocking(self.granularity(), deadline) {
                        Some(item) => {
                            self.stats.record_get_try(true);
                            Ok(item)
                        }
                        None => {
                            self.stats.record_get_wait(start.elapsed().as_nanos() as u64);
                            Err(PrimitiveError::Timeout {
                                timeout_ms: self.config.timeout_ms,
                            })
                        }
                    };
                }
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    self.stats.record_get_wait(start.elapsed().as_nanos() as u64);
                    return Err(PrimitiveError::Timeout {
                        timeout_ms: self.config.timeout_ms,
                    });
                }
            }
            std::thread::sleep(self.granularity());
        }
    }
}

#[cfg(feature = "std")]
impl<T> Drop for FifoRing<T> {
    fn drop(&mut self) {
        if let Some(name) = &self.name {
            crate::registry::unregister_fifo(name);
        }
    }
}

impl<T> fmt::Debug for FifoRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoRing")
            .field("name", &self.name)
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::num::NonZeroUsize;

    #[test]
    fn spsc_enqueue_dequeue_preserves_order() {
        let fifo: FifoRing<i32> = FifoRing::new(FifoConfig::spsc(NonZeroUsize::new(4).unwrap())).unwrap();
        for v in 1..=4 {
            assert!(fifo.try_put(v).is_none());
        }
        assert_eq!(fifo.try_put(5), Some(5));
        for v in 1..=4 {
            assert_eq!(fifo.try_get(), Some(v));
        }
        assert_eq!(fifo.try_get(), None);
    }

    #[test]
    fn spsc_rejects_put_all() {
        let fifo: FifoRing<i32> = FifoRing::new(FifoConfig::spsc(NonZeroUsize::new(4).unwrap())).unwrap();
        assert!(fifo.put_all(alloc::vec![1, 2]).is_err());
    }

    #[test]
    fn named_fifo_rejects_duplicate_names() {
        let name = "fifo-mod-test-duplicate-name";
        crate::registry::unregister_fifo(name);
        let first: FifoRing<i32> =
            FifoRing::named(FifoConfig::spsc(NonZeroUsize::new(2).unwrap()), Some(String::from(name))).unwrap();
        let second: Result<FifoRing<i32>> =
            FifoRing::named(FifoConfig::spsc(NonZeroUsize::new(2).unwrap()), Some(String::from(name)));
        assert!(second.is_err());
        drop(first);
        let third: FifoRing<i32> =
            FifoRing::named(FifoConfig::spsc(NonZeroUsize::new(2).unwrap()), Some(String::from(name))).unwrap();
        drop(third);
    }

    #[test]
    fn stats_track_try_put_and_get() {
        let fifo: FifoRing<i32> = FifoRing::new(FifoConfig::spsc(NonZeroUsize::new(1).unwrap())).unwrap();
        fifo.try_put(1);
        fifo.try_put(2); // rejected, full
        fifo.try_get();
        fifo.try_get(); // rejected, empty
        assert_eq!(fifo.stats().put_tries(), (2, 1));
        assert_eq!(fifo.stats().get_tries(), (2, 1));
    }
}
