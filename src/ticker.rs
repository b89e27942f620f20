//! Monotonic seconds clock.
//!
//! [`Ticker`] is a free-running counter of whole seconds, advanced explicitly
//! by [`Ticker::tick`]. [`BoundedCache`](crate::cache::BoundedCache) stamps
//! entry birth times from it and [`Throughput`](crate::throughput::Throughput)
//! uses it to decide when a time window has rolled over.
//!
//! Using a dedicated tick counter rather than `SystemTime`/`Instant` keeps the
//! core `no_std` and keeps expiry math in whole seconds, independent of
//! wall-clock adjustments. Under `std`, [`Ticker::spawn_background`] starts a
//! daemon thread that calls `tick()` once per second, matching a host process
//! that drives the ticker with a periodic timer; without `std` the embedder
//! must call `tick()` itself (from an interrupt handler, an event loop, or any
//! other externally owned cadence).

extern crate alloc;

use core::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter of whole seconds.
///
/// Cloning a `Ticker` handle shares the same underlying counter; all handles
/// observe the same ticks.
#[derive(Debug)]
pub struct Ticker {
    seconds: AtomicU64,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticker {
    /// Creates a new ticker starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seconds: AtomicU64::new(0),
        }
    }

    /// Advances the ticker by one second and returns the new value.
    pub fn tick(&self) -> u64 {
        self.seconds.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the current tick value without advancing it.
    pub fn now(&self) -> u64 {
        self.seconds.load(Ordering::Acquire)
    }

    /// Starts a daemon thread that calls [`tick`](Self::tick) once per
    /// `interval`. Intended for production use with `interval =
    /// Duration::from_secs(1)`; tests may use a shorter interval to avoid
    /// slow test runs.
    ///
    /// The returned [`TickerHandle`] owns the background thread; dropping it
    /// stops the thread at the next wakeup.
    #[cfg(feature = "std")]
    pub fn spawn_background(self: alloc::sync::Arc<Self>, interval: std::time::Duration) -> TickerHandle {
        let stop = alloc::sync::Arc::new(core::sync::atomic::AtomicBool::new(false));
        let thread_stop = alloc::sync::Arc::clone(&stop);
        let ticker = alloc::sync::Arc::clone(&self);
        let join = std::thread::Builder::new()
            .name("perfprims-ticker".into())
            .spawn(move || {
                while !thread_stop.load(Ordering::Acquire) {
                    std::thread::sleep(interval);
                    ticker.tick();
                }
            })
            .expect("failed to spawn ticker thread");
        TickerHandle {
            stop,
            join: Some(join),
        }
    }
}

/// Owns the background thread spawned by [`Ticker::spawn_background`].
///
/// Dropping the handle requests the thread to stop and joins it.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct TickerHandle {
    stop: alloc::sync::Arc<core::sync::atomic::AtomicBool>,
    join: Option<std::thread::JoinHandle<()>>,
}

#[cfg(feature = "std")]
impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
