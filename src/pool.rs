//! Fixed-upper-bound worker thread pool.
//!
//! [`WorkerPool`] is an unordered bag of threads pulling closures off a
//! bounded queue. It is deliberately independent of [`FifoRing`](crate::fifo::FifoRing):
//! the two are separate designs with separate internal queues, matching the
//! source library where the thread pool never layers on the FIFO ring.
//!
//! Requires `std`: a thread pool without threads is not meaningful, and the
//! panic-containment path uses `std::panic::catch_unwind`.

#![cfg(feature = "std")]

extern crate alloc;

use crate::config::WorkerPoolConfig;
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::any::Any;
use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct State {
    queue: VecDeque<Job>,
    max_threads: usize,
    max_operations: usize,
    live_threads: usize,
    busy_threads: usize,
    suspended: bool,
    shutdown: bool,
}

struct Inner {
    state: Mutex<State>,
    condvar: Condvar,
    shutdown_deadline: Duration,
}

/// A pool of worker threads draining a bounded queue of scheduled closures.
///
/// Two construction-time bounds govern it: `max_threads` (threads created on
/// demand, never exceeding this count) and `max_operations` (queue depth
/// before [`schedule`](Self::schedule) blocks the caller). Either bound set
/// to zero makes every [`schedule`](Self::schedule) call run synchronously
/// in the caller's thread instead of queueing.
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    /// Builds a pool from `config`. No threads are spawned until the first
    /// item is scheduled.
    #[must_use]
    pub fn new(config: WorkerPoolConfig) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                max_threads: config.max_threads,
                max_operations: config.max_operations,
                live_threads: 0,
                busy_threads: 0,
                suspended: false,
                shutdown: false,
            }),
            condvar: Condvar::new(),
            shutdown_deadline: Duration::from_millis(config.shutdown_deadline_ms),
        });
        WorkerPool { inner }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Currently configured maximum number of live worker threads.
    pub fn max_threads(&self) -> usize {
        self.lock().max_threads
    }

    /// Currently configured maximum queue depth.
    pub fn max_operations(&self) -> usize {
        self.lock().max_operations
    }

    /// `true` if no items are waiting to start.
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// `true` if no items are waiting and none are currently running.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.queue.is_empty() && state.busy_threads == 0
    }

    /// `true` if [`suspend`](Self::suspend) is in effect.
    pub fn is_suspended(&self) -> bool {
        self.lock().suspended
    }

    /// Stops workers from starting new items; items already running
    /// continue to completion.
    pub fn suspend(&self) {
        self.lock().suspended = true;
    }

    /// Reverses [`suspend`](Self::suspend) and wakes idle workers.
    pub fn resume(&self) {
        self.lock().suspended = false;
        self.inner.condvar.notify_all();
    }

    /// Removes every not-yet-started item from the queue, returning the
    /// count removed. Items already running are unaffected.
    pub fn flush(&self) -> usize {
        let mut state = self.lock();
        let count = state.queue.len();
        state.queue.clear();
        self.inner.condvar.notify_all();
        count
    }

    /// Enqueues `job` to run on a worker thread.
    ///
    /// If `max_threads` or `max_operations` is zero, runs `job` immediately
    /// in the caller's thread instead. If the queue is at `max_operations`,
    /// blocks the caller until room is available. Scheduling into a pool
    /// whose threads have all been asked to shut down (via
    /// [`set_max_threads(0)`](Self::set_max_threads)) after the last worker
    /// exits is a no-op; the job is dropped silently, matching the source's
    /// "scheduling into a shutdown pool" behavior.
    pub fn schedule<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let synchronous = {
            let state = self.lock();
            state.max_threads == 0 || state.max_operations == 0
        };
        if synchronous {
            job();
            return;
        }

        let mut state = self.lock();
        if state.shutdown {
            return;
        }
        while state.queue.len() >= state.max_operations {
            state = self.inner.condvar.wait(state).unwrap_or_else(|e| e.into_inner());
            if state.shutdown {
                return;
            }
        }
        state.queue.push_back(Box::new(job));
        let spawn_new = state.live_threads < state.max_threads;
        if spawn_new {
            state.live_threads += 1;
        }
        drop(state);
        self.inner.condvar.notify_all();
        if spawn_new {
            let inner = Arc::clone(&self.inner);
            thread::spawn(move || worker_loop(&inner));
        }
    }

    /// Changes the maximum queue depth, waking any caller blocked in
    /// [`schedule`](Self::schedule).
    pub fn set_max_operations(&self, max_operations: usize) {
        self.lock().max_operations = max_operations;
        self.inner.condvar.notify_all();
    }

    /// Changes the maximum number of live worker threads.
    ///
    /// Raising the bound lets future [`schedule`](Self::schedule) calls
    /// spawn more workers; lowering it asks surplus idle or
    /// between-items workers to exit. Waits up to the configured shutdown
    /// deadline for `live_threads` to fall to the new bound before
    /// returning; workers that have not yet noticed keep running and will
    /// still exit on their next idle wakeup.
    pub fn set_max_threads(&self, max_threads: usize) {
        let deadline = Instant::now() + self.inner.shutdown_deadline;
        let mut state = self.lock();
        state.max_threads = max_threads;
        drop(state);
        self.inner.condvar.notify_all();

        let mut state = self.lock();
        while state.live_threads > max_threads {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let (guard, _timed_out) = self
                .inner
                .condvar
                .wait_timeout(state, remaining.min(Duration::from_millis(50)))
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }

    /// Blocks until the queue is empty and no item is running, or until
    /// `deadline` passes. Returns whether the pool fully drained.
    pub fn drain(&self, deadline: Instant) -> bool {
        let mut state = self.lock();
        loop {
            if state.queue.is_empty() && state.busy_threads == 0 {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _timed_out) = self
                .inner
                .condvar
                .wait_timeout(state, remaining.min(Duration::from_millis(50)))
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.lock().shutdown = true;
        self.inner.condvar.notify_all();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("WorkerPool")
            .field("max_threads", &state.max_threads)
            .field("max_operations", &state.max_operations)
            .field("live_threads", &state.live_threads)
            .field("queued", &state.queue.len())
            .field("suspended", &state.suspended)
            .finish()
    }
}

fn worker_loop(inner: &Arc<Inner>) {
    loop {
        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let job = loop {
            if state.shutdown || state.live_threads > state.max_threads {
                state.live_threads -= 1;
                inner.condvar.notify_all();
                return;
            }
            if !state.suspended {
                if let Some(job) = state.queue.pop_front() {
                    state.busy_threads += 1;
                    inner.condvar.notify_all();
                    break job;
                }
            }
            state = inner.condvar.wait(state).unwrap_or_else(|e| e.into_inner());
        };
        drop(state);

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            log::error!("worker pool job panicked: {}", panic_message(&payload));
        }

        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        state.busy_threads -= 1;
        drop(state);
        inner.condvar.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<alloc::string::String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
