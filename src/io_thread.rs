//! Registry of long-lived named I/O threads.
//!
//! [`IoThreadPool`] is deliberately independent of [`WorkerPool`](crate::pool::WorkerPool):
//! where the worker pool spawns short-lived workers to drain a bounded job
//! queue, an I/O thread pool holds a small, resizable set of long-running
//! threads that each run their own event loop (a reactor, a connection
//! handler) and are handed out by [`acquire`](IoThreadPool::acquire) on a
//! least-loaded basis. The two share no code or state, matching the
//! source's treatment of them as unrelated collaborators.
//!
//! Requires `std`: thread spawning and joining are inherently std-only.

#![cfg(feature = "std")]

extern crate alloc;

use crate::config::ConfigSource;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

/// Configuration key recognized by [`IoThreadPool::size_from_source`].
const IO_THREAD_POOL_SIZE_KEY: &str = "IOThreadPoolSize";

/// A single long-lived thread handle tracked by an [`IoThreadPool`].
///
/// Each handle carries a load counter the embedding application increments
/// and decrements around the work it hands to that thread; `acquire()` uses
/// this counter to pick the least-loaded thread.
pub struct IoThreadHandle {
    name: String,
    load: AtomicU64,
    join: Option<JoinHandle<()>>,
}

impl IoThreadHandle {
    /// The name this thread was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current load counter.
    pub fn load(&self) -> u64 {
        self.load.load(Ordering::Relaxed)
    }

    /// Increments the load counter; callers account for work handed to this
    /// thread (e.g. one per in-flight connection).
    pub fn enter(&self) {
        self.load.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the load counter.
    pub fn exit(&self) {
        self.load.fetch_sub(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for IoThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoThreadHandle")
            .field("name", &self.name)
            .field("load", &self.load())
            .finish()
    }
}

struct Registry {
    handles: Vec<Arc<IoThreadHandle>>,
    next_id: usize,
}

/// A resizable registry of named, long-lived threads.
///
/// The pool does not itself run anything on the threads it holds; it only
/// tracks them and hands out the least-loaded handle via
/// [`acquire`](Self::acquire). The embedding application is expected to give
/// each spawned thread its own event loop and to call
/// [`IoThreadHandle::enter`]/[`IoThreadHandle::exit`] around work it assigns.
pub struct IoThreadPool {
    name_prefix: String,
    registry: std::sync::Mutex<Registry>,
}

impl IoThreadPool {
    /// Creates a pool with `threads` long-lived threads registered up
    /// front, each running `spawn_body` (invoked once per thread, given no
    /// arguments; the closure is responsible for its own event loop and for
    /// returning when asked to stop is out of scope for this registry,
    /// matching the source's "the pool tracks threads, it does not
    /// orchestrate their shutdown protocol" stance).
    pub fn new<F>(name_prefix: &str, threads: usize, mut spawn_body: F) -> Self
    where
        F: FnMut() + Clone + Send + 'static,
    {
        let pool = IoThreadPool {
            name_prefix: String::from(name_prefix),
            registry: std::sync::Mutex::new(Registry {
                handles: Vec::new(),
                next_id: 0,
            }),
        };
        pool.set_threads_with(threads, &mut spawn_body);
        pool
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of threads currently registered.
    pub fn len(&self) -> usize {
        self.lock().handles.len()
    }

    /// `true` if no threads are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the least-loaded registered thread handle, or `None` if the
    /// pool holds no threads.
    pub fn acquire(&self) -> Option<Arc<IoThreadHandle>> {
        self.lock()
            .handles
            .iter()
            .min_by_key(|handle| handle.load())
            .cloned()
    }

    fn set_threads_with<F>(&self, threads: usize, spawn_body: &mut F)
    where
        F: FnMut() + Clone + Send + 'static,
    {
        let mut registry = self.lock();
        while registry.handles.len() < threads {
            let id = registry.next_id;
            registry.next_id += 1;
            let name = alloc::format!("{}-{id}", self.name_prefix);
            let body = spawn_body.clone();
            let join = thread::Builder::new()
                .name(name.clone())
                .spawn(body)
                .expect("failed to spawn io thread");
            registry.handles.push(Arc::new(IoThreadHandle {
                name,
                load: AtomicU64::new(0),
                join: Some(join),
            }));
        }
        while registry.handles.len() > threads {
            if let Some(handle) = registry.handles.pop() {
                drop_handle(handle);
            }
        }
    }

    /// Resizes the registry. Growing spawns new threads running `spawn_body`;
    /// shrinking drops the most recently registered threads, joining each
    /// after the `Arc` is no longer shared elsewhere (callers must release
    /// any outstanding [`Arc<IoThreadHandle>`] from [`acquire`](Self::acquire)
    /// for the join to observe thread exit promptly).
    pub fn set_threads<F>(&self, threads: usize, mut spawn_body: F)
    where
        F: FnMut() + Clone + Send + 'static,
    {
        self.set_threads_with(threads, &mut spawn_body);
    }

    /// Reads the shared I/O thread pool size from a configuration source,
    /// recognizing the bare key `IOThreadPoolSize`. Defaults to 0
    /// (no shared pool; callers run I/O synchronously).
    pub fn size_from_source(source: &dyn ConfigSource) -> usize {
        source
            .get(IO_THREAD_POOL_SIZE_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }
}

fn drop_handle(handle: Arc<IoThreadHandle>) {
    match Arc::try_unwrap(handle) {
        Ok(mut handle) => {
            if let Some(join) = handle.join.take() {
                let _ = join.join();
            }
        }
        Err(_shared) => {
            // Still referenced elsewhere (an in-flight `acquire()` caller);
            // the thread itself keeps running and is simply no longer
            // handed out by future `acquire()` calls.
        }
    }
}

impl fmt::Debug for IoThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoThreadPool")
            .field("name_prefix", &self.name_prefix)
            .field("len", &self.len())
            .finish()
    }
}
