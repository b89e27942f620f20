//! Low-level performance primitives for embedding in a larger application:
//! a bounded, TTL-aware cache with pluggable eviction advice, a
//! single-writer FIFO ring that can run lock-free or mutex-backed, an
//! index-addressed skip list, and a bounded worker thread pool.
//!
//! None of these types choose a concurrency story for you beyond what
//! their construction-time configuration says: [`cache::BoundedCache`] and
//! [`skiplist::IndexedSkipList`] expect single-writer use (wrap them
//! yourself, or reach for [`cache::shared::SharedBoundedCache`] under the
//! `concurrent` feature), [`fifo::FifoRing`] picks a lock-free or
//! lock-based internal representation from its configuration, and
//! [`pool::WorkerPool`] is safe to share via `Arc` by design.
//!
//! ## Feature flags
//!
//! - `std` (default): enables the worker pool, the process-global name
//!   registry, the I/O thread registry, the interning table, and
//!   `log`-backed diagnostics. Disabling it leaves a `no_std` + `alloc`
//!   core: the cache, FIFO ring (single-producer/single-consumer mode
//!   only), skip list, ticker, and throughput accounting.
//! - `concurrent`: pulls in `parking_lot` for the FIFO ring's
//!   multi-producer/multi-consumer mode and for [`cache::shared::SharedBoundedCache`].
//! - `hashbrown` (default): backs [`cache::BoundedCache`]'s key lookup
//!   table; without it callers must supply their own `S: BuildHasher`.
//!
//! ## Modules
//!
//! - [`error`]: the shared error and result types every fallible operation
//!   in this crate returns.
//! - [`ticker`]: a monotonic whole-seconds clock driving cache expiry and
//!   throughput window rollover.
//! - [`config`]: capability-based configuration (a [`config::ConfigSource`]
//!   the embedder implements) for every primitive below.
//! - [`cache`]: the bounded, TTL-aware LRU cache.
//! - [`fifo`]: the bounded FIFO ring.
//! - [`skiplist`]: the index-addressed skip list.
//! - [`pool`]: the bounded worker thread pool (requires `std`).
//! - [`registry`]: process-global lookup of live, named caches and FIFOs
//!   (requires `std`).
//! - [`uniquer`]: content-addressed interning (requires `std`).
//! - [`throughput`]: per-thread event-duration accounting.
//! - [`io_thread`]: a registry of long-lived named I/O threads, unrelated
//!   to [`pool::WorkerPool`] (requires `std`).

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

/// The shared error and result types every fallible operation returns.
pub mod error;

/// A monotonic whole-seconds clock.
pub mod ticker;

/// Intrusive doubly-linked list backing the cache's recency order.
///
/// Internal infrastructure: exposes raw-pointer operations that require
/// careful invariant maintenance. Use [`cache::BoundedCache`] instead of
/// reaching for this directly.
pub(crate) mod list;

/// Capability-based configuration for every primitive in this crate.
pub mod config;

/// The bounded, TTL-aware LRU cache.
pub mod cache;

/// The bounded FIFO ring.
pub mod fifo;

/// The index-addressed probabilistic skip list.
pub mod skiplist;

/// The bounded worker thread pool.
///
/// Available when the `std` feature is enabled.
#[cfg(feature = "std")]
pub mod pool;

/// Process-global registry of live, named caches and FIFOs.
///
/// Available when the `std` feature is enabled.
#[cfg(feature = "std")]
pub mod registry;

/// Content-addressed interning of immutable values.
///
/// Available when the `std` feature is enabled.
#[cfg(feature = "std")]
pub mod uniquer;

/// Per-thread event-duration accounting bucketed into time windows.
pub mod throughput;

/// Registry of long-lived named I/O threads.
///
/// Available when the `std` feature is enabled.
#[cfg(feature = "std")]
pub mod io_thread;

pub use cache::BoundedCache;
pub use error::{PrimitiveError, Result};
pub use fifo::FifoRing;
#[cfg(feature = "std")]
pub use pool::WorkerPool;
pub use skiplist::IndexedSkipList;
pub use ticker::Ticker;
