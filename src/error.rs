//! Crate-wide error type.
//!
//! Every fallible operation in this crate (the FIFO's timeout and capacity
//! checks, the skip list's bounds checks, duplicate names in the process
//! registries) returns [`PrimitiveError`] instead of a bespoke per-module
//! error type.
//!
//! This is a hand-written `Display`/`Error` impl rather than a derive from a
//! proc-macro crate such as `thiserror`: the crate root is `#![no_std]` with
//! an optional `std` feature, and `core::error::Error` was stabilized after
//! this crate's MSRV, so a manual impl keeps the error type usable from the
//! same `no_std` configurations as everything else here.

extern crate alloc;

use alloc::string::String;
use core::fmt;

/// The four error kinds named by the design: a timed-out wait, a violated
/// structural invariant, a misuse of a single-thread-only fast path, and a
/// resource (allocation) failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Cumulative wait time exceeded the configured timeout.
    Timeout {
        /// The timeout, in milliseconds, that was exceeded.
        timeout_ms: u64,
    },
    /// A structural precondition was violated (e.g. `put_all` with more
    /// items than the FIFO's capacity, an out-of-range skip-list index, a
    /// duplicate name registered twice).
    InvariantViolation {
        /// Human-readable detail describing which invariant was violated.
        detail: String,
    },
    /// An operation was attempted in a way the construction-time mode
    /// forbids (for example, calling the consumer-only fast path from a
    /// second consumer thread in a single-consumer FIFO).
    Misuse {
        /// Human-readable detail describing the misuse.
        detail: String,
    },
    /// The underlying allocator failed to satisfy a request.
    Resource,
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveError::Timeout { timeout_ms } => {
                write!(f, "operation timed out after {timeout_ms} ms")
            }
            PrimitiveError::InvariantViolation { detail } => {
                write!(f, "invariant violated: {detail}")
            }
            PrimitiveError::Misuse { detail } => write!(f, "misuse: {detail}"),
            PrimitiveError::Resource => write!(f, "allocation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PrimitiveError {}

impl PrimitiveError {
    /// Builds an [`PrimitiveError::InvariantViolation`] from any displayable detail.
    pub fn invariant(detail: impl Into<String>) -> Self {
        PrimitiveError::InvariantViolation {
            detail: detail.into(),
        }
    }

    /// Builds a [`PrimitiveError::Misuse`] from any displayable detail.
    pub fn misuse(detail: impl Into<String>) -> Self {
        PrimitiveError::Misuse {
            detail: detail.into(),
        }
    }
}

/// Convenience alias used throughout the crate's fallible APIs.
pub type Result<T> = core::result::Result<T, PrimitiveError>;
