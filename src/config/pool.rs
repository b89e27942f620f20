//! [`WorkerPool`](crate::pool::WorkerPool) configuration.

extern crate alloc;

use super::{lookup, ConfigSource};
use crate::error::{PrimitiveError, Result};
use alloc::format;

/// Construction-time bounds for a [`WorkerPool`](crate::pool::WorkerPool).
#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolConfig {
    /// Upper bound on concurrently running worker threads. Zero means
    /// every `schedule` runs synchronously in the caller's thread.
    pub max_threads: usize,
    /// Upper bound on queued-but-not-started items. Zero means every
    /// `schedule` runs synchronously in the caller's thread.
    pub max_operations: usize,
    /// How long `set_max_threads` waits for a surplus worker to notice a
    /// shrink request and exit, in milliseconds, before giving up on a
    /// graceful shutdown of that worker.
    pub shutdown_deadline_ms: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        WorkerPoolConfig {
            max_threads: 2,
            max_operations: 100,
            shutdown_deadline_ms: 5_000,
        }
    }
}

impl WorkerPoolConfig {
    /// Builds a configuration by reading `{name}.max_threads`,
    /// `{name}.max_operations`, and `{name}.shutdown_deadline_ms` from
    /// `source`, falling back to [`Default`] for any key not present.
    pub fn from_source(source: &dyn ConfigSource, name: &str) -> Result<Self> {
        let mut config = WorkerPoolConfig::default();

        if let Some(raw) = lookup(source, name, "max_threads") {
            config.max_threads = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("{name}.max_threads is not a valid integer")))?;
        }
        if let Some(raw) = lookup(source, name, "max_operations") {
            config.max_operations = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("{name}.max_operations is not a valid integer")))?;
        }
        if let Some(raw) = lookup(source, name, "shutdown_deadline_ms") {
            config.shutdown_deadline_ms = raw.parse().map_err(|_| {
                PrimitiveError::invariant(format!("{name}.shutdown_deadline_ms is not a valid integer"))
            })?;
        }

        Ok(config)
    }
}
