//! [`FifoRing`](crate::fifo::FifoRing) configuration.

extern crate alloc;

use super::ConfigSource;
use crate::error::{PrimitiveError, Result};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::num::NonZeroUsize;

/// Default slot count when `FIFOCapacity.N` is not configured.
const DEFAULT_CAPACITY: usize = 1000;

/// Looks up `{key}.{name}`, falling back to the bare `key` when the
/// per-instance form is absent. The FIFO configuration keys are named
/// `FIFOCapacity`/`FIFOGranularity`/etc. with the instance name as the
/// suffix, the reverse of the `{name}.{key}` convention the other
/// per-primitive config structs use.
fn lookup(source: &dyn ConfigSource, key: &str, name: &str) -> Option<String> {
    source.get(&format!("{key}.{name}")).or_else(|| source.get(key))
}

/// Construction-time parameters for a [`FifoRing`](crate::fifo::FifoRing).
#[derive(Debug, Clone)]
pub struct FifoConfig {
    /// Slot capacity `C`.
    pub capacity: NonZeroUsize,
    /// Wait-step cap `G`, in milliseconds, used by the blocking back-off.
    pub granularity_ms: u64,
    /// Cumulative wait timeout `T`, in milliseconds. Zero means infinite.
    pub timeout_ms: u64,
    /// Whether more than one thread may call the producer-side operations.
    pub multi_producer: bool,
    /// Whether more than one thread may call the consumer-side operations.
    pub multi_consumer: bool,
    /// Ascending wait-duration boundaries, in seconds, used to bucket the
    /// wait-time histogram. Empty disables the histogram.
    pub histogram_boundaries_secs: Vec<f64>,
}

impl FifoConfig {
    /// A single-producer/single-consumer ring of the given capacity, no
    /// timeout, 10ms granularity, and no histogram.
    pub fn spsc(capacity: NonZeroUsize) -> Self {
        FifoConfig {
            capacity,
            granularity_ms: 10,
            timeout_ms: 0,
            multi_producer: false,
            multi_consumer: false,
            histogram_boundaries_secs: Vec::new(),
        }
    }

    /// Builds a configuration by reading `FIFOCapacity.{name}` (default
    /// 1000), `FIFOGranularity.{name}` (default 0), `FIFOTimeout.{name}`
    /// (default 0), `FIFOSingleProducer.{name}`/`FIFOSingleConsumer.{name}`
    /// (each default `false`, meaning multi/locked unless a side is
    /// explicitly pinned to a single thread), and `FIFOBoundaries.{name}`
    /// (a comma-separated list of ascending second boundaries) from
    /// `source`. Any key missing its `.{name}` qualifier falls back to the
    /// bare key.
    pub fn from_source(source: &dyn ConfigSource, name: &str) -> Result<Self> {
        let capacity = match lookup(source, "FIFOCapacity", name) {
            Some(raw) => {
                let capacity: usize = raw
                    .parse()
                    .map_err(|_| PrimitiveError::invariant(format!("FIFOCapacity.{name} is not a valid integer")))?;
                NonZeroUsize::new(capacity)
                    .ok_or_else(|| PrimitiveError::invariant(format!("FIFOCapacity.{name} must be nonzero")))?
            }
            None => NonZeroUsize::new(DEFAULT_CAPACITY).expect("default capacity is nonzero"),
        };

        let mut granularity_ms = 0;
        if let Some(raw) = lookup(source, "FIFOGranularity", name) {
            granularity_ms = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("FIFOGranularity.{name} is not a valid integer")))?;
        }

        let mut timeout_ms = 0;
        if let Some(raw) = lookup(source, "FIFOTimeout", name) {
            timeout_ms = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("FIFOTimeout.{name} is not a valid integer")))?;
        }

        let mut single_producer = false;
        if let Some(raw) = lookup(source, "FIFOSingleProducer", name) {
            single_producer = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("FIFOSingleProducer.{name} is not a valid boolean")))?;
        }

        let mut single_consumer = false;
        if let Some(raw) = lookup(source, "FIFOSingleConsumer", name) {
            single_consumer = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("FIFOSingleConsumer.{name} is not a valid boolean")))?;
        }

        let mut histogram_boundaries_secs = Vec::new();
        if let Some(raw) = lookup(source, "FIFOBoundaries", name) {
            for part in raw.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let boundary: f64 = part
                    .parse()
                    .map_err(|_| PrimitiveError::invariant(format!("FIFOBoundaries.{name} contains a non-numeric entry")))?;
                histogram_boundaries_secs.push(boundary);
            }
        }

        Ok(FifoConfig {
            capacity,
            granularity_ms,
            timeout_ms,
            multi_producer: !single_producer,
            multi_consumer: !single_consumer,
            histogram_boundaries_secs,
        })
    }
}
