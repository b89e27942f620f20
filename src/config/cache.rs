//! [`BoundedCache`](crate::cache::BoundedCache) configuration.

extern crate alloc;

use super::{lookup, ConfigSource};
use crate::error::{PrimitiveError, Result};
use alloc::format;
use alloc::string::{String, ToString};

/// Construction-time budgets and defaults for a
/// [`BoundedCache`](crate::cache::BoundedCache).
#[derive(Debug, Clone)]
pub struct BoundedCacheConfig {
    /// Maximum number of entries. Zero means unbounded by count.
    pub max_objects: usize,
    /// Maximum sum of `size_bytes` across all entries. Zero means
    /// unbounded by size (and skips the size-query capability entirely).
    pub max_bytes: u64,
    /// Default entry lifetime in seconds. Zero means entries never expire.
    pub lifetime_seconds: u64,
    /// Optional name surfaced in [`CacheDescription`](crate::cache::metrics::CacheDescription)
    /// and log lines.
    pub name: Option<String>,
}

impl Default for BoundedCacheConfig {
    fn default() -> Self {
        BoundedCacheConfig {
            max_objects: 1024,
            max_bytes: 0,
            lifetime_seconds: 0,
            name: None,
        }
    }
}

impl BoundedCacheConfig {
    /// Builds a configuration by reading `{name}.max_objects`,
    /// `{name}.max_bytes`, and `{name}.lifetime_seconds` from `source`. A
    /// key missing its `{name}.` qualifier falls back to the bare key
    /// (letting an embedder set an instance-agnostic default), then to
    /// [`Default`].
    pub fn from_source(source: &dyn ConfigSource, name: &str) -> Result<Self> {
        let mut config = BoundedCacheConfig {
            name: Some(name.to_string()),
            ..Default::default()
        };

        if let Some(raw) = lookup(source, name, "max_objects") {
            config.max_objects = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("{name}.max_objects is not a valid integer")))?;
        }
        if let Some(raw) = lookup(source, name, "max_bytes") {
            config.max_bytes = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("{name}.max_bytes is not a valid integer")))?;
        }
        if let Some(raw) = lookup(source, name, "lifetime_seconds") {
            config.lifetime_seconds = raw
                .parse()
                .map_err(|_| PrimitiveError::invariant(format!("{name}.lifetime_seconds is not a valid integer")))?;
        }

        Ok(config)
    }
}
