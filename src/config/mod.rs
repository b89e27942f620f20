//! Capability-based configuration.
//!
//! Every primitive in this crate can be configured purely in memory: no
//! module here opens a file or reads an environment variable. A
//! [`ConfigSource`] is the capability an embedder plugs in to supply
//! configuration from wherever it already lives (a parsed TOML document, a
//! remote config service response, command-line flags); the crate only
//! ever asks it for string values by key.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;

pub mod cache;
pub mod fifo;
pub mod pool;

pub use cache::BoundedCacheConfig;
pub use fifo::FifoConfig;
pub use pool::WorkerPoolConfig;

/// A named source of string-valued configuration.
///
/// Deliberately minimal: one fallible-free lookup method, so any key/value
/// store an embedder already has (environment snapshot, parsed config
/// file, service response) can implement it with a single line.
pub trait ConfigSource {
    /// Looks up a single key's raw string value.
    fn get(&self, key: &str) -> Option<String>;
}

/// Looks up `{name}.{key}`, falling back to the bare `key` (an
/// instance-agnostic default) when the qualified form is absent.
pub(crate) fn lookup(source: &dyn ConfigSource, name: &str, key: &str) -> Option<String> {
    source
        .get(&alloc::format!("{name}.{key}"))
        .or_else(|| source.get(key))
}

/// The simplest [`ConfigSource`]: an in-memory sorted map. Used by the
/// crate's own tests and suitable for embedders who already parse their
/// configuration into key/value pairs before reaching this crate.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: BTreeMap<String, String>,
}

impl MapConfigSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_source_round_trips() {
        let source = MapConfigSource::new().with("cache.max_objects", "128");
        assert_eq!(source.get("cache.max_objects").as_deref(), Some("128"));
        assert_eq!(source.get("missing"), None);
    }

    #[test]
    fn lookup_prefers_qualified_then_falls_back_to_bare_key() {
        let source = MapConfigSource::new()
            .with("pages.max_objects", "64")
            .with("max_bytes", "2048");
        assert_eq!(lookup(&source, "pages", "max_objects").as_deref(), Some("64"));
        assert_eq!(lookup(&source, "pages", "max_bytes").as_deref(), Some("2048"));
        assert_eq!(lookup(&source, "pages", "lifetime_seconds"), None);
    }
}
