//! Process-global registry of live, named caches and FIFOs.
//!
//! Mirrors the "list every live cache/FIFO by name" capability the design
//! calls for (§6/§9.1), replacing the source's global per-thread
//! registries with a single explicit, lock-guarded table any thread may
//! query. Requires `std` for the one-time initialization primitive.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use std::sync::{Mutex, OnceLock};

use crate::error::{PrimitiveError, Result};

#[derive(Default)]
struct Registry {
    /// Cache names, reference-counted: caches may share a display name.
    caches: BTreeMap<String, usize>,
    /// FIFO names, strictly unique: a duplicate is a construction error.
    fifos: BTreeSet<String>,
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Registry::default()))
}

/// Registers a cache name. Cache names are not required to be unique;
/// repeated registrations are reference-counted.
pub(crate) fn register_cache(name: &str) {
    let mut reg = registry().lock().unwrap_or_else(|e| e.into_inner());
    *reg.caches.entry(String::from(name)).or_insert(0) += 1;
}

/// Unregisters one reference to a cache name.
pub(crate) fn unregister_cache(name: &str) {
    let mut reg = registry().lock().unwrap_or_else(|e| e.into_inner());
    if let Some(count) = reg.caches.get_mut(name) {
        *count -= 1;
        if *count == 0 {
            reg.caches.remove(name);
        }
    }
}

/// Registers a FIFO name, failing if the name is already live.
pub(crate) fn register_fifo(name: &str) -> Result<()> {
    let mut reg = registry().lock().unwrap_or_else(|e| e.into_inner());
    if !reg.fifos.insert(String::from(name)) {
        return Err(PrimitiveError::invariant(alloc::format!(
            "a FIFO named '{name}' is already registered"
        )));
    }
    Ok(())
}

/// Unregisters a FIFO name.
pub(crate) fn unregister_fifo(name: &str) {
    let mut reg = registry().lock().unwrap_or_else(|e| e.into_inner());
    reg.fifos.remove(name);
}

/// A point-in-time snapshot of every live, named cache and FIFO.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Names of currently-registered caches (duplicates collapsed).
    pub caches: Vec<String>,
    /// Names of currently-registered FIFOs.
    pub fifos: Vec<String>,
}

/// Returns every currently-registered cache and FIFO name.
pub fn snapshot() -> RegistrySnapshot {
    let reg = registry().lock().unwrap_or_else(|e| e.into_inner());
    RegistrySnapshot {
        caches: reg.caches.keys().cloned().collect(),
        fifos: reg.fifos.iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_fifo_name_is_rejected() {
        let name = "registry-test-fifo-unique-name";
        unregister_fifo(name);
        register_fifo(name).unwrap();
        assert!(register_fifo(name).is_err());
        unregister_fifo(name);
    }

    #[test]
    fn cache_names_are_reference_counted() {
        let name = "registry-test-cache-shared-name";
        register_cache(name);
        register_cache(name);
        unregister_cache(name);
        assert!(snapshot().caches.contains(&String::from(name)));
        unregister_cache(name);
        assert!(!snapshot().caches.contains(&String::from(name)));
    }
}
