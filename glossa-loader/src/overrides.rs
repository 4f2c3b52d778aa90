//! Synchronous local override lookup.

use glossa_core::{Catalog, LocaleKey};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory catalog overrides, consulted before the remote chain.
///
/// An override hit short-circuits resolution entirely: it has no I/O
/// latency, so it participates in neither the resolved cache nor the
/// in-flight deduplication bookkeeping. Thread-safe via `RwLock`.
#[derive(Debug, Default)]
pub struct LocalOverrides {
    entries: RwLock<HashMap<LocaleKey, Arc<Catalog>>>,
}

impl LocalOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the override for a key.
    pub fn insert(&self, key: impl Into<LocaleKey>, catalog: Catalog) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), Arc::new(catalog));
        }
    }

    /// Look up the override for a key.
    pub fn get(&self, key: &LocaleKey) -> Option<Arc<Catalog>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    /// Remove the override for a key. Returns true if one was present.
    pub fn remove(&self, key: &LocaleKey) -> bool {
        self.entries
            .write()
            .map(|mut entries| entries.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Number of installed overrides.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
