//! The catalog source seam and the embedded static source.

use async_trait::async_trait;
use glossa_core::{Catalog, LocaleKey, SourceError};
use std::collections::HashMap;

/// A producer capable of attempting to resolve a catalog for a key.
///
/// Implementations must be thread-safe (`Send + Sync`). A source fails by
/// returning an error; the chain recovers by trying the next source, so a
/// failure here is cheap and expected.
#[async_trait]
pub trait Source: Send + Sync {
    /// The source's name, used to attribute failures in the aggregated
    /// error a caller eventually sees.
    fn name(&self) -> &str;

    /// Attempt to produce a validated catalog for `key`.
    async fn fetch(&self, key: &LocaleKey) -> Result<Catalog, SourceError>;
}

/// A source serving catalogs from an owned in-memory map.
///
/// This is the embedded-fallback analogue of bundled translations: the last
/// chain element that ships with the binary and cannot suffer transport
/// failures, only missing keys.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    catalogs: HashMap<LocaleKey, Catalog>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalogs: HashMap::new(),
        }
    }

    /// Add a catalog for a key (builder style).
    pub fn with_catalog(mut self, key: impl Into<LocaleKey>, catalog: Catalog) -> Self {
        self.catalogs.insert(key.into(), catalog);
        self
    }

    /// Number of keys this source can serve.
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

#[async_trait]
impl Source for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, key: &LocaleKey) -> Result<Catalog, SourceError> {
        self.catalogs
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable {
                reason: format!("no embedded catalog for '{key}'"),
            })
    }
}
