//! GLOSSA Test Utilities
//!
//! Centralized test infrastructure for the GLOSSA workspace:
//! - Scripted and counting catalog sources for exercising the fallback chain
//! - Fixtures for common key sets and catalogs
//! - Proptest generators for locale keys

// Re-export core types for convenience
pub use glossa_core::{
    Catalog, DisposeError, GlossaError, GlossaResult, KeySet, LoadError, LocaleKey,
    RegistryError, ResourceKind, SourceAttempt, SourceError,
};
pub use glossa_loader::{LoadCache, LocalOverrides, Source, StaticSource};
pub use glossa_registry::{CleanupReport, ResourceId, ResourceRegistry};
pub use glossa_sched::{DebounceConfig, Debouncer, Throttle};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// FIXTURES
// ============================================================================

/// The key set used throughout GLOSSA tests: five known keys, "en" default.
pub fn test_key_set() -> KeySet {
    KeySet::new(["en", "ru", "fr", "tr", "de"], "en")
}

/// A small catalog whose greeting names the key it was built for.
pub fn test_catalog(key: &str) -> Catalog {
    Catalog::from_entries([
        ("greeting", format!("hello from {key}")),
        ("farewell", format!("goodbye from {key}")),
    ])
}

// ============================================================================
// SCRIPTED SOURCE
// ============================================================================

/// A source driven by a per-key script of outcomes.
///
/// Each fetch for a key pops the next scripted outcome; a key with an
/// exhausted (or absent) script reports itself unavailable. Tracks total
/// and per-key attempt counts.
pub struct ScriptedSource {
    name: String,
    script: Mutex<HashMap<LocaleKey, VecDeque<Result<Catalog, SourceError>>>>,
    attempts: AtomicUsize,
    attempts_by_key: Mutex<HashMap<LocaleKey, usize>>,
}

impl ScriptedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(HashMap::new()),
            attempts: AtomicUsize::new(0),
            attempts_by_key: Mutex::new(HashMap::new()),
        }
    }

    /// Queue an outcome for a key (builder style). Outcomes are consumed in
    /// the order they were queued.
    pub fn then(self, key: impl Into<LocaleKey>, outcome: Result<Catalog, SourceError>) -> Self {
        self.push(key, outcome);
        self
    }

    /// Queue an outcome for a key.
    pub fn push(&self, key: impl Into<LocaleKey>, outcome: Result<Catalog, SourceError>) {
        self.script
            .lock()
            .unwrap()
            .entry(key.into())
            .or_default()
            .push_back(outcome);
    }

    /// Queue a success serving [`test_catalog`] for the key.
    pub fn then_ok(self, key: &str) -> Self {
        let catalog = test_catalog(key);
        self.then(key, Ok(catalog))
    }

    /// Queue a transport failure for the key.
    pub fn then_unavailable(self, key: &str, reason: &str) -> Self {
        self.then(
            key,
            Err(SourceError::Unavailable {
                reason: reason.to_string(),
            }),
        )
    }

    /// Queue a malformed-payload failure for the key.
    pub fn then_invalid(self, key: &str, reason: &str) -> Self {
        self.then(
            key,
            Err(SourceError::InvalidPayload {
                reason: reason.to_string(),
            }),
        )
    }

    /// Total fetch attempts across all keys.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Fetch attempts for one key.
    pub fn attempts_for(&self, key: &str) -> usize {
        self.attempts_by_key
            .lock()
            .unwrap()
            .get(&LocaleKey::new(key))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Source for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, key: &LocaleKey) -> Result<Catalog, SourceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self
            .attempts_by_key
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert(0) += 1;

        self.script
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(SourceError::Unavailable {
                    reason: format!("script exhausted for '{key}'"),
                })
            })
    }
}

// ============================================================================
// COUNTING SOURCE
// ============================================================================

/// Wraps another source, counting how many fetches reach it.
pub struct CountingSource<S> {
    inner: S,
    attempts: AtomicUsize,
}

impl<S: Source> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: Source> Source for CountingSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, key: &LocaleKey) -> Result<Catalog, SourceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(key).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// An arbitrary short locale-like key ("xq", "pt-br").
    pub fn arb_locale_key() -> impl Strategy<Value = LocaleKey> {
        "[a-z]{2}(-[a-z]{2})?".prop_map(LocaleKey::new)
    }

    /// A key drawn from the [`test_key_set`] known set.
    pub fn arb_known_key() -> impl Strategy<Value = LocaleKey> {
        prop::sample::select(vec!["en", "ru", "fr", "tr", "de"]).prop_map(LocaleKey::new)
    }
}
