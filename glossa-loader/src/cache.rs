//! Keyed async catalog cache with in-flight deduplication and ordered
//! fallback.
//!
//! The cache owns two maps behind one lock: resolved catalogs and in-flight
//! requests. The lock is only ever held across synchronous map operations,
//! never across an await point; on the tokio runtime this makes the
//! initiation and settlement steps atomic with respect to each other.
//!
//! A load miss spawns a detached driver task that walks the source chain.
//! Concurrent callers for the same key subscribe to the driver's broadcast
//! channel instead of starting a second request, and a caller dropping its
//! future does not cancel the attempt.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use glossa_core::{
    Catalog, GlossaResult, KeySet, LoadError, LocaleKey, SourceAttempt,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::overrides::LocalOverrides;
use crate::source::Source;

/// Shared outcome of one in-flight request. `Clone` on both sides so every
/// deduplicated waiter receives the same value.
type LoadOutcome = Result<Arc<Catalog>, LoadError>;

/// What the chain produced, before the settlement step decides whether to
/// cache it. `rescued` marks a catalog that came from the default-key
/// rescue and therefore must not be cached under the requested key.
struct ChainSuccess {
    catalog: Arc<Catalog>,
    rescued: bool,
}

#[derive(Default)]
struct CacheState {
    resolved: HashMap<LocaleKey, Arc<Catalog>>,
    in_flight: HashMap<LocaleKey, broadcast::Sender<LoadOutcome>>,
}

struct CacheInner {
    keys: KeySet,
    overrides: LocalOverrides,
    sources: Vec<Arc<dyn Source>>,
    state: Mutex<CacheState>,
}

/// Keyed cache of asynchronously loaded catalogs.
///
/// Cheap to clone; clones share the same cache, override map, and source
/// chain. Construct one instance per session context and tear it down with
/// the session (no global singletons).
///
/// # Example
///
/// ```ignore
/// let cache = LoadCache::new(
///     KeySet::new(["en", "ru", "fr"], "en"),
///     vec![
///         Arc::new(RemoteJsonSource::new("primary", "https://cdn.example.com/locales")),
///         Arc::new(RemoteJsonSource::new("secondary", "https://mirror.example.com/i18n")),
///     ],
/// );
/// let catalog = cache.load("ru").await?;
/// ```
#[derive(Clone)]
pub struct LoadCache {
    inner: Arc<CacheInner>,
}

impl LoadCache {
    /// Create a cache over a key set and an ordered source chain. Sources
    /// are tried in the given order; earlier sources outrank later ones.
    pub fn new(keys: KeySet, sources: Vec<Arc<dyn Source>>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                keys,
                overrides: LocalOverrides::new(),
                sources,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// The synchronous override map, always consulted before the chain.
    pub fn overrides(&self) -> &LocalOverrides {
        &self.inner.overrides
    }

    /// The key set this cache resolves against.
    pub fn key_set(&self) -> &KeySet {
        &self.inner.keys
    }

    /// Load the catalog for `raw_key`.
    ///
    /// Unknown keys are substituted with the default key before resolution
    /// begins. A resolved entry is returned with no I/O; an in-flight
    /// request for the same key is shared rather than duplicated; otherwise
    /// the source chain is driven in priority order and the first valid
    /// catalog wins. If every source fails for a non-default key, the
    /// default key is attempted once as a last resort.
    ///
    /// # Errors
    /// [`LoadError::AllSourcesExhausted`] when the chain (and the
    /// default-key rescue, where applicable) produced nothing. The error
    /// lists every per-source cause and records whether the requested key
    /// was substituted. Failures are never cached; a later call retries.
    pub async fn load(&self, raw_key: &str) -> GlossaResult<Arc<Catalog>> {
        let normalized = self.inner.keys.normalize(raw_key);
        if normalized.substituted {
            debug!(requested = raw_key, default = %normalized.key, "unknown key substituted");
        }

        // Overrides are synchronous and never enter the dedup bookkeeping.
        if let Some(catalog) = self.inner.overrides.get(&normalized.key) {
            debug!(key = %normalized.key, "local override hit");
            return Ok(catalog);
        }

        let requested = normalized
            .substituted
            .then(|| LocaleKey::new(raw_key));
        let outcome = self.load_entry(normalized.key, requested).await;
        outcome.map_err(Into::into)
    }

    /// Drop the resolved entry for a key, forcing the next load to drive
    /// the chain again. Returns true if an entry was present. An in-flight
    /// request is unaffected.
    pub fn invalidate(&self, key: &str) -> bool {
        let key = LocaleKey::new(key);
        self.lock_state().resolved.remove(&key).is_some()
    }

    /// Whether a resolved entry exists for the key. The key is matched as
    /// given (case-folded, no default substitution).
    pub fn is_cached(&self, key: &str) -> bool {
        self.lock_state().resolved.contains_key(&LocaleKey::new(key))
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.lock_state().resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The critical sections never panic, so a poisoned lock can only mean
    /// a panic in this module; recover the guard rather than wedge every
    /// caller.
    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve `key` through the cache, the in-flight map, or a fresh
    /// driver, in that order. `requested` carries the original key when a
    /// substitution occurred, for error attribution only.
    async fn load_entry(
        &self,
        key: LocaleKey,
        requested: Option<LocaleKey>,
    ) -> Result<Arc<Catalog>, LoadError> {
        enum Role {
            Hit(Arc<Catalog>),
            Waiter(broadcast::Receiver<LoadOutcome>),
            Initiator(broadcast::Receiver<LoadOutcome>),
        }

        let role = {
            let mut state = self.lock_state();
            if let Some(catalog) = state.resolved.get(&key) {
                Role::Hit(catalog.clone())
            } else if let Some(tx) = state.in_flight.get(&key) {
                Role::Waiter(tx.subscribe())
            } else {
                let (tx, rx) = broadcast::channel(1);
                state.in_flight.insert(key.clone(), tx);
                Role::Initiator(rx)
            }
        };

        let mut rx = match role {
            Role::Hit(catalog) => {
                debug!(key = %key, "catalog cache hit");
                return Ok(catalog);
            }
            Role::Waiter(rx) => {
                debug!(key = %key, "joining in-flight request");
                rx
            }
            Role::Initiator(rx) => {
                self.spawn_driver(key.clone(), requested);
                rx
            }
        };

        rx.recv()
            .await
            .unwrap_or_else(|_| Err(driver_vanished(key)))
    }

    /// Spawn the detached task that drives the chain and settles the
    /// in-flight entry. Detachment is what makes a started attempt run to
    /// completion even when every interested caller has gone away.
    fn spawn_driver(&self, key: LocaleKey, requested: Option<LocaleKey>) {
        let cache = self.clone();
        // Erase the future type: the driver recursively re-enters
        // `load_entry` for the default-key rescue.
        let driver: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
            let outcome = cache.drive_chain(&key, requested).await;

            let (tx, shared) = {
                let mut state = cache.lock_state();
                // The in-flight entry must be gone before any result is
                // visible, so a failed request is retried rather than
                // observed as pending forever.
                let tx = state.in_flight.remove(&key);
                let shared = match outcome {
                    Ok(ChainSuccess { catalog, rescued }) => {
                        if !rescued {
                            state.resolved.insert(key.clone(), catalog.clone());
                        }
                        Ok(catalog)
                    }
                    Err(err) => Err(err),
                };
                (tx, shared)
            };

            if let Some(tx) = tx {
                // No receivers means every caller abandoned interest; the
                // cache is already populated for future ones.
                let _ = tx.send(shared);
            }
        });
        tokio::spawn(driver);
    }

    /// Walk the source chain for `key`; on exhaustion, attempt the default
    /// key once through the deduplicated path. The default key never
    /// re-enters the rescue, which bounds the recursion to depth one.
    async fn drive_chain(
        &self,
        key: &LocaleKey,
        requested: Option<LocaleKey>,
    ) -> Result<ChainSuccess, LoadError> {
        let mut attempts = Vec::with_capacity(self.inner.sources.len());

        for source in &self.inner.sources {
            match source.fetch(key).await {
                Ok(catalog) => {
                    debug!(key = %key, source = source.name(), "source resolved catalog");
                    return Ok(ChainSuccess {
                        catalog: Arc::new(catalog),
                        rescued: false,
                    });
                }
                Err(error) => {
                    warn!(key = %key, source = source.name(), %error, "source attempt failed");
                    attempts.push(SourceAttempt {
                        source: source.name().to_string(),
                        error,
                    });
                }
            }
        }

        let default = self.inner.keys.default_key().clone();
        if *key != default {
            debug!(key = %key, default = %default, "chain exhausted, attempting default key");
            // The rescue resolves the default key the same way `load` would:
            // the synchronous override map outranks the chain here too.
            if let Some(catalog) = self.inner.overrides.get(&default) {
                debug!(key = %default, "local override hit");
                return Ok(ChainSuccess {
                    catalog,
                    rescued: true,
                });
            }
            return match self.load_entry(default, None).await {
                Ok(catalog) => Ok(ChainSuccess {
                    catalog,
                    rescued: true,
                }),
                Err(fallback) => Err(LoadError::AllSourcesExhausted {
                    key: key.clone(),
                    requested,
                    attempts,
                    fallback: Some(Box::new(fallback)),
                }),
            };
        }

        Err(LoadError::AllSourcesExhausted {
            key: key.clone(),
            requested,
            attempts,
            fallback: None,
        })
    }
}

impl std::fmt::Debug for LoadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("LoadCache")
            .field("keys", &self.inner.keys)
            .field("sources", &self.inner.sources.len())
            .field("resolved", &state.resolved.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

/// The driver settled without publishing an outcome. This cannot happen
/// through the normal settlement path; surface it as an exhaustion with a
/// synthetic cause rather than hang or panic.
fn driver_vanished(key: LocaleKey) -> LoadError {
    LoadError::AllSourcesExhausted {
        key,
        requested: None,
        attempts: vec![SourceAttempt {
            source: "in-flight request".to_string(),
            error: glossa_core::SourceError::Unavailable {
                reason: "request driver dropped before settling".to_string(),
            },
        }],
        fallback: None,
    }
}
