//! GLOSSA Registry - Deterministic Resource Release
//!
//! Tracks disposable handles (observers, listeners, timers, frame
//! callbacks) from registration to release, so one [`cleanup`] call at
//! teardown releases everything a session wired up. Release is best-effort
//! and total: a failing disposer is logged and collected, never allowed to
//! block release of the rest.
//!
//! Scoped to one session instance; construct a registry per context and
//! call [`cleanup`] at unload. No persisted or global state.
//!
//! [`cleanup`]: ResourceRegistry::cleanup

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use glossa_core::{DisposeError, RegistryError, ResourceKind};

/// Opaque identifier for a registered disposable, usable for selective
/// [`ResourceRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The action that releases one registered resource.
pub type Disposer = Box<dyn FnOnce() -> Result<(), DisposeError> + Send>;

struct Entry {
    kind: ResourceKind,
    label: Option<String>,
    disposer: Disposer,
}

/// One disposer failure absorbed during [`ResourceRegistry::cleanup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub label: Option<String>,
    pub error: DisposeError,
}

/// Outcome of one [`ResourceRegistry::cleanup`] pass.
///
/// `released + failures.len()` equals the number of entries that were
/// registered when cleanup began; every one of them was attempted exactly
/// once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries whose disposers succeeded.
    pub released: usize,
    /// Entries whose disposers failed, with their causes.
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// Whether every disposer succeeded.
    pub fn is_total(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of entries attempted in this pass.
    pub fn attempted(&self) -> usize {
        self.released + self.failures.len()
    }
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

/// Registry of disposable handles with guaranteed, idempotent teardown.
///
/// Registration returns a [`ResourceId`] for selective removal; `cleanup`
/// drains every entry in registration order. Disposers must not register
/// new entries (a disposer runs after the registry has already drained, so
/// anything it registers is only released by a subsequent cleanup pass).
#[derive(Default)]
pub struct ResourceRegistry {
    state: Mutex<RegistryState>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a disposable of the given kind. The optional label shows up
    /// in logs and cleanup failures.
    pub fn register(
        &self,
        kind: ResourceKind,
        label: Option<String>,
        disposer: impl FnOnce() -> Result<(), DisposeError> + Send + 'static,
    ) -> ResourceId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.entries.insert(
            id,
            Entry {
                kind,
                label,
                disposer: Box::new(disposer),
            },
        );
        debug!(id, %kind, "resource registered");
        ResourceId(id)
    }

    /// Register an observer handle.
    pub fn register_observer(
        &self,
        disposer: impl FnOnce() -> Result<(), DisposeError> + Send + 'static,
    ) -> ResourceId {
        self.register(ResourceKind::Observer, None, disposer)
    }

    /// Register an event listener. The label conventionally names the
    /// target and event ("document:visibilitychange").
    pub fn register_listener(
        &self,
        label: impl Into<String>,
        disposer: impl FnOnce() -> Result<(), DisposeError> + Send + 'static,
    ) -> ResourceId {
        self.register(ResourceKind::Listener, Some(label.into()), disposer)
    }

    /// Register a repeating timer.
    pub fn register_interval(
        &self,
        disposer: impl FnOnce() -> Result<(), DisposeError> + Send + 'static,
    ) -> ResourceId {
        self.register(ResourceKind::Interval, None, disposer)
    }

    /// Register a one-shot timer.
    pub fn register_timeout(
        &self,
        disposer: impl FnOnce() -> Result<(), DisposeError> + Send + 'static,
    ) -> ResourceId {
        self.register(ResourceKind::Timeout, None, disposer)
    }

    /// Register a frame-rate callback subscription.
    pub fn register_animation_frame(
        &self,
        disposer: impl FnOnce() -> Result<(), DisposeError> + Send + 'static,
    ) -> ResourceId {
        self.register(ResourceKind::AnimationFrame, None, disposer)
    }

    /// Register a spawned task under the given kind; disposal aborts it.
    /// This is the runtime analogue of clearing a timer handle.
    pub fn register_task<T: Send + 'static>(
        &self,
        kind: ResourceKind,
        label: Option<String>,
        handle: JoinHandle<T>,
    ) -> ResourceId {
        self.register(kind, label, move || {
            handle.abort();
            Ok(())
        })
    }

    /// Dispose and unregister one entry.
    ///
    /// Returns `None` if the id is unknown (already removed or cleaned up),
    /// otherwise the disposer's outcome with the entry's kind attached. A
    /// failure is logged but the entry is unregistered either way — release
    /// is attempted exactly once.
    pub fn remove(&self, id: ResourceId) -> Option<Result<(), RegistryError>> {
        let entry = self.lock().entries.remove(&id.0)?;
        let result = (entry.disposer)().map_err(|error| {
            warn!(%id, kind = %entry.kind, label = entry.label.as_deref(), %error,
                "disposer failed during remove");
            RegistryError::DisposeFailed {
                kind: entry.kind,
                error,
            }
        });
        Some(result)
    }

    /// Release every registered disposable, in registration order.
    ///
    /// Individual disposer failures are logged and collected in the report;
    /// one bad handle never blocks release of the rest. Safe to call
    /// multiple times and with zero registrations — a second pass releases
    /// nothing and reports no failures.
    pub fn cleanup(&self) -> CleanupReport {
        // Drain under the lock, dispose outside it: a disposer that blocks
        // cannot wedge concurrent registration, and a drained entry can
        // never be released twice.
        let entries = std::mem::take(&mut self.lock().entries);

        let mut report = CleanupReport::default();
        for (id, entry) in entries {
            match (entry.disposer)() {
                Ok(()) => report.released += 1,
                Err(error) => {
                    warn!(id, kind = %entry.kind, label = entry.label.as_deref(), %error,
                        "disposer failed during cleanup");
                    report.failures.push(CleanupFailure {
                        id: ResourceId(id),
                        kind: entry.kind,
                        label: entry.label,
                        error,
                    });
                }
            }
        }

        debug!(
            released = report.released,
            failed = report.failures.len(),
            "registry cleanup complete"
        );
        report
    }

    /// Number of currently registered disposables.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the id is currently registered.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.lock().entries.contains_key(&id.0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        // Disposers never run under this lock, so poisoning is unreachable
        // from user code; recover rather than wedge teardown.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("registered", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_disposer(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> Result<(), DisposeError> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_cleanup_releases_all_kinds_exactly_once_and_is_idempotent() {
        let registry = ResourceRegistry::new();
        let released = Arc::new(AtomicUsize::new(0));

        registry.register_observer(counting_disposer(&released));
        registry.register_listener("document:click", counting_disposer(&released));
        registry.register_interval(counting_disposer(&released));
        registry.register_timeout(counting_disposer(&released));
        registry.register_animation_frame(counting_disposer(&released));
        assert_eq!(registry.len(), 5);

        let report = registry.cleanup();
        assert_eq!(report.released, 5);
        assert!(report.is_total());
        assert_eq!(released.load(Ordering::SeqCst), 5);
        assert!(registry.is_empty());

        // Second pass: nothing released, nothing failed.
        let report = registry.cleanup();
        assert_eq!(report.attempted(), 0);
        assert_eq!(released.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_cleanup_on_empty_registry_is_safe() {
        let registry = ResourceRegistry::new();
        let report = registry.cleanup();
        assert_eq!(report.attempted(), 0);
        assert!(report.is_total());
    }

    #[test]
    fn test_failing_disposer_does_not_block_the_rest() {
        let registry = ResourceRegistry::new();
        let released = Arc::new(AtomicUsize::new(0));

        registry.register_observer(counting_disposer(&released));
        let bad = registry.register_listener("window:scroll", || {
            Err(DisposeError::new("handle already detached"))
        });
        registry.register_interval(counting_disposer(&released));

        let report = registry.cleanup();
        assert_eq!(report.released, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.attempted(), 3);
        assert_eq!(released.load(Ordering::SeqCst), 2);

        let failure = &report.failures[0];
        assert_eq!(failure.id, bad);
        assert_eq!(failure.kind, ResourceKind::Listener);
        assert_eq!(failure.label.as_deref(), Some("window:scroll"));
        assert_eq!(failure.error, DisposeError::new("handle already detached"));
    }

    #[test]
    fn test_remove_releases_only_the_selected_entry() {
        let registry = ResourceRegistry::new();
        let released = Arc::new(AtomicUsize::new(0));

        let first = registry.register_observer(counting_disposer(&released));
        let second = registry.register_timeout(counting_disposer(&released));

        assert_eq!(registry.remove(first), Some(Ok(())));
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(!registry.contains(first));
        assert!(registry.contains(second));

        // Removing again is a no-op.
        assert_eq!(registry.remove(first), None);

        let report = registry.cleanup();
        assert_eq!(report.released, 1);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_reports_dispose_failure_with_kind() {
        let registry = ResourceRegistry::new();
        let bad = registry.register_listener("window:resize", || {
            Err(DisposeError::new("handle already detached"))
        });

        assert_eq!(
            registry.remove(bad),
            Some(Err(RegistryError::DisposeFailed {
                kind: ResourceKind::Listener,
                error: DisposeError::new("handle already detached"),
            }))
        );
        // The entry is unregistered despite the failure.
        assert!(!registry.contains(bad));
        assert_eq!(registry.remove(bad), None);
    }

    #[test]
    fn test_cleanup_runs_in_registration_order() {
        let registry = ResourceRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.register_observer(move || {
                order.lock().unwrap().push(name);
                Ok(())
            });
        }

        registry.cleanup();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_registered_task_is_aborted_on_cleanup() {
        let registry = ResourceRegistry::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ticks);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        registry.register_task(ResourceKind::Interval, Some("ticker".into()), handle);

        let report = registry.cleanup();
        assert_eq!(report.released, 1);

        // The aborted task stops ticking.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let after = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after);
    }
}
