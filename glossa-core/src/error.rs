//! Error types for GLOSSA operations

use crate::{LocaleKey, ResourceKind};
use std::fmt;
use thiserror::Error;

/// A single source's failure to produce a catalog.
///
/// Individual source failures are recovered inside the fallback chain (the
/// next source is tried); they only reach callers as the attempt list inside
/// [`LoadError::AllSourcesExhausted`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Transport-level failure: the source could not be reached or did not
    /// answer for this key.
    #[error("Source unavailable: {reason}")]
    Unavailable { reason: String },

    /// The source answered, but the payload failed structural validation.
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

/// One failed attempt against a named source, in chain order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAttempt {
    /// The source's name, for error attribution.
    pub source: String,
    /// Why this source failed.
    pub error: SourceError,
}

impl fmt::Display for SourceAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Terminal load failures.
///
/// This is the only error the load cache surfaces: every recoverable
/// condition (unknown key, single-source failure) is handled inside the
/// chain. The error is `Clone` so deduplicated waiters can share one
/// failure value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Every source in the chain failed, including the default-key rescue
    /// when one was attempted.
    #[error("All sources exhausted for '{key}' after {} attempt(s)", .attempts.len())]
    AllSourcesExhausted {
        /// The key the chain actually resolved.
        key: LocaleKey,
        /// The originally requested key, when it was unknown and the
        /// default was substituted for it.
        requested: Option<LocaleKey>,
        /// Per-source causes, in the order the chain tried them.
        attempts: Vec<SourceAttempt>,
        /// The default-key rescue failure, when a rescue was attempted.
        fallback: Option<Box<LoadError>>,
    },
}

impl LoadError {
    /// Flatten this failure and any nested default-key rescue failure into
    /// one cause list, in the order the attempts were made.
    pub fn causes(&self) -> Vec<&SourceAttempt> {
        let Self::AllSourcesExhausted {
            attempts, fallback, ..
        } = self;
        let mut causes: Vec<&SourceAttempt> = attempts.iter().collect();
        if let Some(fallback) = fallback {
            causes.extend(fallback.causes());
        }
        causes
    }

    /// Whether the requested key was unknown and substituted with the
    /// default before resolution began.
    pub fn was_substituted(&self) -> bool {
        let Self::AllSourcesExhausted { requested, .. } = self;
        requested.is_some()
    }
}

/// A disposer's failure to release its resource.
///
/// Disposer failures are absorbed by the registry (logged and collected in
/// the cleanup report), never propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct DisposeError {
    pub reason: String,
}

impl DisposeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Resource registry errors.
///
/// Surfaced by selective removal, where a single entry's outcome has a
/// caller to report to. Bulk cleanup instead aggregates raw
/// [`DisposeError`]s in its report and never propagates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Disposer failed for {kind} resource: {error}")]
    DisposeFailed { kind: ResourceKind, error: DisposeError },
}

/// Top-level error type aggregating all GLOSSA subsystems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GlossaError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result alias used across the workspace.
pub type GlossaResult<T> = Result<T, GlossaError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(source: &str, reason: &str) -> SourceAttempt {
        SourceAttempt {
            source: source.to_string(),
            error: SourceError::Unavailable {
                reason: reason.to_string(),
            },
        }
    }

    #[test]
    fn test_exhausted_display_counts_attempts() {
        let err = LoadError::AllSourcesExhausted {
            key: LocaleKey::new("fr"),
            requested: None,
            attempts: vec![attempt("primary", "timeout"), attempt("secondary", "503")],
            fallback: None,
        };
        assert_eq!(
            err.to_string(),
            "All sources exhausted for 'fr' after 2 attempt(s)"
        );
    }

    #[test]
    fn test_causes_flattens_fallback_failure() {
        let fallback = LoadError::AllSourcesExhausted {
            key: LocaleKey::new("en"),
            requested: None,
            attempts: vec![attempt("primary", "timeout")],
            fallback: None,
        };
        let err = LoadError::AllSourcesExhausted {
            key: LocaleKey::new("tr"),
            requested: None,
            attempts: vec![attempt("primary", "503"), attempt("secondary", "dns")],
            fallback: Some(Box::new(fallback)),
        };

        let causes = err.causes();
        assert_eq!(causes.len(), 3);
        assert_eq!(causes[0].source, "primary");
        assert_eq!(causes[2].source, "primary");
    }

    #[test]
    fn test_substitution_is_visible_on_terminal_failure() {
        let err = LoadError::AllSourcesExhausted {
            key: LocaleKey::new("en"),
            requested: Some(LocaleKey::new("xx")),
            attempts: vec![],
            fallback: None,
        };
        assert!(err.was_substituted());
    }

    #[test]
    fn test_glossa_error_wraps_subsystems() {
        let err: GlossaError = SourceError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Source error: Source unavailable: connection refused"
        );
    }
}
