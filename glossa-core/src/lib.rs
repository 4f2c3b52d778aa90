//! GLOSSA Core - Key Space and Catalog Types
//!
//! Pure data structures shared by every GLOSSA crate: the closed locale key
//! space, the parsed catalog payload, resource kind tags, and the error
//! taxonomy. This crate contains no I/O and no async code.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

pub mod error;

pub use error::{
    DisposeError, GlossaError, GlossaResult, LoadError, RegistryError, SourceAttempt, SourceError,
};

// ============================================================================
// LOCALE KEYS
// ============================================================================

/// A short locale-like key identifying one catalog ("en", "ru", "pt-br", ...).
///
/// Keys are normalized on construction: trimmed and lowercased, so `"EN "`
/// and `"en"` compare equal everywhere in the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleKey(String);

impl LocaleKey {
    /// Create a key, trimming whitespace and lowercasing.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    /// The normalized key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocaleKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for LocaleKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Result of normalizing a requested key against a [`KeySet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKey {
    /// The key the loader will actually resolve.
    pub key: LocaleKey,
    /// True when the requested key was unknown and the default was
    /// substituted for it.
    pub substituted: bool,
}

/// The closed set of known locale keys plus the designated default key.
///
/// The key space is fixed per loader instance (no page-global singleton, per
/// the session-scoped design): construct one `KeySet` and hand it to the
/// cache. The default key is always a member of the known set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    known: BTreeSet<LocaleKey>,
    default: LocaleKey,
}

impl KeySet {
    /// Build a key set from the known keys and the terminal-fallback default.
    /// The default key is inserted into the known set if absent.
    pub fn new<I, K>(known: I, default: K) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<LocaleKey>,
    {
        let default = default.into();
        let mut known: BTreeSet<LocaleKey> = known.into_iter().map(Into::into).collect();
        known.insert(default.clone());
        Self { known, default }
    }

    /// Whether `key` is a member of the known set.
    pub fn contains(&self, key: &LocaleKey) -> bool {
        self.known.contains(key)
    }

    /// The designated default key used as terminal fallback.
    pub fn default_key(&self) -> &LocaleKey {
        &self.default
    }

    /// Normalize a raw requested key: unknown keys are substituted with the
    /// default key before any resolution begins.
    pub fn normalize(&self, raw: &str) -> NormalizedKey {
        let key = LocaleKey::new(raw);
        if self.known.contains(&key) {
            NormalizedKey {
                key,
                substituted: false,
            }
        } else {
            NormalizedKey {
                key: self.default.clone(),
                substituted: true,
            }
        }
    }

    /// Iterate the known keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &LocaleKey> {
        self.known.iter()
    }

    /// Number of known keys.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// A key set is never empty (it always contains the default).
    pub fn is_empty(&self) -> bool {
        false
    }
}

// ============================================================================
// CATALOGS
// ============================================================================

/// A resolved catalog payload: a parsed JSON object of localized entries.
///
/// Values may be strings or nested objects of strings; the catalog is opaque
/// to the loading machinery, which only enforces the structural contract
/// checked by [`Catalog::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: serde_json::Map<String, Value>,
}

impl Catalog {
    /// Validate a parsed payload. The payload must be a non-empty JSON
    /// object; anything else is rejected as an invalid payload.
    pub fn from_value(value: Value) -> Result<Self, SourceError> {
        match value {
            Value::Object(entries) if !entries.is_empty() => Ok(Self { entries }),
            Value::Object(_) => Err(SourceError::InvalidPayload {
                reason: "catalog object is empty".to_string(),
            }),
            other => Err(SourceError::InvalidPayload {
                reason: format!("expected a JSON object, got {}", json_type_name(&other)),
            }),
        }
    }

    /// Build a catalog from string entries. Intended for tests, overrides,
    /// and embedded fallback content.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    /// Look up a raw entry by top-level name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Look up a string entry by dotted path ("modal.title" walks nested
    /// objects). Returns `None` if any segment is missing or the terminal
    /// value is not a string.
    pub fn text(&self, path: &str) -> Option<&str> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        current.as_str()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A validated catalog is never empty; this exists for completeness.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// RESOURCE KINDS
// ============================================================================

/// Kind tag for a registered disposable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A mutation/content observer.
    Observer,
    /// An event listener on some target.
    Listener,
    /// A repeating timer.
    Interval,
    /// A one-shot timer.
    Timeout,
    /// A frame-rate callback subscription.
    AnimationFrame,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Observer => "observer",
            Self::Listener => "listener",
            Self::Interval => "interval",
            Self::Timeout => "timeout",
            Self::AnimationFrame => "animation-frame",
        };
        f.write_str(name)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
