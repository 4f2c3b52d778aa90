//! GLOSSA Loader - Deduplicated Catalog Loading
//!
//! This crate owns the resolution pipeline for locale catalogs:
//!
//! - [`Source`]: the async seam a catalog producer implements. Sources are
//!   tried in fixed priority order; any source can be swapped without
//!   changing the chain algorithm.
//! - [`LocalOverrides`]: a synchronous in-memory lookup consulted before the
//!   chain. An override hit short-circuits everything and never touches the
//!   deduplication bookkeeping.
//! - [`RemoteJsonSource`]: `GET {base}/{key}.json` over HTTP.
//! - [`StaticSource`]: catalogs served from an owned map, for embedded
//!   fallback content and tests.
//! - [`LoadCache`]: the keyed cache with in-flight request deduplication
//!   (singleflight), ordered fallback, and a bounded default-key rescue.
//!
//! # Guarantees
//!
//! - At most one in-flight request per key; concurrent callers share the
//!   single outcome.
//! - Only successes are cached. A failed load leaves no entry behind, so a
//!   later call retries the full chain.
//! - A started attempt always runs to completion: the chain is driven by a
//!   detached task, so a caller dropping its future still populates the
//!   cache for future callers.

mod cache;
mod overrides;
mod remote;
mod source;

pub use cache::LoadCache;
pub use overrides::LocalOverrides;
pub use remote::RemoteJsonSource;
pub use source::{Source, StaticSource};

// Re-export core types for convenience
pub use glossa_core::{
    Catalog, GlossaError, GlossaResult, KeySet, LoadError, LocaleKey, NormalizedKey,
    SourceAttempt, SourceError,
};
