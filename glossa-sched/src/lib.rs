//! GLOSSA Sched - Event Coalescing Primitives
//!
//! Two policies for taming burst sources (mutation storms, input handlers,
//! frame-rate updates):
//!
//! - [`Debouncer`] answers "wait for quiet": a burst of calls collapses into
//!   one invocation after a quiet period of the configured width, carrying
//!   the most recent payload. An optional leading edge fires on the call
//!   that starts a quiet period instead.
//! - [`Throttle`] answers "cap the rate": at most one invocation per fixed
//!   window; calls inside an open window are dropped, not queued, and
//!   observe the last captured return value.
//!
//! Both are plain values owning their closure state — no globals. Wrappers
//! are cheap to clone and share state across clones. Timers run on the
//! tokio clock, so paused-clock tests are exact.

mod debounce;
mod throttle;

pub use debounce::{DebounceConfig, Debouncer};
pub use throttle::Throttle;
