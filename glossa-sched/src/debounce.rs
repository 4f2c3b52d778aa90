//! Trailing/leading-edge debouncing.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Configuration for a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Width of the quiet period.
    pub width: Duration,
    /// If true, invoke on the call that starts a quiet period instead of
    /// the one that ends it. The starting call's trailing edge is
    /// suppressed; later calls inside the window still debounce normally.
    pub leading: bool,
}

impl DebounceConfig {
    /// Trailing-edge debounce of the given width.
    pub fn new(width: Duration) -> Self {
        Self {
            width,
            leading: false,
        }
    }

    pub fn with_leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }
}

struct DebounceState<T> {
    /// The most recent pending payload. At most one per wrapper.
    pending: Option<T>,
    /// The live quiet-period timer, if any.
    timer: Option<JoinHandle<()>>,
    /// Bumped on every call/cancel/flush; a timer only consumes the pending
    /// payload if its generation is still current. Closes the race between
    /// a firing timer and a simultaneous new call.
    generation: u64,
}

struct Shared<T> {
    func: Box<dyn Fn(T) + Send + Sync>,
    config: DebounceConfig,
    state: Mutex<DebounceState<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> std::sync::MutexGuard<'_, DebounceState<T>> {
        // The callback never runs under this lock, so poisoning is
        // unreachable from user code; recover rather than wedge.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coalesces a burst of calls into one invocation after a quiet period.
///
/// Each [`call`](Debouncer::call) records the payload as the pending
/// invocation and restarts the quiet-period timer; when the timer completes
/// with no intervening call, the wrapped function runs once with the most
/// recent payload. The callback is invoked outside the internal lock, so a
/// panicking callback propagates without corrupting pending state.
///
/// Requires a tokio runtime context (timers are spawned tasks).
pub struct Debouncer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(config: DebounceConfig, func: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                func: Box::new(func),
                config,
                state: Mutex::new(DebounceState {
                    pending: None,
                    timer: None,
                    generation: 0,
                }),
            }),
        }
    }

    /// Record `value` as the pending invocation and (re)start the quiet
    /// period. With `leading` set and no timer running, `value` is passed
    /// to the function immediately instead.
    pub fn call(&self, value: T) {
        let fire_now = {
            let mut state = self.shared.lock();
            state.generation = state.generation.wrapping_add(1);
            let generation = state.generation;

            let was_idle = state.timer.is_none();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }

            let fire_now = if self.shared.config.leading && was_idle {
                Some(value)
            } else {
                state.pending = Some(value);
                None
            };

            state.timer = Some(self.spawn_timer(generation));
            fire_now
        };

        if let Some(value) = fire_now {
            (self.shared.func)(value);
        }
    }

    /// Discard the pending invocation and stop the timer without invoking
    /// the function.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending = None;
    }

    /// Run a pending trailing invocation immediately, if any, and stop the
    /// timer.
    pub fn flush(&self) {
        let pending = {
            let mut state = self.shared.lock();
            state.generation = state.generation.wrapping_add(1);
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.pending.take()
        };
        if let Some(value) = pending {
            (self.shared.func)(value);
        }
    }

    /// Whether a quiet-period timer is currently armed.
    pub fn is_pending(&self) -> bool {
        self.shared.lock().timer.is_some()
    }

    fn spawn_timer(&self, generation: u64) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.config.width).await;
            let fired = {
                let mut state = shared.lock();
                if state.generation != generation {
                    // Superseded by a newer call/cancel/flush.
                    return;
                }
                state.timer = None;
                state.pending.take()
            };
            // None here means a leading-edge call with no follow-ups.
            if let Some(value) = fired {
                (shared.func)(value);
            }
        })
    }
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Debouncer")
            .field("width", &self.shared.config.width)
            .field("leading", &self.shared.config.leading)
            .field("pending", &state.pending.is_some())
            .field("armed", &state.timer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tokio::time::{advance, sleep};

    fn recorder() -> (Arc<StdMutex<Vec<i32>>>, impl Fn(i32) + Send + Sync) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v| sink.lock().unwrap().push(v))
    }

    async fn settle() {
        // Let a just-fired timer task run.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_one_trailing_invocation() {
        let (seen, sink) = recorder();
        let debouncer = Debouncer::new(DebounceConfig::new(Duration::from_millis(50)), sink);

        for i in 0..10 {
            debouncer.call(i);
            sleep(Duration::from_millis(5)).await;
        }

        // 49ms after the last call: still quiet, nothing fired.
        sleep(Duration::from_millis(44)).await;
        settle().await;
        assert!(seen.lock().unwrap().is_empty());

        // Quiet period completes: exactly one invocation, last payload.
        sleep(Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_edge_fires_immediately_and_suppresses_own_trailing() {
        let (seen, sink) = recorder();
        let config = DebounceConfig::new(Duration::from_millis(50)).with_leading(true);
        let debouncer = Debouncer::new(config, sink);

        debouncer.call(1);
        assert_eq!(*seen.lock().unwrap(), vec![1]);

        // No further calls: the window closes without a trailing fire.
        sleep(Duration::from_millis(60)).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_edge_burst_still_debounces_followups() {
        let (seen, sink) = recorder();
        let config = DebounceConfig::new(Duration::from_millis(50)).with_leading(true);
        let debouncer = Debouncer::new(config, sink);

        debouncer.call(1); // leading fire
        sleep(Duration::from_millis(10)).await;
        debouncer.call(2);
        sleep(Duration::from_millis(10)).await;
        debouncer.call(3);

        sleep(Duration::from_millis(60)).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let (seen, sink) = recorder();
        let debouncer = Debouncer::new(DebounceConfig::new(Duration::from_millis(50)), sink);

        debouncer.call(7);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        sleep(Duration::from_millis(100)).await;
        settle().await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_fires_pending_immediately() {
        let (seen, sink) = recorder();
        let debouncer = Debouncer::new(DebounceConfig::new(Duration::from_millis(50)), sink);

        debouncer.call(5);
        debouncer.flush();
        assert_eq!(*seen.lock().unwrap(), vec![5]);

        // Nothing further when the original timer would have elapsed.
        sleep(Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrapper_reusable_after_fire() {
        let (seen, sink) = recorder();
        let debouncer = Debouncer::new(DebounceConfig::new(Duration::from_millis(20)), sink);

        debouncer.call(1);
        sleep(Duration::from_millis(30)).await;
        settle().await;

        debouncer.call(2);
        sleep(Duration::from_millis(30)).await;
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_pending_state() {
        let (seen, sink) = recorder();
        let debouncer = Debouncer::new(DebounceConfig::new(Duration::from_millis(50)), sink);
        let clone = debouncer.clone();

        debouncer.call(1);
        clone.call(2);

        // Let the spawned timer task register its deadline before the
        // clock moves, so the advance actually elapses the quiet period.
        tokio::task::yield_now().await;
        advance(Duration::from_millis(60)).await;
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }
}
