//! Fixed-window rate limiting.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

struct ThrottleState<R> {
    /// The most recent captured return value.
    last: Option<R>,
    /// When the current window opened, if one is open.
    window_opened: Option<Instant>,
}

struct Shared<T, R> {
    func: Box<dyn Fn(T) -> R + Send + Sync>,
    limit: Duration,
    state: Mutex<ThrottleState<R>>,
}

/// Bounds invocation rate to at most once per fixed window.
///
/// The first call invokes the wrapped function immediately and captures its
/// return value; a window of the configured limit opens. Calls arriving
/// while the window is open are dropped (not queued) but still observe the
/// last captured value. The first call at or after window expiry invokes
/// again and reopens the window.
///
/// The window is measured on the tokio clock, so paused-clock tests are
/// exact. The function runs outside the internal lock; a panicking function
/// propagates to its caller without corrupting window state.
pub struct Throttle<T, R> {
    shared: Arc<Shared<T, R>>,
}

impl<T, R> Clone for Throttle<T, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, R: Clone> Throttle<T, R> {
    pub fn new(limit: Duration, func: impl Fn(T) -> R + Send + Sync + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                func: Box::new(func),
                limit,
                state: Mutex::new(ThrottleState {
                    last: None,
                    window_opened: None,
                }),
            }),
        }
    }

    /// Invoke the wrapped function if no window is open, otherwise drop the
    /// call.
    ///
    /// Returns the freshly captured value on invocation, or the last
    /// captured value for a dropped call. `None` only before the first
    /// invocation has completed.
    pub fn call(&self, value: T) -> Option<R> {
        let now = Instant::now();
        {
            let mut state = self.lock();
            if let Some(opened) = state.window_opened {
                if now < opened + self.shared.limit {
                    return state.last.clone();
                }
            }
            // Claim the window before invoking, so overlapping callers on
            // other tasks are dropped rather than doubled.
            state.window_opened = Some(now);
        }

        let result = (self.shared.func)(value);
        self.lock().last = Some(result.clone());
        Some(result)
    }

    /// The last captured return value, if any.
    pub fn last(&self) -> Option<R> {
        self.lock().last.clone()
    }

    /// Close the current window so the next call invokes immediately. The
    /// last captured value is kept.
    pub fn reset(&self) {
        self.lock().window_opened = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ThrottleState<R>> {
        // The wrapped function never runs under this lock; recover from the
        // unreachable poison case rather than wedge.
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, R> std::fmt::Debug for Throttle<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("limit", &self.shared.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_window_bounds_invocations() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let throttle = Throttle::new(Duration::from_millis(100), move |v: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        });

        assert_eq!(throttle.call(1), Some(1));
        sleep(Duration::from_millis(10)).await;
        assert_eq!(throttle.call(2), Some(1)); // dropped, last value
        sleep(Duration::from_millis(10)).await;
        assert_eq!(throttle.call(3), Some(1)); // dropped
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // t=101: window elapsed, next call invokes again.
        sleep(Duration::from_millis(81)).await;
        assert_eq!(throttle.call(4), Some(4));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_calls_observe_last_captured_value() {
        let throttle = Throttle::new(Duration::from_millis(50), |v: i32| v * 10);

        assert_eq!(throttle.call(1), Some(10));
        assert_eq!(throttle.call(2), Some(10));
        assert_eq!(throttle.last(), Some(10));

        sleep(Duration::from_millis(60)).await;
        assert_eq!(throttle.call(3), Some(30));
        assert_eq!(throttle.last(), Some(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_reopens_immediately() {
        let throttle = Throttle::new(Duration::from_millis(100), |v: i32| v);

        assert_eq!(throttle.call(1), Some(1));
        assert_eq!(throttle.call(2), Some(1));

        throttle.reset();
        assert_eq!(throttle.call(3), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_window() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let throttle = Throttle::new(Duration::from_millis(100), move |v: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        });
        let clone = throttle.clone();

        throttle.call(1);
        clone.call(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(clone.last(), Some(1));
    }
}
