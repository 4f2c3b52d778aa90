//! Session lifecycle scenarios: event sources wired through the coalescing
//! wrappers, registered with the registry, and released by one teardown
//! call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glossa_test_utils::{
    DebounceConfig, Debouncer, ResourceKind, ResourceRegistry, Throttle,
};
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn cleanup_silences_a_registered_debouncer() {
    let registry = ResourceRegistry::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&fired);
    let debouncer = Debouncer::new(DebounceConfig::new(Duration::from_millis(50)), move |_: ()| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let canceller = debouncer.clone();
    registry.register_observer(move || {
        canceller.cancel();
        Ok(())
    });

    // A burst arrives, then the session tears down before the quiet period
    // completes.
    debouncer.call(());
    debouncer.call(());
    let report = registry.cleanup();
    assert!(report.is_total());

    sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn throttled_updates_keep_flowing_until_teardown() {
    let registry = ResourceRegistry::new();
    let invocations = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&invocations);
    let throttle = Throttle::new(Duration::from_millis(100), move |v: u32| {
        counter.fetch_add(1, Ordering::SeqCst);
        v
    });

    // A periodic producer pushes through the throttle until aborted.
    let producer = {
        let throttle = throttle.clone();
        tokio::spawn(async move {
            for tick in 0.. {
                throttle.call(tick);
                sleep(Duration::from_millis(30)).await;
            }
        })
    };
    registry.register_task(ResourceKind::Interval, Some("producer".into()), producer);

    // Ticks land every 30ms; only the first tick at or after each window
    // expiry invokes (t=0 and t=120 within the first 215ms).
    sleep(Duration::from_millis(215)).await;
    let report = registry.cleanup();
    assert!(report.is_total());
    let after_teardown = invocations.load(Ordering::SeqCst);
    assert_eq!(after_teardown, 2);

    // The aborted producer pushes nothing further.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(invocations.load(Ordering::SeqCst), after_teardown);
}
