//! Bounded concurrency under load.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskpool_scheduler::{Scheduler, SchedulerConfig, TaskOptions};

/// Tracks how many work functions run at once.
#[derive(Clone, Default)]
struct ConcurrencyTracker {
    current: Arc<AtomicUsize>,
    max_seen: Arc<AtomicUsize>,
}

impl ConcurrencyTracker {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn max(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn five_sleepers_through_a_two_wide_gate() {
    let scheduler = Scheduler::with_config(
        SchedulerConfig::quiet().max_concurrent(2).build(),
    );
    let tracker = ConcurrencyTracker::default();

    for i in 0..5 {
        let tracker = tracker.clone();
        scheduler.submit(
            format!("sleeper-{i}"),
            TaskOptions::new().run(move |_| {
                let tracker = tracker.clone();
                async move {
                    tracker.enter();
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    tracker.exit();
                    Ok(None)
                }
            }),
        );
    }

    let started = Instant::now();
    let exit = scheduler.wait_silent().await;
    let elapsed = started.elapsed();

    assert_eq!(exit, 0);
    assert!(tracker.max() <= 2, "saw {} concurrent tasks", tracker.max());
    // Three admission rounds of 200ms each.
    assert!(
        elapsed >= Duration::from_millis(500),
        "finished suspiciously fast: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(900),
        "gate appears to serialize more than configured: {elapsed:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unbounded_gate_runs_everything_at_once() {
    let scheduler = Scheduler::with_config(SchedulerConfig::quiet().build());
    let tracker = ConcurrencyTracker::default();

    for i in 0..8 {
        let tracker = tracker.clone();
        scheduler.submit(
            format!("parallel-{i}"),
            TaskOptions::new().run(move |_| {
                let tracker = tracker.clone();
                async move {
                    tracker.enter();
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    tracker.exit();
                    Ok(None)
                }
            }),
        );
    }

    let started = Instant::now();
    assert_eq!(scheduler.wait_silent().await, 0);
    assert!(started.elapsed() < Duration::from_millis(400));
    assert!(tracker.max() >= 4, "expected wide parallelism, saw {}", tracker.max());
}

#[tokio::test(flavor = "multi_thread")]
async fn raising_the_cap_mid_run_takes_effect() {
    let scheduler = Scheduler::with_config(
        SchedulerConfig::quiet().max_concurrent(1).build(),
    );
    let tracker = ConcurrencyTracker::default();

    for i in 0..6 {
        let tracker = tracker.clone();
        scheduler.submit(
            format!("step-{i}"),
            TaskOptions::new().run(move |_| {
                let tracker = tracker.clone();
                async move {
                    tracker.enter();
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    tracker.exit();
                    Ok(None)
                }
            }),
        );
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(tracker.max(), 1);
    scheduler.set_max_concurrent(3);

    assert_eq!(scheduler.wait_silent().await, 0);
    assert!(
        tracker.max() > 1,
        "resize never widened admission: max {}",
        tracker.max()
    );
    assert!(tracker.max() <= 3 + 1, "resize overshot: max {}", tracker.max());
}
