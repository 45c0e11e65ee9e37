//! Retry behavior observed end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use taskpool_scheduler::{
    RetryPolicy, Scheduler, SchedulerConfig, TaskError, TaskOptions, TaskStatus, TaskValue,
};

fn flaky_policy() -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(3)
        .base_delay(Duration::from_millis(50))
        .max_delay(Duration::from_secs(1))
        .backoff_factor(2.0)
        .jitter_factor(0.0)
        .build()
}

#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_recover_with_exponential_gaps() {
    let scheduler = Scheduler::with_config(SchedulerConfig::quiet().build());
    let attempt_times: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let times = Arc::clone(&attempt_times);
    let task = scheduler.submit(
        "flaky-connection",
        TaskOptions::new()
            .retry_policy(flaky_policy())
            .run(move |_| {
                let times = Arc::clone(&times);
                async move {
                    let attempt = {
                        let mut times = times.lock();
                        times.push(Instant::now());
                        times.len()
                    };
                    if attempt < 3 {
                        Err("connection refused".into())
                    } else {
                        Ok(Some(TaskValue::from("recovered")))
                    }
                }
            }),
    );

    assert_eq!(scheduler.wait_silent().await, 0);
    assert_eq!(task.status(), TaskStatus::Success);
    assert_eq!(task.retry_count(), 2);
    assert_eq!(task.result(), Some(TaskValue::from("recovered")));

    let times = attempt_times.lock();
    assert_eq!(times.len(), 3);
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert!(
        first_gap >= Duration::from_millis(50) && first_gap < Duration::from_millis(150),
        "first backoff out of range: {first_gap:?}"
    );
    assert!(
        second_gap >= Duration::from_millis(100) && second_gap < Duration::from_millis(250),
        "second backoff out of range: {second_gap:?}"
    );

    // The retry trail is visible in the log.
    let warns = task
        .snapshot()
        .logs
        .iter()
        .filter(|l| l.message.contains("retrying"))
        .count();
    assert_eq!(warns, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn non_retryable_error_fails_after_one_attempt() {
    let scheduler = Scheduler::with_config(SchedulerConfig::quiet().build());
    let calls = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&calls);
    let task = scheduler.submit(
        "bad-input",
        TaskOptions::new()
            .retry_policy(flaky_policy())
            .run(move |_| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err("invalid argument".into())
                }
            }),
    );

    assert_eq!(scheduler.wait_silent().await, 1);
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(task.retry_count(), 0);
    assert_eq!(task.error(), Some(TaskError::Failed("invalid argument".into())));
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_exhaust_and_surface_the_last_error() {
    let scheduler = Scheduler::with_config(SchedulerConfig::quiet().build());
    let calls = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&calls);
    let task = scheduler.submit(
        "always-down",
        TaskOptions::new()
            .retry_policy(
                RetryPolicy::builder()
                    .max_retries(2)
                    .base_delay(Duration::from_millis(10))
                    .jitter_factor(0.0)
                    .build(),
            )
            .run(move |_| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err("connection reset by peer".into())
                }
            }),
    );

    assert_eq!(scheduler.wait_silent().await, 1);
    assert_eq!(task.status(), TaskStatus::Failed);
    // Initial attempt plus two retries.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(task.retry_count(), 2);
    assert!(task
        .error()
        .unwrap()
        .to_string()
        .contains("connection reset"));
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_events_fire_with_attempt_numbers() {
    let attempts: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&attempts);
    let scheduler = Scheduler::with_config(
        SchedulerConfig::quiet()
            .on_retry(move |_, attempt, _| seen.lock().push(attempt))
            .build(),
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    scheduler.submit(
        "eventful",
        TaskOptions::new()
            .retry_policy(
                RetryPolicy::builder()
                    .max_retries(3)
                    .base_delay(Duration::from_millis(10))
                    .jitter_factor(0.0)
                    .build(),
            )
            .run(move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("temporary outage".into())
                    } else {
                        Ok(None)
                    }
                }
            }),
    );

    assert_eq!(scheduler.wait_silent().await, 0);
    assert_eq!(*attempts.lock(), vec![1, 2]);
}
