//! Cooperative cancellation and timeouts.

use std::time::{Duration, Instant};
use taskpool_scheduler::{
    Scheduler, SchedulerConfig, TaskError, TaskOptions, TaskStatus,
};

fn quiet() -> Scheduler {
    Scheduler::with_config(SchedulerConfig::quiet().build())
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_resolves_a_blocked_task_quickly() {
    let scheduler = quiet();
    let task = scheduler.submit(
        "blocked",
        TaskOptions::new().run(|handle: taskpool_scheduler::TaskHandle| async move {
            handle.cancelled().await;
            Ok(None)
        }),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(task.status(), TaskStatus::Running);

    let cancelled_at = Instant::now();
    task.cancel();
    let exit = tokio::time::timeout(Duration::from_millis(50), scheduler.wait_silent())
        .await
        .expect("cancellation should resolve promptly");
    assert!(cancelled_at.elapsed() < Duration::from_millis(50));
    assert_eq!(exit, 1);
    assert_eq!(task.status(), TaskStatus::Cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_before_admission_never_calls_the_work_function() {
    let scheduler = Scheduler::with_config(
        SchedulerConfig::quiet().max_concurrent(1).build(),
    );
    let _occupier = scheduler.submit(
        "occupier",
        TaskOptions::new().run(|handle: taskpool_scheduler::TaskHandle| async move {
            handle.cancelled().await;
            Ok(None)
        }),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;

    let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = std::sync::Arc::clone(&ran);
    let parked = scheduler.submit(
        "parked",
        TaskOptions::new().run(move |_| {
            let flag = std::sync::Arc::clone(&flag);
            async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(None)
            }
        }),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(parked.status(), TaskStatus::Pending);

    parked.cancel();
    scheduler.cancel_all();
    assert_eq!(scheduler.wait_silent().await, 1);
    assert_eq!(parked.status(), TaskStatus::Cancelled);
    assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_fails_a_task_that_never_returns() {
    let scheduler = quiet();
    let started = Instant::now();
    let task = scheduler.submit(
        "hung",
        TaskOptions::new()
            .timeout(Duration::from_millis(150))
            .run(|handle: taskpool_scheduler::TaskHandle| async move {
                handle.cancelled().await;
                Ok(None)
            }),
    );

    assert_eq!(scheduler.wait_silent().await, 1);
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(150) && elapsed < Duration::from_millis(400),
        "timeout fired at {elapsed:?}"
    );
    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(matches!(task.error(), Some(TaskError::Timeout(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_is_not_retried() {
    let scheduler = quiet();
    let task = scheduler.submit(
        "hung-with-retries",
        TaskOptions::new()
            .timeout(Duration::from_millis(100))
            .run(|handle: taskpool_scheduler::TaskHandle| async move {
                handle.cancelled().await;
                Ok(None)
            }),
    );

    assert_eq!(scheduler.wait_silent().await, 1);
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_eq!(task.retry_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_cuts_backoff_short() {
    let scheduler = quiet();
    let started = Instant::now();
    let task = scheduler.submit(
        "slow-retry",
        TaskOptions::new()
            .timeout(Duration::from_millis(150))
            .retry_policy(
                taskpool_scheduler::RetryPolicy::builder()
                    .max_retries(5)
                    .base_delay(Duration::from_secs(10))
                    .jitter_factor(0.0)
                    .build(),
            )
            .run(|_| async { Err("connection refused".into()) }),
    );

    assert_eq!(scheduler.wait_silent().await, 1);
    // The first backoff would be 10s; the deadline interrupts it.
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(matches!(task.error(), Some(TaskError::Timeout(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_cancels_are_idempotent() {
    let scheduler = quiet();
    let task = scheduler.submit(
        "steady",
        TaskOptions::new().run(|handle: taskpool_scheduler::TaskHandle| async move {
            handle.cancelled().await;
            Ok(None)
        }),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;

    for _ in 0..5 {
        task.cancel();
    }
    assert_eq!(scheduler.wait_silent().await, 1);
    assert_eq!(task.status(), TaskStatus::Cancelled);
    assert_eq!(
        task.error(),
        Some(TaskError::Cancelled(taskpool_scheduler::CancelReason::UserRequested))
    );
}
