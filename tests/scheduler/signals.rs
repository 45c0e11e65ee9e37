//! Interrupt-driven shutdown across a batch of tasks.

use std::time::Duration;
use taskpool_scheduler::{Scheduler, SchedulerConfig, TaskHandle, TaskOptions, TaskStatus};

#[tokio::test(flavor = "multi_thread")]
async fn one_interrupt_cancels_a_whole_batch_cooperatively() {
    let scheduler = Scheduler::with_config(
        SchedulerConfig::quiet()
            .graceful_timeout(Duration::from_secs(5))
            .build(),
    );

    let tasks: Vec<TaskHandle> = (0..3)
        .map(|i| {
            scheduler.submit(
                format!("long-{i}"),
                TaskOptions::new().run(|handle: TaskHandle| async move {
                    handle.cancelled().await;
                    Ok(None)
                }),
            )
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(30)).await;
    scheduler.interrupt();

    let exit = tokio::time::timeout(Duration::from_secs(1), scheduler.wait_silent())
        .await
        .expect("cooperative shutdown should finish well inside the grace window");
    assert_eq!(exit, 1);
    for task in &tasks {
        assert_eq!(task.status(), TaskStatus::Cancelled);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn escalation_overrides_tasks_that_ignore_their_token() {
    let scheduler = Scheduler::with_config(
        SchedulerConfig::quiet()
            .graceful_timeout(Duration::from_secs(60))
            .build(),
    );

    let tasks: Vec<TaskHandle> = (0..3)
        .map(|i| {
            scheduler.submit(
                format!("deaf-{i}"),
                TaskOptions::new().run(|_| async {
                    std::future::pending::<()>().await;
                    Ok(None)
                }),
            )
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(30)).await;
    scheduler.interrupt();
    scheduler.interrupt();

    let exit = tokio::time::timeout(Duration::from_millis(50), scheduler.wait_silent())
        .await
        .expect("a second interrupt must force wait to return");
    assert_eq!(exit, 1);
    for task in &tasks {
        assert_eq!(task.status(), TaskStatus::Cancelled);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn interrupt_cancels_pending_work_without_admitting_it() {
    let scheduler = Scheduler::with_config(
        SchedulerConfig::quiet().max_concurrent(1).build(),
    );

    let _running = scheduler.submit(
        "holder",
        TaskOptions::new().run(|handle: TaskHandle| async move {
            handle.cancelled().await;
            Ok(None)
        }),
    );
    let queued = scheduler.submit(
        "queued",
        TaskOptions::new().run(|_| async {
            unreachable!("never admitted");
            #[allow(unreachable_code)]
            Ok(None)
        }),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(queued.status(), TaskStatus::Pending);

    scheduler.interrupt();
    assert_eq!(scheduler.wait_silent().await, 1);
    assert_eq!(queued.status(), TaskStatus::Cancelled);
}
