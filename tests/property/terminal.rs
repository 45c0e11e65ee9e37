//! Properties: exactly one terminal transition per task, cancellation
//! idempotence, and dedup yielding a single execution.

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskpool_scheduler::{Scheduler, SchedulerConfig, TaskOptions, TaskStatus};
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Copy)]
enum TerminalCall {
    Success,
    Failed,
    Warning,
    Cancel,
}

fn terminal_call() -> impl Strategy<Value = TerminalCall> {
    prop_oneof![
        Just(TerminalCall::Success),
        Just(TerminalCall::Failed),
        Just(TerminalCall::Warning),
        Just(TerminalCall::Cancel),
    ]
}

fn apply(task: &taskpool_scheduler::TaskHandle, call: TerminalCall) {
    match call {
        TerminalCall::Success => task.success(),
        TerminalCall::Failed => task.failed(),
        TerminalCall::Warning => task.warning(),
        TerminalCall::Cancel => task.cancel(),
    }
}

fn expected(call: TerminalCall) -> TaskStatus {
    match call {
        TerminalCall::Success => TaskStatus::Success,
        TerminalCall::Failed => TaskStatus::Failed,
        TerminalCall::Warning => TaskStatus::Warning,
        TerminalCall::Cancel => TaskStatus::Cancelled,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn first_terminal_call_wins(calls in prop::collection::vec(terminal_call(), 1..8)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let finished = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&finished);
            let scheduler = Scheduler::with_config(
                SchedulerConfig::quiet()
                    .on_task_finished(move |_, _| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .build(),
            );

            // Externally driven task, running as soon as submitted.
            let task = scheduler.submit("probe", TaskOptions::new());
            for call in &calls {
                apply(&task, *call);
            }

            prop_assert_eq!(task.status(), expected(calls[0]));
            prop_assert!(task.status().is_terminal());
            prop_assert_eq!(finished.load(Ordering::SeqCst), 1,
                "exactly one terminal transition must be observed");
            prop_assert_eq!(scheduler.wait_silent().await,
                i32::from(task.status().is_failure()));
            Ok(())
        })?;
    }

    #[test]
    fn cancel_any_number_of_times_is_one_cancellation(times in 1usize..10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let scheduler = Scheduler::with_config(SchedulerConfig::quiet().build());
            let task = scheduler.submit(
                "cancel-me",
                TaskOptions::new().run(|handle: taskpool_scheduler::TaskHandle| async move {
                    handle.cancelled().await;
                    Ok(None)
                }),
            );
            for _ in 0..times {
                task.cancel();
            }
            prop_assert_eq!(task.status(), TaskStatus::Cancelled);
            prop_assert_eq!(scheduler.wait_silent().await, 1);
            prop_assert_eq!(task.status(), TaskStatus::Cancelled);
            Ok(())
        })?;
    }

    #[test]
    fn shared_identity_executes_once(submissions in 2usize..10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let scheduler = Scheduler::with_config(SchedulerConfig::quiet().build());
            let invocations = Arc::new(AtomicUsize::new(0));

            let mut ids = Vec::new();
            for i in 0..submissions {
                let invocations = Arc::clone(&invocations);
                let task = scheduler.submit(
                    format!("dup-{i}"),
                    TaskOptions::new().identity("same-key").run(move |_| {
                        let invocations = Arc::clone(&invocations);
                        async move {
                            invocations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            Ok(None)
                        }
                    }),
                );
                ids.push(task.id());
            }

            ids.dedup();
            prop_assert_eq!(ids.len(), 1);
            prop_assert_eq!(scheduler.wait_silent().await, 0);
            prop_assert_eq!(invocations.load(Ordering::SeqCst), 1);
            Ok(())
        })?;
    }
}
