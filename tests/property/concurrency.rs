//! Property: Running tasks never exceed the admission cap, and every
//! submission eventually terminates.

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskpool_scheduler::{Scheduler, SchedulerConfig, TaskOptions};
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn running_count_respects_the_cap(
        task_count in 1usize..=12,
        cap in 1usize..=4,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let scheduler = Scheduler::with_config(
                SchedulerConfig::quiet().max_concurrent(cap).build(),
            );
            let current = Arc::new(AtomicUsize::new(0));
            let max_seen = Arc::new(AtomicUsize::new(0));

            for i in 0..task_count {
                let current = Arc::clone(&current);
                let max_seen = Arc::clone(&max_seen);
                scheduler.submit(
                    format!("load-{i}"),
                    TaskOptions::new().run(move |_| {
                        let current = Arc::clone(&current);
                        let max_seen = Arc::clone(&max_seen);
                        async move {
                            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            current.fetch_sub(1, Ordering::SeqCst);
                            Ok(None)
                        }
                    }),
                );
            }

            let exit = scheduler.wait_silent().await;
            prop_assert_eq!(exit, 0);
            let seen = max_seen.load(Ordering::SeqCst);
            prop_assert!(
                seen <= cap,
                "cap {} breached: saw {} concurrent work functions",
                cap,
                seen
            );
            Ok(())
        })?;
    }

    /// Also checks the scheduler-side view: sampled Running snapshots
    /// never exceed the cap.
    #[test]
    fn sampled_running_snapshots_respect_the_cap(
        cap in 1usize..=3,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let scheduler = Scheduler::with_config(
                SchedulerConfig::quiet().max_concurrent(cap).build(),
            );
            for i in 0..8 {
                scheduler.submit(
                    format!("sampled-{i}"),
                    TaskOptions::new().run(|_| async {
                        tokio::time::sleep(Duration::from_millis(15)).await;
                        Ok(None)
                    }),
                );
            }

            let sampler = {
                let scheduler = scheduler.clone();
                tokio::spawn(async move {
                    let mut worst = 0usize;
                    loop {
                        let running = scheduler
                            .snapshots()
                            .iter()
                            .filter(|s| s.status == taskpool_scheduler::TaskStatus::Running)
                            .count();
                        worst = worst.max(running);
                        if scheduler.all_terminal() {
                            return worst;
                        }
                        tokio::time::sleep(Duration::from_millis(2)).await;
                    }
                })
            };

            scheduler.wait_silent().await;
            let worst = sampler.await.unwrap();
            prop_assert!(worst <= cap, "sampled {} running with cap {}", worst, cap);
            Ok(())
        })?;
    }
}
