//! Concurrent task scheduler with bounded parallelism, retry-with-backoff,
//! cooperative cancellation, deduplication, result caching, and live
//! terminal progress.
//!
//! # Model
//!
//! Callers [`submit`](Scheduler::submit) named tasks with a work function
//! and options (timeout, identity, retry policy, cache fingerprint). The
//! scheduler admits tasks through a bounded gate, runs the work function,
//! retries transient failures with exponential backoff, and records one
//! terminal state per task: `Success`, `Failed`, `Warning`, or
//! `Cancelled`. The first terminal transition wins; everything after it
//! is a no-op. [`wait`](Scheduler::wait) blocks until every task is
//! terminal and returns the process exit code.
//!
//! Cancellation is cooperative: work functions observe the handle's
//! token. The scheduler resolves a task's record as soon as the token
//! fires, but never kills user code; an abandoned attempt keeps running
//! until it notices.
//!
//! # Example
//!
//! ```no_run
//! use taskpool_scheduler::{Scheduler, SchedulerConfig, TaskOptions};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let scheduler = Scheduler::with_config(
//!     SchedulerConfig::builder()
//!         .max_concurrent(4)
//!         .build(),
//! );
//!
//! for url in ["a", "b", "c"] {
//!     scheduler.submit(
//!         format!("fetch {url}"),
//!         TaskOptions::new()
//!             .timeout(Duration::from_secs(30))
//!             .run(move |task| async move {
//!                 task.set_progress(0, 100);
//!                 // ... do the work, observing task.cancelled() ...
//!                 Ok(None)
//!             }),
//!     );
//! }
//!
//! let exit = scheduler.wait().await;
//! std::process::exit(exit);
//! # }
//! ```

mod config;
mod events;
mod global;
mod options;
mod phase;
mod record;
mod scheduler;
mod signal;

pub use config::{SchedulerConfig, SchedulerConfigBuilder};
pub use events::TaskEvent;
pub use global::{
    complete_phase, configure, global, phases, start_phase, update_phase,
};
pub use options::{RunFn, RunFuture, TaskOptions, TaskValue};
pub use phase::PhaseTracker;
pub use record::TaskHandle;
pub use scheduler::Scheduler;
pub use signal::install_signal_handler;

pub use taskpool_core::{
    BoxError, CancelReason, CancellationToken, LogEntry, LogLevel, Progress, TaskError, TaskId,
    TaskSnapshot, TaskStatus,
};
pub use taskpool_retry::RetryPolicy;
