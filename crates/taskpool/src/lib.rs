//! taskpool: the task execution and coordination core of a command-line
//! application.
//!
//! This umbrella crate re-exports the family:
//!
//! | Crate | What it owns |
//! |-------|--------------|
//! | [`taskpool-core`](taskpool_core) | Task model, clocks, cancellation token, event plumbing |
//! | [`taskpool-retry`](taskpool_retry) | Error classification and backoff with jitter |
//! | [`taskpool-gate`](taskpool_gate) | Bounded-concurrency admission gate |
//! | [`taskpool-cache`](taskpool_cache) | SQLite content-addressed result cache |
//! | [`taskpool-render`](taskpool_render) | Live terminal progress and final summary |
//! | [`taskpool-scheduler`](taskpool_scheduler) | The scheduler, signals, phases |
//!
//! # Quick start
//!
//! ```no_run
//! use taskpool::{Scheduler, SchedulerConfig, TaskOptions};
//!
//! # async fn example() {
//! let scheduler = Scheduler::with_config(
//!     SchedulerConfig::builder().max_concurrent(8).build(),
//! );
//! taskpool::install_signal_handler(&scheduler);
//!
//! scheduler.submit(
//!     "warm caches",
//!     TaskOptions::new().run(|task| async move {
//!         task.log_info("starting");
//!         Ok(None)
//!     }),
//! );
//!
//! std::process::exit(scheduler.wait().await);
//! # }
//! ```

pub use taskpool_cache::{fingerprint, CacheEntry, CacheMetrics, ClearScope, ResultCache, UsageRow};
pub use taskpool_core::{
    BoxError, CancelReason, CancellationToken, Clock, FixedJitter, Jitter, LogEntry, LogLevel,
    ManualClock, Progress, SystemClock, TaskError, TaskId, TaskSnapshot, TaskStatus,
    ThreadRngJitter,
};
pub use taskpool_gate::{AdmissionGate, GateError, GatePermit};
pub use taskpool_render::{
    build_frame, format_elapsed, render_summary, stderr_is_terminal, terminal_width, FrameOptions,
    LiveRenderer, SnapshotSource,
};
pub use taskpool_retry::{RetryPolicy, RetryPolicyBuilder};
pub use taskpool_scheduler::{
    complete_phase, configure, global, install_signal_handler, phases, start_phase, update_phase,
    PhaseTracker, RunFn, RunFuture, Scheduler, SchedulerConfig, SchedulerConfigBuilder,
    TaskEvent, TaskHandle, TaskOptions, TaskValue,
};
