//! Events emitted by the scheduler.

use std::time::{Duration, Instant};
use taskpool_core::{SchedulerEvent, TaskStatus};

/// Lifecycle events observable through the scheduler's builder hooks.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A task entered the scheduler's task list.
    Submitted {
        task_name: String,
        timestamp: Instant,
    },
    /// A task acquired an admission slot and started running.
    Admitted {
        task_name: String,
        timestamp: Instant,
    },
    /// A retryable failure; the task sleeps `delay` before attempt
    /// `attempt + 1`.
    Retrying {
        task_name: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// A fingerprint lookup short-circuited the task.
    CacheHit {
        task_name: String,
        timestamp: Instant,
        fingerprint: String,
    },
    /// A task reached a terminal state.
    Finished {
        task_name: String,
        timestamp: Instant,
        status: TaskStatus,
    },
}

impl SchedulerEvent for TaskEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::Submitted { .. } => "task_submitted",
            TaskEvent::Admitted { .. } => "task_admitted",
            TaskEvent::Retrying { .. } => "task_retrying",
            TaskEvent::CacheHit { .. } => "cache_hit",
            TaskEvent::Finished { .. } => "task_finished",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TaskEvent::Submitted { timestamp, .. }
            | TaskEvent::Admitted { timestamp, .. }
            | TaskEvent::Retrying { timestamp, .. }
            | TaskEvent::CacheHit { timestamp, .. }
            | TaskEvent::Finished { timestamp, .. } => *timestamp,
        }
    }

    fn task_name(&self) -> &str {
        match self {
            TaskEvent::Submitted { task_name, .. }
            | TaskEvent::Admitted { task_name, .. }
            | TaskEvent::Retrying { task_name, .. }
            | TaskEvent::CacheHit { task_name, .. }
            | TaskEvent::Finished { task_name, .. } => task_name,
        }
    }
}
