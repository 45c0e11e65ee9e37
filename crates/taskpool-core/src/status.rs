//! Task lifecycle states, progress, and the per-task log trail.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Opaque scheduler-assigned task handle, unique within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle state of a task.
///
/// `Success`, `Failed`, `Warning`, and `Cancelled` are terminal: a record
/// reaches exactly one of them, once, and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted, waiting for an admission slot.
    Pending,
    /// Admitted and executing.
    Running,
    /// Finished with a result.
    Success,
    /// Finished with an error.
    Failed,
    /// Finished, succeeded with reservations.
    Warning,
    /// Cancelled before or during execution.
    Cancelled,
}

impl TaskStatus {
    /// Returns `true` for the four terminal states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Warning | TaskStatus::Cancelled
        )
    }

    /// Returns `true` if the state counts against the scheduler exit code.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
            TaskStatus::Warning => "warning",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Progress of a running task as a `(value, max)` pair.
///
/// `max == 0` means indeterminate; renderers show a spinner instead of a
/// bar. While a task is running with `max > 0`, `value <= max` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub value: u64,
    pub max: u64,
}

impl Progress {
    /// Creates a progress pair, clamping `value` to `max` when bounded.
    #[must_use]
    pub fn new(value: u64, max: u64) -> Self {
        let value = if max > 0 { value.min(max) } else { value };
        Self { value, max }
    }

    /// Returns `true` when no meaningful maximum is known.
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        self.max == 0
    }

    /// Completion ratio in `[0, 1]`; `0` when indeterminate.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.value as f64 / self.max as f64
        }
    }
}

/// Severity of a task log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// One entry in a task's log trail.
///
/// Entries are append-only and ordered by insertion time under the task
/// lock, so observers always see them in the order they were issued.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub at: Instant,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Instant::now(),
        }
    }
}
