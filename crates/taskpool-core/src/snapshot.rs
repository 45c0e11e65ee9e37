//! Read-only task snapshots consumed by renderers and summaries.

use crate::status::{LogEntry, Progress, TaskId, TaskStatus};
use std::time::Duration;

/// A point-in-time copy of one task's observable state.
///
/// Snapshots are taken under the task lock and rendered without it, so a
/// repaint never blocks the scheduler.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub progress: Progress,
    /// Time since admission for running tasks; total runtime once terminal.
    /// Zero while pending.
    pub elapsed: Duration,
    pub retry_count: u32,
    pub max_retries: u32,
    pub logs: Vec<LogEntry>,
    pub error: Option<String>,
    /// Display-only metadata.
    pub model_label: Option<String>,
    pub prompt_label: Option<String>,
}

impl TaskSnapshot {
    /// Returns `true` when the renderer should append a retry suffix.
    #[must_use]
    pub fn is_retrying(&self) -> bool {
        self.retry_count > 0
    }
}
