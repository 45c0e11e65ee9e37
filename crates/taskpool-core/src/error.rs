//! The unified error surfaced through terminal task states.

use crate::cancel::CancelReason;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by user work functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a task ended in `Failed` or `Cancelled`.
///
/// The scheduler records; it never throws. Callers read this off the task
/// record once the task is terminal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The work function returned an error that was not retryable, or
    /// retries were exhausted.
    #[error("{0}")]
    Failed(String),

    /// The task's deadline elapsed before the work function finished.
    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    /// The task was cancelled cooperatively.
    #[error("task {}", .0.description())]
    Cancelled(CancelReason),
}

impl TaskError {
    /// Wraps a user work-function error.
    #[must_use]
    pub fn from_user(err: &BoxError) -> Self {
        TaskError::Failed(err.to_string())
    }

    /// Returns `true` for cancellation, which resolves to the `Cancelled`
    /// terminal state rather than `Failed`.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Cancelled(_))
    }
}
