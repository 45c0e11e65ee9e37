//! Task records and the handles callers keep.
//!
//! The scheduler owns every record; callers hold cloneable, non-owning
//! [`TaskHandle`]s that stay valid after the scheduler is done. All
//! mutators are safe under concurrent access (one mutex per record) and a
//! record makes exactly one terminal transition: the first terminal call
//! wins and every later state-changing call is a no-op.

use crate::events::TaskEvent;
use crate::options::TaskValue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskpool_core::{
    CancelReason, CancellationToken, Clock, EventListeners, LogEntry, LogLevel, Progress,
    TaskError, TaskId, TaskSnapshot, TaskStatus,
};
use taskpool_retry::RetryPolicy;
use tokio::sync::watch;

struct TaskState {
    name: String,
    status: TaskStatus,
    progress: Progress,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    retry_count: u32,
    logs: Vec<LogEntry>,
    result: Option<TaskValue>,
    error: Option<TaskError>,
}

pub(crate) struct TaskInner {
    id: TaskId,
    identity: Option<String>,
    timeout: Option<Duration>,
    retry_policy: RetryPolicy,
    model_label: Option<String>,
    prompt_label: Option<String>,
    token: CancellationToken,
    clock: Arc<dyn Clock>,
    events: EventListeners<TaskEvent>,
    /// Bumped on every terminal transition; `wait` subscribes to it.
    terminal_tx: watch::Sender<u64>,
    /// Runs before a fatal exit (stops the live renderer).
    fatal_hook: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    state: Mutex<TaskState>,
}

/// Cloneable, non-owning view of one task.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<TaskInner>,
}

#[allow(clippy::too_many_arguments)]
impl TaskHandle {
    pub(crate) fn new(
        id: TaskId,
        name: String,
        identity: Option<String>,
        timeout: Option<Duration>,
        retry_policy: RetryPolicy,
        model_label: Option<String>,
        prompt_label: Option<String>,
        clock: Arc<dyn Clock>,
        events: EventListeners<TaskEvent>,
        terminal_tx: watch::Sender<u64>,
    ) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id,
                identity,
                timeout,
                retry_policy,
                model_label,
                prompt_label,
                token: CancellationToken::new(),
                clock,
                events,
                terminal_tx,
                fatal_hook: Mutex::new(None),
                state: Mutex::new(TaskState {
                    name,
                    status: TaskStatus::Pending,
                    progress: Progress::default(),
                    started_at: None,
                    ended_at: None,
                    retry_count: 0,
                    logs: Vec::new(),
                    result: None,
                    error: None,
                }),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.state.lock().name.clone()
    }

    /// Updates the display label. Ignored once the task is terminal.
    pub fn set_name(&self, name: impl Into<String>) {
        let mut state = self.inner.state.lock();
        if !state.status.is_terminal() {
            state.name = name.into();
        }
    }

    /// Updates progress atomically. No state transition; `max == 0` means
    /// indeterminate.
    pub fn set_progress(&self, value: u64, max: u64) {
        let mut state = self.inner.state.lock();
        if !state.status.is_terminal() {
            state.progress = Progress::new(value, max);
        }
    }

    pub fn log_info(&self, message: impl Into<String>) {
        self.push_log(LogLevel::Info, message.into());
    }

    pub fn log_warn(&self, message: impl Into<String>) {
        self.push_log(LogLevel::Warn, message.into());
    }

    pub fn log_error(&self, message: impl Into<String>) {
        self.push_log(LogLevel::Error, message.into());
    }

    fn push_log(&self, level: LogLevel, message: String) {
        let mut state = self.inner.state.lock();
        state.logs.push(LogEntry::new(level, message));
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.inner.state.lock().status
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The failure reason; meaningful only in a terminal state.
    #[must_use]
    pub fn error(&self) -> Option<TaskError> {
        self.inner.state.lock().error.clone()
    }

    /// The work function's value; meaningful only in `Success`.
    #[must_use]
    pub fn result(&self) -> Option<TaskValue> {
        self.inner.state.lock().result.clone()
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retry_count
    }

    /// The cancellation token the work function must observe.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Completes when the task is cancelled (or timed out).
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    /// Cancels the task: transitions a pending or running record to
    /// `Cancelled` and signals the work function. Idempotent; on an
    /// already-terminal record only the token is signalled so blocked
    /// work unwinds.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::UserRequested);
    }

    pub(crate) fn cancel_with(&self, reason: CancelReason) {
        self.inner.token.cancel(reason);
        self.transition(
            TaskStatus::Cancelled,
            Some(TaskError::Cancelled(reason)),
            None,
            TransitionFrom::AnyNonTerminal,
        );
    }

    /// Marks a running task `Success`. No-op unless running.
    pub fn success(&self) {
        self.transition(TaskStatus::Success, None, None, TransitionFrom::Running);
    }

    /// Marks a running task `Failed`. No-op unless running.
    pub fn failed(&self) {
        self.transition(
            TaskStatus::Failed,
            Some(TaskError::Failed("task failed".to_string())),
            None,
            TransitionFrom::Running,
        );
    }

    /// Marks a running task `Failed` with a message. No-op unless running.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.transition(
            TaskStatus::Failed,
            Some(TaskError::Failed(message.into())),
            None,
            TransitionFrom::Running,
        );
    }

    /// Marks a running task `Warning`. No-op unless running.
    pub fn warning(&self) {
        self.transition(TaskStatus::Warning, None, None, TransitionFrom::Running);
    }

    /// Unrecoverable failure: records `Failed`, stops the live renderer,
    /// prints a fatal line on stderr, and exits the process with code 1.
    pub fn fatal(&self, err: impl std::fmt::Display) -> ! {
        let message = err.to_string();
        self.transition(
            TaskStatus::Failed,
            Some(TaskError::Failed(message.clone())),
            None,
            TransitionFrom::AnyNonTerminal,
        );
        let hook = self.inner.fatal_hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
        eprintln!("FATAL: {}: {message}", self.name());
        std::process::exit(1);
    }

    pub(crate) fn set_fatal_hook(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        *self.inner.fatal_hook.lock() = Some(hook);
    }

    /// The caller-supplied deduplication key, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.inner.identity.as_deref()
    }

    /// The configured deadline, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    /// Pending -> Running; records the admission timestamp the timeout
    /// counts from.
    pub(crate) fn mark_running(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.status != TaskStatus::Pending {
            return false;
        }
        state.status = TaskStatus::Running;
        state.started_at = Some(self.inner.clock.now());
        true
    }

    /// Bumps the retry counter after a retryable failure and returns the
    /// new count.
    pub(crate) fn note_retry(&self, message: &str) -> u32 {
        let mut state = self.inner.state.lock();
        state.retry_count += 1;
        let attempt = state.retry_count;
        state.logs.push(LogEntry::new(
            LogLevel::Warn,
            format!("attempt {attempt} failed: {message}; retrying"),
        ));
        attempt
    }

    pub(crate) fn complete_success(&self, result: Option<TaskValue>) {
        self.transition(TaskStatus::Success, None, result, TransitionFrom::AnyNonTerminal);
    }

    pub(crate) fn complete_failed(&self, error: TaskError) {
        self.transition(
            TaskStatus::Failed,
            Some(error),
            None,
            TransitionFrom::AnyNonTerminal,
        );
    }

    /// Forces a terminal `Cancelled` regardless of what the work function
    /// is doing (shutdown escalation).
    pub(crate) fn force_cancel(&self, reason: CancelReason) {
        self.inner.token.cancel(reason);
        self.transition(
            TaskStatus::Cancelled,
            Some(TaskError::Cancelled(reason)),
            None,
            TransitionFrom::AnyNonTerminal,
        );
    }

    /// Cache hits never run: admission and completion collapse into one
    /// zero-duration transition.
    pub(crate) fn complete_from_cache(
        &self,
        result: Option<TaskValue>,
        error: Option<TaskError>,
    ) {
        let now = self.inner.clock.now();
        {
            let mut state = self.inner.state.lock();
            if state.status.is_terminal() {
                return;
            }
            // Straight from Pending to terminal: a cache hit never counts
            // against the admission cap, so Running is never observable.
            state.started_at = Some(now);
        }
        let (to, error) = match error {
            Some(err) => (TaskStatus::Failed, Some(err)),
            None => (TaskStatus::Success, None),
        };
        self.transition_at(to, error, result, TransitionFrom::AnyNonTerminal, Some(now));
    }

    fn transition(
        &self,
        to: TaskStatus,
        error: Option<TaskError>,
        result: Option<TaskValue>,
        from: TransitionFrom,
    ) -> bool {
        self.transition_at(to, error, result, from, None)
    }

    fn transition_at(
        &self,
        to: TaskStatus,
        error: Option<TaskError>,
        result: Option<TaskValue>,
        from: TransitionFrom,
        ended_at: Option<Instant>,
    ) -> bool {
        debug_assert!(to.is_terminal());
        let name = {
            let mut state = self.inner.state.lock();
            let allowed = match from {
                TransitionFrom::Running => state.status == TaskStatus::Running,
                TransitionFrom::AnyNonTerminal => !state.status.is_terminal(),
            };
            if !allowed {
                return false;
            }
            state.status = to;
            state.ended_at = Some(ended_at.unwrap_or_else(|| self.inner.clock.now()));
            state.error = error;
            state.result = result;
            state.name.clone()
        };

        self.inner.terminal_tx.send_modify(|v| *v = v.wrapping_add(1));

        #[cfg(feature = "metrics")]
        metrics::counter!("taskpool_tasks_finished_total", "status" => to.to_string())
            .increment(1);

        self.inner.events.emit(&TaskEvent::Finished {
            task_name: name,
            timestamp: Instant::now(),
            status: to,
        });
        true
    }

    /// Copies the observable state for the renderer; the lock is released
    /// before the snapshot is used.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        let state = self.inner.state.lock();
        let now = self.inner.clock.now();
        let elapsed = match (state.started_at, state.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            (None, _) => Duration::ZERO,
        };
        TaskSnapshot {
            id: self.inner.id,
            name: state.name.clone(),
            status: state.status,
            progress: state.progress,
            elapsed,
            retry_count: state.retry_count,
            max_retries: self.inner.retry_policy.max_retries(),
            logs: state.logs.clone(),
            error: state.error.as_ref().map(|e| e.to_string()),
            model_label: self.inner.model_label.clone(),
            prompt_label: self.inner.prompt_label.clone(),
        }
    }

    /// Wall-clock duration between admission and the terminal transition.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        let state = self.inner.state.lock();
        match (state.started_at, state.ended_at) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }
}

enum TransitionFrom {
    Running,
    AnyNonTerminal,
}
