//! Per-submission options.

use crate::record::TaskHandle;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use taskpool_core::BoxError;
use taskpool_retry::RetryPolicy;

/// Opaque value a work function may produce; readable from the handle
/// once the task succeeds.
pub type TaskValue = serde_json::Value;

/// Future returned by one attempt of a work function.
pub type RunFuture = BoxFuture<'static, Result<Option<TaskValue>, BoxError>>;

/// A work function. Invoked once per attempt, so retries re-enter it; the
/// handle carries the cancellation token the function must observe.
pub type RunFn = Arc<dyn Fn(TaskHandle) -> RunFuture + Send + Sync>;

/// Options accepted by [`Scheduler::submit`](crate::Scheduler::submit).
#[derive(Default, Clone)]
pub struct TaskOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) identity: Option<String>,
    pub(crate) retry: Option<RetryPolicy>,
    pub(crate) fingerprint: Option<String>,
    pub(crate) model_label: Option<String>,
    pub(crate) prompt_label: Option<String>,
    pub(crate) run: Option<RunFn>,
}

impl TaskOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the task with a timeout error when this much time passes
    /// after admission. Backoff sleeps count against it.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Deduplication key. A second submission with the same identity
    /// returns the first submission's record and starts no new work.
    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Overrides the scheduler's default retry policy for this task.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Content fingerprint for the result cache. When set, the scheduler
    /// consults the cache before admission and stores non-retryable
    /// terminal outcomes after.
    #[must_use]
    pub fn fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Display-only model label.
    #[must_use]
    pub fn model_label(mut self, label: impl Into<String>) -> Self {
        self.model_label = Some(label.into());
        self
    }

    /// Display-only prompt label.
    #[must_use]
    pub fn prompt_label(mut self, label: impl Into<String>) -> Self {
        self.prompt_label = Some(label.into());
        self
    }

    /// The work function. Without one, the task's status is driven only
    /// by explicit terminal calls on the handle.
    #[must_use]
    pub fn run<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(TaskHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<TaskValue>, BoxError>> + Send + 'static,
    {
        self.run = Some(Arc::new(move |handle| Box::pin(f(handle))));
        self
    }
}

impl std::fmt::Debug for TaskOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOptions")
            .field("timeout", &self.timeout)
            .field("identity", &self.identity)
            .field("fingerprint", &self.fingerprint)
            .field("model_label", &self.model_label)
            .field("prompt_label", &self.prompt_label)
            .field("has_run_fn", &self.run.is_some())
            .finish()
    }
}
