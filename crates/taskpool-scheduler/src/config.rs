//! Scheduler configuration.

use crate::events::TaskEvent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taskpool_core::{
    Clock, EventListeners, FnListener, Jitter, SystemClock, TaskStatus, ThreadRngJitter,
};
use taskpool_retry::RetryPolicy;

/// Configuration for a [`Scheduler`](crate::Scheduler).
#[derive(Clone)]
pub struct SchedulerConfig {
    pub(crate) max_concurrent: usize,
    pub(crate) no_progress: bool,
    pub(crate) no_color: bool,
    pub(crate) verbose: bool,
    pub(crate) graceful_timeout: Duration,
    pub(crate) retry: RetryPolicy,
    pub(crate) cache_db_path: Option<PathBuf>,
    pub(crate) cache_ttl: Duration,
    pub(crate) events: EventListeners<TaskEvent>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) jitter: Arc<dyn Jitter>,
}

impl SchedulerConfig {
    /// Creates a builder with defaults: unlimited concurrency, live
    /// progress and color on, 5s grace window, default retry policy,
    /// caching off.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::new()
    }

    /// Preset for scripted use: no live region, no color.
    pub fn quiet() -> SchedulerConfigBuilder {
        Self::builder().no_progress(true).no_color(true)
    }

    /// Preset for CI logs: quiet plus verbose task logs.
    pub fn ci() -> SchedulerConfigBuilder {
        Self::quiet().verbose(true)
    }

    /// Default cache location under the user cache directory.
    #[must_use]
    pub fn default_cache_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("taskpool").join("results.db"))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`SchedulerConfig`].
pub struct SchedulerConfigBuilder {
    max_concurrent: usize,
    no_progress: bool,
    no_color: bool,
    verbose: bool,
    graceful_timeout: Duration,
    retry: RetryPolicy,
    cache_db_path: Option<PathBuf>,
    cache_ttl: Duration,
    events: EventListeners<TaskEvent>,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn Jitter>,
}

impl SchedulerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_concurrent: 0,
            no_progress: false,
            no_color: false,
            verbose: false,
            graceful_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            cache_db_path: None,
            cache_ttl: Duration::ZERO,
            events: EventListeners::new(),
            clock: Arc::new(SystemClock),
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    /// Admission cap. `0` means unlimited.
    ///
    /// Default: 0
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Disables the live region; the final summary is still printed.
    ///
    /// Default: false
    pub fn no_progress(mut self, no_progress: bool) -> Self {
        self.no_progress = no_progress;
        self
    }

    /// Suppresses color escapes.
    ///
    /// Default: false
    pub fn no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// Shows info-level task logs in the live region and summary.
    ///
    /// Default: false
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Grace window between the first interrupt and forced cancellation.
    ///
    /// Default: 5s
    pub fn graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    /// Default retry policy, inherited by tasks that do not override it.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Result cache location. Defaults to the user cache directory when
    /// caching is enabled without an explicit path.
    pub fn cache_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_db_path = Some(path.into());
        self
    }

    /// Cache row lifetime. Zero disables caching entirely.
    ///
    /// Default: 0 (disabled)
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Injects a clock (tests).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Injects a jitter source (tests).
    pub fn jitter(mut self, jitter: Arc<dyn Jitter>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Registers a raw event listener.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        self.events.add(FnListener::new(f));
        self
    }

    /// Registers a callback invoked when any task reaches a terminal
    /// state, with the task name and the state it reached.
    pub fn on_task_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, TaskStatus) + Send + Sync + 'static,
    {
        self.events.add(FnListener::new(move |event| {
            if let TaskEvent::Finished {
                task_name, status, ..
            } = event
            {
                f(task_name, *status);
            }
        }));
        self
    }

    /// Registers a callback invoked before each retry sleep, with the
    /// task name, the retry attempt (1-indexed), and the backoff delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u32, Duration) + Send + Sync + 'static,
    {
        self.events.add(FnListener::new(move |event| {
            if let TaskEvent::Retrying {
                task_name,
                attempt,
                delay,
                ..
            } = event
            {
                f(task_name, *attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when a fingerprint lookup
    /// short-circuits a task.
    pub fn on_cache_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.events.add(FnListener::new(move |event| {
            if let TaskEvent::CacheHit { task_name, .. } = event {
                f(task_name);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SchedulerConfig {
        let cache_db_path = if self.cache_ttl.is_zero() {
            None
        } else {
            self.cache_db_path.or_else(SchedulerConfig::default_cache_path)
        };
        SchedulerConfig {
            max_concurrent: self.max_concurrent,
            no_progress: self.no_progress,
            no_color: self.no_color,
            verbose: self.verbose,
            graceful_timeout: self.graceful_timeout,
            retry: self.retry,
            cache_db_path,
            cache_ttl: self.cache_ttl,
            events: self.events,
            clock: self.clock,
            jitter: self.jitter,
        }
    }
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
