//! The scheduler: submission, dedup, admission, retries, caching, wait.

use crate::config::SchedulerConfig;
use crate::events::TaskEvent;
use crate::options::{RunFn, TaskOptions, TaskValue};
use crate::record::TaskHandle;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use taskpool_cache::{CacheEntry, CacheMetrics, ResultCache};
use taskpool_core::{CancelReason, TaskError, TaskId, TaskSnapshot};
use taskpool_gate::AdmissionGate;
use taskpool_render::{
    render_summary, stderr_is_terminal, terminal_width, FrameOptions, LiveRenderer, SnapshotSource,
};
use tokio::sync::watch;

pub(crate) struct Shared {
    pub(crate) config: SchedulerConfig,
    gate: AdmissionGate,
    cache: ResultCache,
    tasks: Mutex<Vec<TaskHandle>>,
    identities: Mutex<HashMap<String, TaskHandle>>,
    terminal_tx: watch::Sender<u64>,
    renderer: Mutex<Option<LiveRenderer>>,
    reaper: Mutex<Option<tokio::task::JoinHandle<()>>>,
    background_started: AtomicBool,
    interrupts: AtomicU32,
    next_id: AtomicU64,
    created_at: Instant,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.lock().take() {
            reaper.abort();
        }
    }
}

/// The task scheduler. Cloning shares the underlying instance; tasks are
/// owned by the scheduler and callers keep non-owning [`TaskHandle`]s.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Creates a scheduler with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates a scheduler from a built configuration.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        let gate = AdmissionGate::new(config.max_concurrent);
        let cache = match &config.cache_db_path {
            Some(path) => ResultCache::open(path, config.cache_ttl),
            None => ResultCache::disabled(),
        };
        let (terminal_tx, _) = watch::channel(0_u64);
        let created_at = config.clock.now();
        Self {
            shared: Arc::new(Shared {
                config,
                gate,
                cache,
                tasks: Mutex::new(Vec::new()),
                identities: Mutex::new(HashMap::new()),
                terminal_tx,
                renderer: Mutex::new(None),
                reaper: Mutex::new(None),
                background_started: AtomicBool::new(false),
                interrupts: AtomicU32::new(0),
                next_id: AtomicU64::new(1),
                created_at,
            }),
        }
    }

    /// Submits a task. Returns the record handle immediately; work starts
    /// in the background once the admission gate grants a slot.
    ///
    /// With an `identity` set, a second submission sharing it returns the
    /// first record (any status) and starts no new work.
    pub fn submit(&self, name: impl Into<String>, options: TaskOptions) -> TaskHandle {
        let name = name.into();

        if let Some(identity) = &options.identity {
            if let Some(existing) = self.shared.identities.lock().get(identity) {
                return existing.clone();
            }
        }

        let id = TaskId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let retry = options
            .retry
            .clone()
            .unwrap_or_else(|| self.shared.config.retry.clone());
        let handle = TaskHandle::new(
            id,
            name.clone(),
            options.identity.clone(),
            options.timeout,
            retry,
            options.model_label.clone(),
            options.prompt_label.clone(),
            Arc::clone(&self.shared.config.clock),
            self.shared.config.events.clone(),
            self.shared.terminal_tx.clone(),
        );

        let weak = Arc::downgrade(&self.shared);
        handle.set_fatal_hook(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                if let Some(renderer) = shared.renderer.lock().take() {
                    renderer.stop();
                }
            }
        }));

        if let Some(identity) = &options.identity {
            match self.shared.identities.lock().entry(identity.clone()) {
                // A concurrent submission with the same identity won.
                Entry::Occupied(existing) => return existing.get().clone(),
                Entry::Vacant(slot) => {
                    slot.insert(handle.clone());
                }
            }
        }

        self.shared.tasks.lock().push(handle.clone());
        self.shared.config.events.emit(&TaskEvent::Submitted {
            task_name: name,
            timestamp: Instant::now(),
        });

        #[cfg(feature = "metrics")]
        metrics::counter!("taskpool_tasks_submitted_total").increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(task = %handle.name(), id = %handle.id(), "task submitted");

        self.ensure_background();

        if self.shared.interrupts.load(Ordering::SeqCst) > 0 {
            handle.cancel_with(CancelReason::Shutdown);
            return handle;
        }

        match options.run {
            Some(run_fn) => {
                let shared = Arc::clone(&self.shared);
                let task = handle.clone();
                let fingerprint = options.fingerprint;
                tokio::spawn(async move {
                    run_task(shared, task, run_fn, fingerprint).await;
                });
            }
            None => {
                // Externally driven: running immediately, no gate slot.
                handle.mark_running();
                let task = handle.clone();
                let rx = self.shared.terminal_tx.subscribe();
                tokio::spawn(async move {
                    watch_external(task, rx).await;
                });
            }
        }

        handle
    }

    /// Best-effort cancellation of every non-terminal task. Pending tasks
    /// resolve to `Cancelled` without ever being admitted.
    pub fn cancel_all(&self) {
        let tasks = self.shared.tasks.lock().clone();
        for task in tasks {
            if !task.is_terminal() {
                task.token().cancel(CancelReason::Shutdown);
            }
        }
    }

    /// First call: cancel-all plus a grace timer that escalates. Second
    /// call (or the timer): every non-terminal task is resolved
    /// `Cancelled` and `wait` returns without yielding to user code.
    pub fn interrupt(&self) {
        let prior = self.shared.interrupts.fetch_add(1, Ordering::SeqCst);
        if prior == 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!("interrupt received, cancelling tasks");
            self.cancel_all();
            let scheduler = self.clone();
            let grace = self.shared.config.graceful_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                if !scheduler.all_terminal() {
                    scheduler.force_shutdown();
                }
            });
        } else {
            self.force_shutdown();
        }
    }

    /// Returns `true` once an interrupt has been observed.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.shared.interrupts.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn force_shutdown(&self) {
        #[cfg(feature = "tracing")]
        tracing::warn!("forcing shutdown, abandoning unfinished tasks");
        let tasks = self.shared.tasks.lock().clone();
        for task in tasks {
            task.force_cancel(CancelReason::Shutdown);
        }
    }

    /// Blocks until every submitted task is terminal, prints the final
    /// summary, and returns the exit code: `1` if any task failed or was
    /// cancelled, `0` otherwise (warnings do not fail the wait).
    pub async fn wait(&self) -> i32 {
        self.wait_inner(true).await
    }

    /// [`wait`](Self::wait) without the final render pass.
    pub async fn wait_silent(&self) -> i32 {
        self.wait_inner(false).await
    }

    async fn wait_inner(&self, with_summary: bool) -> i32 {
        let mut rx = self.shared.terminal_tx.subscribe();
        loop {
            if self.all_terminal() {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }

        if let Some(renderer) = self.shared.renderer.lock().take() {
            renderer.stop();
        }

        let snapshots = self.snapshots();
        let exit = i32::from(snapshots.iter().any(|s| s.status.is_failure()));

        if with_summary {
            let opts = FrameOptions {
                color: !self.shared.config.no_color && stderr_is_terminal(),
                verbose: self.shared.config.verbose,
                width: terminal_width(),
            };
            let total = self
                .shared
                .config
                .clock
                .now()
                .saturating_duration_since(self.shared.created_at);
            eprint!("{}", render_summary(&snapshots, total, &opts));
        }

        exit
    }

    /// Returns `true` when every submitted task is terminal (vacuously
    /// true with no submissions).
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.shared.tasks.lock().iter().all(TaskHandle::is_terminal)
    }

    /// Handles to every submitted task, in submission order.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskHandle> {
        self.shared.tasks.lock().clone()
    }

    /// Point-in-time snapshots of every task, in submission order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        let handles = self.shared.tasks.lock().clone();
        handles.iter().map(TaskHandle::snapshot).collect()
    }

    /// Reconfigures the admission cap at runtime. In-flight tasks are not
    /// preempted; the new cap holds once they drain.
    pub fn set_max_concurrent(&self, max: usize) {
        self.shared.gate.set_capacity(max);
    }

    /// The result cache, for callers fingerprinting their own work.
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.shared.cache
    }

    /// Drops every record. Handles held by callers stay readable.
    pub fn reset(&self) {
        self.shared.tasks.lock().clear();
        self.shared.identities.lock().clear();
    }

    fn ensure_background(&self) {
        if self.shared.background_started.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.shared.config.no_progress && stderr_is_terminal() {
            let source = Arc::new(SchedulerSnapshots {
                shared: Arc::downgrade(&self.shared),
            });
            let opts = FrameOptions {
                color: !self.shared.config.no_color,
                verbose: self.shared.config.verbose,
                width: terminal_width(),
            };
            *self.shared.renderer.lock() = Some(LiveRenderer::spawn(source, opts));
        }
        if self.shared.cache.is_enabled() {
            *self.shared.reaper.lock() = Some(self.shared.cache.spawn_reaper());
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderer-facing view; weak so the repaint loop never keeps a dropped
/// scheduler alive.
struct SchedulerSnapshots {
    shared: Weak<Shared>,
}

impl SnapshotSource for SchedulerSnapshots {
    fn snapshot(&self) -> Vec<TaskSnapshot> {
        match self.shared.upgrade() {
            Some(shared) => {
                let handles = shared.tasks.lock().clone();
                handles.iter().map(TaskHandle::snapshot).collect()
            }
            None => Vec::new(),
        }
    }
}

async fn deadline_sleep(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

fn resolve_by_token(handle: &TaskHandle) {
    match handle.token().reason() {
        Some(CancelReason::Timeout) => handle.complete_failed(TaskError::Timeout(
            handle.timeout().unwrap_or_default(),
        )),
        Some(reason) => handle.cancel_with(reason),
        None => handle.cancel_with(CancelReason::UserRequested),
    }
}

fn resolve_timeout(handle: &TaskHandle) {
    handle.token().cancel(CancelReason::Timeout);
    handle.complete_failed(TaskError::Timeout(handle.timeout().unwrap_or_default()));
}

/// Keeps an externally-driven task honest: resolves it on cancellation or
/// timeout, and goes away quietly once someone terminates it explicitly.
async fn watch_external(handle: TaskHandle, mut rx: watch::Receiver<u64>) {
    let deadline = handle
        .timeout()
        .map(|t| tokio::time::Instant::now() + t);
    let token = handle.token();
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                resolve_by_token(&handle);
                return;
            }
            _ = deadline_sleep(deadline) => {
                resolve_timeout(&handle);
                return;
            }
            changed = rx.changed() => {
                if handle.is_terminal() || changed.is_err() {
                    return;
                }
            }
        }
    }
}

async fn run_task(
    shared: Arc<Shared>,
    handle: TaskHandle,
    run_fn: RunFn,
    fingerprint: Option<String>,
) {
    let token = handle.token();

    if let Some(fp) = fingerprint.as_deref() {
        if let Some(entry) = shared.cache.get_async(fp).await {
            handle.log_info("cache hit");
            shared.config.events.emit(&TaskEvent::CacheHit {
                task_name: handle.name(),
                timestamp: Instant::now(),
                fingerprint: fp.to_string(),
            });

            #[cfg(feature = "metrics")]
            metrics::counter!("taskpool_cache_hits_total").increment(1);

            if entry.is_failure() {
                let message = entry.error.unwrap_or_default();
                handle.complete_from_cache(None, Some(TaskError::Failed(message)));
            } else {
                let value = serde_json::from_str::<TaskValue>(&entry.response)
                    .unwrap_or(TaskValue::String(entry.response));
                handle.complete_from_cache(Some(value), None);
            }
            return;
        }
    }

    let permit = match shared.gate.acquire(&token).await {
        Ok(permit) => permit,
        Err(_) => {
            resolve_by_token(&handle);
            return;
        }
    };
    if !handle.mark_running() {
        // Went terminal while parked at the gate; the permit drops here.
        return;
    }

    shared.config.events.emit(&TaskEvent::Admitted {
        task_name: handle.name(),
        timestamp: Instant::now(),
    });

    if token.is_cancelled() {
        resolve_by_token(&handle);
        drop(permit);
        return;
    }

    // The timeout runs from admission; backoff sleeps count against it.
    let deadline = handle
        .timeout()
        .map(|t| tokio::time::Instant::now() + t);
    let policy = handle.retry_policy().clone();

    let outcome = loop {
        let mut attempt = tokio::spawn((run_fn)(handle.clone()));
        tokio::select! {
            _ = token.cancelled() => {
                // The attempt keeps running until it observes the token;
                // its eventual result is discarded.
                break Outcome::ByToken;
            }
            _ = deadline_sleep(deadline) => {
                break Outcome::Timeout;
            }
            joined = &mut attempt => {
                // A terminal call from inside the work function wins over
                // whatever the function returned.
                if handle.is_terminal() {
                    break Outcome::AlreadyResolved;
                }
                match joined {
                    Err(join_err) => {
                        break Outcome::Failed {
                            message: format!("task panicked: {join_err}"),
                            retryable: false,
                        };
                    }
                    Ok(Ok(value)) => {
                        break Outcome::Success(value);
                    }
                    Ok(Err(err)) => {
                        let message = err.to_string();
                        let retryable = policy.is_retryable(&message);
                        if retryable && handle.retry_count() < policy.max_retries() {
                            let attempt_no = handle.note_retry(&message);
                            let delay = policy.delay(attempt_no, shared.config.jitter.as_ref());
                            shared.config.events.emit(&TaskEvent::Retrying {
                                task_name: handle.name(),
                                timestamp: Instant::now(),
                                attempt: attempt_no,
                                delay,
                            });

                            #[cfg(feature = "metrics")]
                            metrics::counter!("taskpool_task_retries_total").increment(1);

                            tokio::select! {
                                _ = token.cancelled() => {
                                    break Outcome::ByToken;
                                }
                                _ = deadline_sleep(deadline) => {
                                    break Outcome::Timeout;
                                }
                                _ = tokio::time::sleep(delay) => {}
                            }
                        } else {
                            break Outcome::Failed { message, retryable };
                        }
                    }
                }
            }
        }
    };
    drop(permit);

    // The cache write lands before the terminal transition, so a caller
    // returning from `wait` observes the stored outcome.
    match outcome {
        Outcome::Success(value) => {
            if let Some(fp) = fingerprint.as_deref() {
                store_outcome(&shared, &handle, fp, &value, None).await;
            }
            handle.complete_success(value);
        }
        Outcome::Failed { message, retryable } => {
            if !retryable {
                if let Some(fp) = fingerprint.as_deref() {
                    store_outcome(&shared, &handle, fp, &None, Some(&message)).await;
                }
            }
            handle.complete_failed(TaskError::Failed(message));
        }
        Outcome::Timeout => resolve_timeout(&handle),
        Outcome::ByToken => resolve_by_token(&handle),
        Outcome::AlreadyResolved => {}
    }
}

enum Outcome {
    Success(Option<TaskValue>),
    Failed { message: String, retryable: bool },
    Timeout,
    ByToken,
    AlreadyResolved,
}

/// Stores a non-retryable terminal outcome: successes and failures whose
/// error was classified non-retryable. Cancellations, timeouts, and
/// exhausted transient errors are not cached.
async fn store_outcome(
    shared: &Shared,
    handle: &TaskHandle,
    fingerprint: &str,
    value: &Option<TaskValue>,
    failure: Option<&str>,
) {
    let snapshot = handle.snapshot();
    let mut entry = match failure {
        None => {
            let response = value
                .as_ref()
                .map(|value| value.to_string())
                .unwrap_or_else(|| "null".to_string());
            CacheEntry::success(fingerprint, response)
        }
        Some(message) => CacheEntry::failure(fingerprint, message),
    };

    entry = entry
        .with_task_label(snapshot.name)
        .with_metrics(CacheMetrics {
            duration_ms: snapshot.elapsed.as_millis() as u64,
            ..CacheMetrics::default()
        });
    if let Some(model) = snapshot.model_label {
        entry = entry.with_model(model);
    }
    shared.cache.set_async(entry).await;
}
