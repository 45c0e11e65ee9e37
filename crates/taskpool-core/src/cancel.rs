//! Cooperative cancellation primitives.
//!
//! The [`CancellationToken`] is the only cancellation signal user work
//! functions ever observe. The scheduler cancels it on explicit cancel,
//! timeout, scheduler-wide cancel-all, and shutdown; user code is expected
//! to notice and return. Nothing here kills work forcibly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Why a task was cancelled. The first recorded reason wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled this task directly.
    UserRequested,
    /// The task's deadline elapsed.
    Timeout,
    /// Scheduler-wide cancel-all, typically from an OS interrupt.
    Shutdown,
}

impl CancelReason {
    /// Human-readable description used in logs and error text.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            CancelReason::UserRequested => "cancelled by caller",
            CancelReason::Timeout => "timed out",
            CancelReason::Shutdown => "cancelled by shutdown",
        }
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

struct TokenInner {
    cancelled: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
    tx: watch::Sender<bool>,
}

/// A cloneable, cheaply-shareable cancellation token.
///
/// All clones share the same state; cancelling one makes every clone
/// observe `is_cancelled() == true` immediately. Cancellation is
/// idempotent and only the first reason is kept.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
                tx,
            }),
        }
    }

    /// Signals cancellation with the given reason.
    ///
    /// Idempotent; later calls still wake waiters but do not overwrite
    /// the recorded reason.
    pub fn cancel(&self, reason: CancelReason) {
        {
            let mut guard = self.inner.reason.lock().unwrap_or_else(|e| e.into_inner());
            if guard.is_none() {
                *guard = Some(reason);
            }
        }
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.tx.send_replace(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the recorded reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        *self.inner.reason.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Completes when the token is cancelled.
    ///
    /// Resolves immediately if cancellation already happened. Backed by a
    /// watch channel, so a cancel issued between the fast-path check and
    /// subscription is never lost.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let mut rx = self.inner.tx.subscribe();
        // wait_for checks the current value before parking.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
