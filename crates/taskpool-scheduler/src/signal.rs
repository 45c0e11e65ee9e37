//! OS interrupt handling: cooperative cancellation with a grace window.
//!
//! The first interrupt starts a graceful shutdown: every task's token is
//! cancelled and the grace countdown begins. A second interrupt, or the
//! countdown elapsing, resolves every non-terminal task as `Cancelled` so
//! `wait` returns even if user code has not yielded.

use crate::scheduler::Scheduler;

/// Subscribes the scheduler to interrupt and termination signals.
///
/// The returned handle keeps the listener alive; aborting it detaches the
/// scheduler from signal delivery. Installing is idempotent in effect:
/// extra listeners only deliver extra [`Scheduler::interrupt`] calls,
/// which the scheduler already tolerates.
pub fn install_signal_handler(scheduler: &Scheduler) -> tokio::task::JoinHandle<()> {
    let scheduler = scheduler.clone();
    tokio::spawn(async move {
        loop {
            wait_for_signal().await;
            scheduler.interrupt();
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
