//! Serial "current phase" tracking layered over the scheduler.
//!
//! At most one phase task is open at a time. Starting a phase closes the
//! previous one with success; the phase task itself just parks on its
//! cancellation token so the live renderer shows it as running.

use crate::options::TaskOptions;
use crate::record::TaskHandle;
use crate::scheduler::Scheduler;
use parking_lot::Mutex;

/// Serial phase tracker. Concurrent callers serialize on one lock.
pub struct PhaseTracker {
    scheduler: Scheduler,
    current: Mutex<Option<TaskHandle>>,
}

impl PhaseTracker {
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            current: Mutex::new(None),
        }
    }

    /// Closes the open phase with success and opens a new one.
    pub fn start_phase(&self, name: impl Into<String>) -> TaskHandle {
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            finish(&previous);
        }
        let handle = self.scheduler.submit(
            name,
            TaskOptions::new().run(|handle: TaskHandle| async move {
                handle.cancelled().await;
                Ok(None)
            }),
        );
        *current = Some(handle.clone());
        handle
    }

    /// Logs an info entry on the open phase; no-op without one.
    pub fn update_phase(&self, message: impl Into<String>) {
        if let Some(phase) = self.current.lock().as_ref() {
            phase.log_info(message);
        }
    }

    /// Marks the open phase `Success`; no-op without one.
    pub fn complete_phase(&self) {
        if let Some(phase) = self.current.lock().take() {
            finish(&phase);
        }
    }

    /// The open phase, if any.
    #[must_use]
    pub fn current(&self) -> Option<TaskHandle> {
        self.current.lock().clone()
    }
}

fn finish(phase: &TaskHandle) {
    // A phase may still be parked at the gate; resolve it from any
    // non-terminal state rather than requiring Running.
    phase.complete_success(None);
    // Unparks the phase's work function; the record is already terminal
    // so the token only unwinds the runner.
    phase.cancel();
}
