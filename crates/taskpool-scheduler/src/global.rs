//! Process-wide scheduler convenience.
//!
//! A lazily-initialized singleton for applications that want one shared
//! scheduler without threading it everywhere. All semantics live on the
//! [`Scheduler`] instance; the singleton is only a registry. Handles
//! obtained before a [`configure`] call stay valid against the instance
//! that produced them.

use crate::config::SchedulerConfig;
use crate::phase::PhaseTracker;
use crate::scheduler::Scheduler;
use parking_lot::RwLock;
use std::sync::OnceLock;

struct GlobalState {
    scheduler: Scheduler,
    phases: std::sync::Arc<PhaseTracker>,
}

fn state() -> &'static RwLock<GlobalState> {
    static STATE: OnceLock<RwLock<GlobalState>> = OnceLock::new();
    STATE.get_or_init(|| RwLock::new(make(SchedulerConfig::default())))
}

fn make(config: SchedulerConfig) -> GlobalState {
    let scheduler = Scheduler::with_config(config);
    let phases = std::sync::Arc::new(PhaseTracker::new(scheduler.clone()));
    GlobalState { scheduler, phases }
}

/// The process-wide scheduler, created with defaults on first use.
#[must_use]
pub fn global() -> Scheduler {
    state().read().scheduler.clone()
}

/// Re-applies configuration by swapping in a fresh instance. Existing
/// handles keep reading from the instance that created them.
pub fn configure(config: SchedulerConfig) -> Scheduler {
    let mut guard = state().write();
    *guard = make(config);
    guard.scheduler.clone()
}

/// The process-wide phase tracker bound to the current global scheduler.
#[must_use]
pub fn phases() -> std::sync::Arc<PhaseTracker> {
    state().read().phases.clone()
}

/// Opens a phase on the global tracker.
pub fn start_phase(name: impl Into<String>) -> crate::TaskHandle {
    phases().start_phase(name)
}

/// Logs on the globally open phase.
pub fn update_phase(message: impl Into<String>) {
    phases().update_phase(message);
}

/// Completes the globally open phase.
pub fn complete_phase() {
    phases().complete_phase();
}
