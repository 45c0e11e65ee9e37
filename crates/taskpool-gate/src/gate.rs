//! Gate implementation.

use parking_lot::Mutex;
use std::sync::Arc;
use taskpool_core::CancellationToken;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Errors returned by [`AdmissionGate::acquire`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    /// The caller's token was cancelled while waiting for a slot.
    #[error("admission wait cancelled")]
    Cancelled,
}

/// An admission slot. Dropping it releases the slot.
///
/// Permits acquired before a reconfiguration stay valid; they drain
/// against the semaphore that granted them.
#[derive(Debug)]
pub struct GatePermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl GatePermit {
    fn bounded(permit: OwnedSemaphorePermit) -> Self {
        Self {
            _permit: Some(permit),
        }
    }

    fn unbounded() -> Self {
        Self { _permit: None }
    }
}

struct GateState {
    capacity: usize,
    semaphore: Option<Arc<Semaphore>>,
}

/// Bounded-concurrency gate; see the crate docs.
#[derive(Clone)]
pub struct AdmissionGate {
    state: Arc<Mutex<GateState>>,
}

impl AdmissionGate {
    /// Creates a gate with the given cap. `0` means unbounded.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                capacity,
                semaphore: (capacity > 0).then(|| Arc::new(Semaphore::new(capacity))),
            })),
        }
    }

    /// Waits for a slot, or returns [`GateError::Cancelled`] if the token
    /// fires first.
    ///
    /// FIFO hand-out is not guaranteed; the scheduler makes no admission
    /// ordering promises among pending tasks.
    pub async fn acquire(&self, token: &CancellationToken) -> Result<GatePermit, GateError> {
        loop {
            let semaphore = {
                let state = self.state.lock();
                match &state.semaphore {
                    Some(sem) => Arc::clone(sem),
                    None => return Ok(GatePermit::unbounded()),
                }
            };

            tokio::select! {
                acquired = semaphore.acquire_owned() => match acquired {
                    Ok(permit) => return Ok(GatePermit::bounded(permit)),
                    // The semaphore was retired by a reconfiguration while
                    // we were parked; re-acquire against the current one.
                    Err(_) => continue,
                },
                _ = token.cancelled() => return Err(GateError::Cancelled),
            }
        }
    }

    /// Tries to take a slot without waiting.
    #[must_use]
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let semaphore = {
            let state = self.state.lock();
            match &state.semaphore {
                Some(sem) => Arc::clone(sem),
                None => return Some(GatePermit::unbounded()),
            }
        };
        semaphore.try_acquire_owned().ok().map(GatePermit::bounded)
    }

    /// Reconfigures the cap. `0` removes the bound.
    ///
    /// In-flight holders keep their slots and release them against the
    /// retired semaphore, so the new cap holds once they drain.
    pub fn set_capacity(&self, capacity: usize) {
        let retired = {
            let mut state = self.state.lock();
            if state.capacity == capacity {
                return;
            }
            state.capacity = capacity;
            std::mem::replace(
                &mut state.semaphore,
                (capacity > 0).then(|| Arc::new(Semaphore::new(capacity))),
            )
        };
        // Wake parked waiters so they migrate to the new semaphore.
        if let Some(sem) = retired {
            sem.close();
        }
    }

    /// The configured cap; `0` means unbounded.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Slots currently free, or `None` when unbounded.
    #[must_use]
    pub fn available(&self) -> Option<usize> {
        self.state
            .lock()
            .semaphore
            .as_ref()
            .map(|sem| sem.available_permits())
    }
}
