//! Bounded-concurrency admission gate.
//!
//! The gate is the single blocking point between a pending task and its
//! `Running` transition. It is a semaphore with two extra properties the
//! scheduler needs:
//!
//! - **Cancellable waits**: [`AdmissionGate::acquire`] races the permit
//!   against a [`CancellationToken`], so a pending task resolves to
//!   `Cancelled` without ever being admitted.
//! - **Runtime reconfiguration**: [`AdmissionGate::set_capacity`] swaps in
//!   a fresh semaphore and retires the old one. Tasks already holding
//!   permits are not preempted; parked waiters migrate to the new
//!   semaphore. Once the old holders drain, at most the new cap run
//!   concurrently.
//!
//! A capacity of `0` means unbounded: no gate at all.
//!
//! # Example
//!
//! ```
//! use taskpool_gate::AdmissionGate;
//! use taskpool_core::CancellationToken;
//!
//! # async fn example() {
//! let gate = AdmissionGate::new(2);
//! let token = CancellationToken::new();
//!
//! let _slot = gate.acquire(&token).await.unwrap();
//! assert_eq!(gate.available(), Some(1));
//! # }
//! ```

mod gate;

pub use gate::{AdmissionGate, GateError, GatePermit};
