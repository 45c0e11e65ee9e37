//! Shared building blocks for the taskpool scheduler family.
//!
//! This crate carries the pieces every other taskpool crate agrees on:
//!
//! - the task model ([`TaskStatus`], [`Progress`], [`LogEntry`]) and the
//!   read-only [`TaskSnapshot`] the renderer consumes,
//! - injectable time and randomness sources ([`Clock`], [`Jitter`]) so
//!   schedulers and retry policies are deterministic under test,
//! - a cloneable [`CancellationToken`] with a first-wins
//!   [`CancelReason`], the only cancellation signal user code ever sees,
//! - the unified [`TaskError`] surfaced through terminal task states,
//! - the [`EventListeners`] plumbing used for observability hooks.
//!
//! Nothing here spawns work or owns a runtime; higher crates do.

pub mod cancel;
pub mod clock;
pub mod error;
pub mod events;
pub mod snapshot;
pub mod status;

pub use cancel::{CancelReason, CancellationToken};
pub use clock::{Clock, FixedJitter, Jitter, ManualClock, SystemClock, ThreadRngJitter};
pub use error::{BoxError, TaskError};
pub use events::{EventListener, EventListeners, FnListener, SchedulerEvent};
pub use snapshot::TaskSnapshot;
pub use status::{LogEntry, LogLevel, Progress, TaskId, TaskStatus};
