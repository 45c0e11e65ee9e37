//! Live terminal view over scheduler state.
//!
//! The renderer repaints a multi-line region on the diagnostic stream at a
//! fixed cadence (about 10 Hz). Each repaint works from a snapshot pulled
//! through [`SnapshotSource`]; no lock is ever held across a paint, and
//! the renderer never mutates task state.
//!
//! Layout, top to bottom:
//!
//! 1. completed tasks in submission order, glyph + label + elapsed time,
//! 2. running tasks with a progress bar (spinner when indeterminate) and a
//!    `(retry k/N)` suffix once retries have happened,
//! 3. pending tasks, listed individually up to three and collapsed into a
//!    one-line summary beyond that.
//!
//! Warnings and errors are always interleaved under their task; info logs
//! only in verbose mode. When the stream is not a terminal the scheduler
//! skips the live region entirely (no cursor control on pipes) and only
//! the final summary is printed.

mod frame;
mod renderer;
mod style;
mod summary;

pub use frame::{build_frame, format_elapsed, FrameOptions};
pub use renderer::{
    stderr_is_terminal, terminal_width, LiveRenderer, SnapshotSource, TICK_INTERVAL,
};
pub use summary::render_summary;
