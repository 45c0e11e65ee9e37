//! The live repaint loop.

use crate::frame::{build_frame, FrameOptions};
use parking_lot::Mutex;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use taskpool_core::TaskSnapshot;

/// Repaint cadence of the live region.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Where the renderer pulls its per-tick snapshot from.
///
/// Implementations take their locks inside `snapshot` and release them
/// before returning; the renderer never holds scheduler state across a
/// paint.
pub trait SnapshotSource: Send + Sync + 'static {
    fn snapshot(&self) -> Vec<TaskSnapshot>;
}

/// Returns `true` when the diagnostic stream is an interactive terminal.
#[must_use]
pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Best-effort terminal width probe; defaults to 80 columns.
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(80)
}

struct PaintState {
    out: Box<dyn Write + Send>,
    lines_drawn: usize,
}

impl PaintState {
    fn repaint(&mut self, lines: &[String]) {
        if self.lines_drawn > 0 {
            let _ = write!(self.out, "\x1b[{}A", self.lines_drawn);
        }
        let _ = write!(self.out, "\r\x1b[0J");
        for line in lines {
            let _ = writeln!(self.out, "{line}");
        }
        let _ = self.out.flush();
        self.lines_drawn = lines.len();
    }

    fn clear(&mut self) {
        if self.lines_drawn > 0 {
            let _ = write!(self.out, "\x1b[{}A", self.lines_drawn);
            let _ = write!(self.out, "\r\x1b[0J");
            let _ = self.out.flush();
            self.lines_drawn = 0;
        }
    }
}

/// Drives the live region on its own tokio task.
///
/// Dropping the renderer aborts the loop without clearing; call
/// [`stop`](LiveRenderer::stop) first to leave the terminal clean.
pub struct LiveRenderer {
    state: Arc<Mutex<PaintState>>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl LiveRenderer {
    /// Spawns the repaint loop writing to stderr.
    #[must_use]
    pub fn spawn(source: Arc<dyn SnapshotSource>, opts: FrameOptions) -> Self {
        Self::spawn_with_writer(source, opts, Box::new(std::io::stderr()))
    }

    /// Spawns the repaint loop writing to the given sink (tests).
    #[must_use]
    pub fn spawn_with_writer(
        source: Arc<dyn SnapshotSource>,
        opts: FrameOptions,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        let state = Arc::new(Mutex::new(PaintState {
            out: writer,
            lines_drawn: 0,
        }));

        let loop_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(TICK_INTERVAL);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut spinner_tick = 0_usize;
            loop {
                ticks.tick().await;
                let snapshot = source.snapshot();
                let lines = build_frame(&snapshot, &opts, spinner_tick);
                spinner_tick = spinner_tick.wrapping_add(1);
                loop_state.lock().repaint(&lines);
            }
        });

        Self {
            state,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stops the loop and erases the live region.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
        self.state.lock().clear();
    }

    /// Returns `true` until [`stop`](LiveRenderer::stop) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }
}

impl Drop for LiveRenderer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}
