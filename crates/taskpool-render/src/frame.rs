//! Pure frame construction: snapshots in, lines out.

use crate::style::{glyph, paint, status_color, truncate, SPINNER_FRAMES, DIM, RED, YELLOW};
use std::time::Duration;
use taskpool_core::{LogLevel, TaskSnapshot, TaskStatus};

const BAR_WIDTH: usize = 20;
const MAX_LISTED_PENDING: usize = 3;
const PENDING_PREVIEW: usize = 2;

/// Options shared by the live frame and the final summary.
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub color: bool,
    pub verbose: bool,
    pub width: usize,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            color: false,
            verbose: false,
            width: 80,
        }
    }
}

/// Formats an elapsed duration the way the renderer and summary show it.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else if secs < 3600.0 {
        let minutes = (secs / 60.0) as u64;
        let rest = secs as u64 % 60;
        format!("{minutes}m{rest:02}s")
    } else {
        let hours = (secs / 3600.0) as u64;
        let minutes = (secs as u64 % 3600) / 60;
        format!("{hours}h{minutes:02}m")
    }
}

/// Builds one frame of the live region. `spinner_tick` advances the
/// spinner animation between repaints.
#[must_use]
pub fn build_frame(tasks: &[TaskSnapshot], opts: &FrameOptions, spinner_tick: usize) -> Vec<String> {
    let mut lines = Vec::new();

    let completed: Vec<&TaskSnapshot> =
        tasks.iter().filter(|t| t.status.is_terminal()).collect();
    let running: Vec<&TaskSnapshot> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Running)
        .collect();
    let pending: Vec<&TaskSnapshot> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .collect();

    for task in &completed {
        lines.push(completed_line(task, opts));
        push_log_lines(&mut lines, task, opts);
    }

    for task in &running {
        lines.push(running_line(task, opts, spinner_tick));
        push_log_lines(&mut lines, task, opts);
    }

    if pending.len() <= MAX_LISTED_PENDING {
        for task in &pending {
            let line = format!("{} {} (pending)", glyph(TaskStatus::Pending), task.name);
            lines.push(paint(DIM, &truncate(&line, opts.width), opts.color));
        }
    } else {
        let total = tasks.len();
        let processing = total - pending.len();
        let line = format!(
            "Processing {processing} of {total} tasks ({} pending)",
            pending.len()
        );
        lines.push(paint(DIM, &truncate(&line, opts.width), opts.color));
        for task in pending.iter().take(PENDING_PREVIEW) {
            let line = format!("  · {}", task.name);
            lines.push(paint(DIM, &truncate(&line, opts.width), opts.color));
        }
        let more = pending.len() - PENDING_PREVIEW;
        lines.push(paint(DIM, &format!("  … and {more} more"), opts.color));
    }

    lines
}

fn completed_line(task: &TaskSnapshot, opts: &FrameOptions) -> String {
    let mark = paint(status_color(task.status), glyph(task.status), opts.color);
    let elapsed = format_elapsed(task.elapsed);
    let label = truncate(&task.name, opts.width.saturating_sub(elapsed.len() + 4));
    format!("{mark} {label} {}", paint(DIM, &format!("({elapsed})"), opts.color))
}

fn running_line(task: &TaskSnapshot, opts: &FrameOptions, spinner_tick: usize) -> String {
    let indicator = if task.progress.is_indeterminate() {
        SPINNER_FRAMES[spinner_tick % SPINNER_FRAMES.len()].to_string()
    } else {
        progress_bar(task.progress.fraction())
    };
    let indicator = paint(status_color(TaskStatus::Running), &indicator, opts.color);

    let retry = if task.is_retrying() {
        format!(" (retry {}/{})", task.retry_count, task.max_retries)
    } else {
        String::new()
    };
    let elapsed = format_elapsed(task.elapsed);
    let budget = opts
        .width
        .saturating_sub(BAR_WIDTH + retry.len() + elapsed.len() + 8);
    let label = truncate(&task.name, budget.max(8));
    format!(
        "{indicator} {label}{} {}",
        paint(YELLOW, &retry, opts.color && !retry.is_empty()),
        paint(DIM, &format!("({elapsed})"), opts.color)
    )
}

fn progress_bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    let mut bar = String::with_capacity(BAR_WIDTH + 2);
    bar.push('[');
    for i in 0..BAR_WIDTH {
        bar.push(if i < filled { '#' } else { '-' });
    }
    bar.push(']');
    bar
}

fn push_log_lines(lines: &mut Vec<String>, task: &TaskSnapshot, opts: &FrameOptions) {
    for log in &task.logs {
        let (prefix, color) = match log.level {
            LogLevel::Info => {
                if !opts.verbose {
                    continue;
                }
                ("", DIM)
            }
            LogLevel::Warn => ("warning: ", YELLOW),
            LogLevel::Error => ("error: ", RED),
        };
        let line = truncate(&format!("    {prefix}{}", log.message), opts.width);
        lines.push(paint(color, &line, opts.color));
    }
}
