//! Final one-shot summary printed after `wait`.

use crate::frame::{format_elapsed, FrameOptions};
use crate::style::{glyph, paint, status_color, truncate, DIM, RED, YELLOW};
use std::time::Duration;
use taskpool_core::{LogLevel, TaskSnapshot, TaskStatus};

/// Renders the final summary: every task once, in submission order, with
/// its log trail, a total-duration line, and a trouble count when any
/// task failed, was cancelled, or warned.
#[must_use]
pub fn render_summary(
    tasks: &[TaskSnapshot],
    total: Duration,
    opts: &FrameOptions,
) -> String {
    let mut out = String::new();

    for task in tasks {
        let mark = paint(status_color(task.status), glyph(task.status), opts.color);
        let elapsed = format_elapsed(task.elapsed);
        let label = truncate(&task.name, opts.width.saturating_sub(elapsed.len() + 4));
        out.push_str(&format!(
            "{mark} {label} {}\n",
            paint(DIM, &format!("({elapsed})"), opts.color)
        ));

        if let Some(error) = &task.error {
            let line = truncate(&format!("    error: {error}"), opts.width);
            out.push_str(&paint(RED, &line, opts.color));
            out.push('\n');
        }
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
            out.push_str(&paint(color, &line, opts.color));
            out.push('\n');
        }
    }

    out.push_str(&format!(
        "{} tasks in {}\n",
        tasks.len(),
        format_elapsed(total)
    ));

    let failed = count(tasks, TaskStatus::Failed);
    let cancelled = count(tasks, TaskStatus::Cancelled);
    let warned = count(tasks, TaskStatus::Warning);
    if failed + cancelled + warned > 0 {
        let mut parts = Vec::new();
        if failed > 0 {
            parts.push(format!("{failed} failed"));
        }
        if cancelled > 0 {
            parts.push(format!("{cancelled} cancelled"));
        }
        if warned > 0 {
            parts.push(format!("{warned} warned"));
        }
        let line = parts.join(", ");
        out.push_str(&paint(
            if failed + cancelled > 0 { RED } else { YELLOW },
            &line,
            opts.color,
        ));
        out.push('\n');
    }

    out
}

fn count(tasks: &[TaskSnapshot], status: TaskStatus) -> usize {
    tasks.iter().filter(|t| t.status == status).count()
}
