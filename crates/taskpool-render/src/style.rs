//! Glyphs, spinner frames, and ANSI color handling.

use taskpool_core::TaskStatus;

pub(crate) const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(crate) const RESET: &str = "\x1b[0m";
pub(crate) const GREEN: &str = "\x1b[32m";
pub(crate) const RED: &str = "\x1b[31m";
pub(crate) const YELLOW: &str = "\x1b[33m";
pub(crate) const CYAN: &str = "\x1b[36m";
pub(crate) const DIM: &str = "\x1b[2m";

/// Status glyph shown in front of completed tasks.
pub(crate) fn glyph(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Success => "✓",
        TaskStatus::Failed => "✗",
        TaskStatus::Warning => "⚠",
        TaskStatus::Cancelled => "⊘",
        TaskStatus::Pending => "·",
        TaskStatus::Running => "›",
    }
}

pub(crate) fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Success => GREEN,
        TaskStatus::Failed => RED,
        TaskStatus::Warning => YELLOW,
        TaskStatus::Cancelled => DIM,
        TaskStatus::Running => CYAN,
        TaskStatus::Pending => DIM,
    }
}

/// Wraps `text` in `color` codes when color output is on.
pub(crate) fn paint(color: &str, text: &str, use_color: bool) -> String {
    if use_color {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Truncates to `max` visible characters, appending an ellipsis.
///
/// Works on character counts, which is close enough for log labels; the
/// goal is keeping one task on one terminal row.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{truncated}…")
}
