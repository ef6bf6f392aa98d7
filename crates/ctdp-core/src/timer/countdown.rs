//! Countdown calculation for the live timer display.
//!
//! Pure functions over absolute timestamps, shared by the status line and the
//! automatic-timeout checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::{Task, TaskState};
use crate::clock::elapsed_ms;

/// Milliseconds left of a `duration_minutes` window opened at `start`.
pub fn remaining_ms(now: DateTime<Utc>, start: DateTime<Utc>, duration_minutes: u32) -> u64 {
    (u64::from(duration_minutes) * 60_000).saturating_sub(elapsed_ms(now, start))
}

/// Format as `mm:ss`, rounding partial seconds up.
///
/// 59 900 ms renders `01:00`: a countdown never shows less than what is left.
pub fn format_countdown(ms: u64) -> String {
    let total_seconds = ms.div_ceil(1000);
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// `remaining / total` as a percentage in `[0, 100]`. A zero total is full.
pub fn percent_remaining(remaining_ms: u64, total_ms: u64) -> f64 {
    if total_ms == 0 {
        return 100.0;
    }
    (remaining_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, 100.0)
}

/// Snapshot of the countdown currently relevant to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub state: TaskState,
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub percent: f64,
    pub display: String,
}

impl Countdown {
    /// Countdown for whatever window the task is in.
    ///
    /// Booked counts down the booking delay, active the session, paused the
    /// precedent's pause budget. Idle shows the full booking delay.
    pub fn for_task(task: &Task, now: DateTime<Utc>) -> Self {
        let (remaining_ms, total_ms) = match task.state {
            TaskState::Booked => window(now, task.booking_start_time, task.booking_duration),
            TaskState::Active => window(now, task.session_start_time, task.session_duration),
            TaskState::Paused => match task.active_precedent() {
                Some(p) => window(now, task.pause_start_time, p.auto_fail_minutes),
                None => (0, 0),
            },
            TaskState::Idle => (task.booking_ms(), task.booking_ms()),
        };
        Self {
            state: task.state,
            remaining_ms,
            total_ms,
            percent: percent_remaining(remaining_ms, total_ms),
            display: format_countdown(remaining_ms),
        }
    }
}

fn window(now: DateTime<Utc>, start: Option<DateTime<Utc>>, minutes: u32) -> (u64, u64) {
    let total = u64::from(minutes) * 60_000;
    match start {
        Some(start) => (remaining_ms(now, start, minutes), total),
        None => (0, total),
    }
}

/// Compact status line for a running task, e.g. `🎯 24:59`.
///
/// Idle tasks and paused tasks whose precedent no longer resolves have none.
pub fn status_text(task: &Task, now: DateTime<Utc>) -> Option<String> {
    let icon = match task.state {
        TaskState::Active => "🎯",
        TaskState::Booked => "🗓️",
        TaskState::Paused if task.active_precedent().is_some() => "⏸️",
        _ => return None,
    };
    let countdown = Countdown::for_task(task, now);
    Some(format!("{icon} {}", countdown.display))
}
