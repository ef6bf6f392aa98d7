use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TaskState;

/// Every state change of a chain task produces an Event.
/// The CLI prints them; the poller collects them per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionBooked {
        task_id: String,
        booking_minutes: u32,
        at: DateTime<Utc>,
    },
    SessionStarted {
        task_id: String,
        /// True when a booking was honored (aux chain incremented).
        from_booking: bool,
        aux_chain_count: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        task_id: String,
        precedent_id: String,
        precedent_name: String,
        at: DateTime<Utc>,
    },
    SessionResumed {
        task_id: String,
        paused_ms: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        task_id: String,
        main_chain_count: u32,
        at: DateTime<Utc>,
    },
    ChainFailed {
        task_id: String,
        reason: FailReason,
        /// Chain length lost by this failure.
        main_chain_lost: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        task_id: String,
        task_name: String,
        state: TaskState,
        remaining_ms: u64,
        total_ms: u64,
        percent: f64,
        display: String,
        main_chain_count: u32,
        aux_chain_count: u32,
        at: DateTime<Utc>,
    },
}

/// Why a chain was reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// The user gave up or cancelled a booking.
    GaveUp,
    /// A pause outlived its precedent's limit.
    PauseLimitExceeded,
}

impl Event {
    pub fn task_id(&self) -> &str {
        match self {
            Event::SessionBooked { task_id, .. }
            | Event::SessionStarted { task_id, .. }
            | Event::SessionPaused { task_id, .. }
            | Event::SessionResumed { task_id, .. }
            | Event::SessionCompleted { task_id, .. }
            | Event::ChainFailed { task_id, .. }
            | Event::StateSnapshot { task_id, .. } => task_id,
        }
    }
}
