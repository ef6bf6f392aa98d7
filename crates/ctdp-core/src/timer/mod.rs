mod countdown;
mod engine;
mod precedent;
mod task;

pub use countdown::{format_countdown, percent_remaining, remaining_ms, status_text, Countdown};
pub use engine::{AutoTransition, ChainEngine, TickReport};
pub use precedent::{Precedent, PrecedentRegistry, DEFAULT_PAUSE_LIMIT_MINUTES};
pub use task::{
    parse_booking_minutes, parse_minutes, Task, TaskState, DEFAULT_BOOKING_MINUTES,
    DEFAULT_SESSION_MINUTES,
};
