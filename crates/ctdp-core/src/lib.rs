//! # CTDP Core Library
//!
//! Core logic for "don't break the chain" focus habits. Every task carries
//! two chains: the main chain counts completed focus sessions, the auxiliary
//! chain counts bookings that were honoured by actually starting. Giving up
//! or overstaying an allowed pause resets both.
//!
//! The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Chain Engine**: A wall-clock-based state machine. The caller invokes
//!   `tick()` periodically to drive automatic transitions
//! - **Precedents**: Per-task registry of allowed pause reasons
//! - **Daily Log**: Markdown line per completed session
//! - **Storage**: JSON task store with migrations and TOML configuration
//!
//! ## Key Components
//!
//! - [`ChainEngine`]: Drives transitions and the poll step
//! - [`Task`]: One habit with its state, counters and precedents
//! - [`TaskStore`]: Task persistence and selection
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod daily_log;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use daily_log::{DailyLogRecord, LogSink, LogSinkError, MarkdownDailyLog, NullLogSink};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::{Event, FailReason};
pub use notify::{Language, Notice, NoticeKind, Notifier, NullNotifier};
pub use storage::{Config, TaskStore};
pub use timer::{
    AutoTransition, ChainEngine, Countdown, Precedent, PrecedentRegistry, Task, TaskState,
    TickReport,
};
