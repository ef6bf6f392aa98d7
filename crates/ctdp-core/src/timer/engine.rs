//! Chain engine and timer poller.
//!
//! The engine is a wall-clock-driven dispatcher over the tasks of a
//! [`TaskStore`]. It does not use internal threads - the caller is
//! responsible for calling `tick()` periodically. Manual commands and the
//! poller go through the same task transitions, so there is one mutation path
//! per task.
//!
//! `tick()` is level-triggered: it compares `now` with the timestamps stored
//! on each task rather than counting ticks, so the first tick after the
//! process was suspended fires whatever became overdue in the meantime.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = ChainEngine::new(SystemClock, sink, notifier);
//! engine.book(&mut store, &task_id);
//! // In a loop:
//! let report = engine.tick(&mut store);
//! if report.dirty { store.save()?; }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::countdown::{status_text, Countdown};
use super::task::{Task, TaskState};
use crate::clock::{elapsed_ms, Clock};
use crate::daily_log::{DailyLogRecord, LogSink};
use crate::error::ValidationError;
use crate::events::{Event, FailReason};
use crate::notify::{Language, Notice, NoticeKind, Notifier};
use crate::storage::TaskStore;

/// An automatic transition fired by the poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTransition {
    pub task_id: String,
    /// Notification raised for it; `None` for silent repairs.
    pub notice: Option<NoticeKind>,
    pub event: Event,
}

/// Outcome of one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Some task changed and the store should be saved.
    pub dirty: bool,
    /// Some task changed and views should re-render.
    pub needs_refresh: bool,
    pub fired: Vec<AutoTransition>,
    /// Live countdown of the selected task, recomputed every tick.
    pub status_text: Option<String>,
}

/// Binds task transitions to a clock, a log sink and a notifier.
pub struct ChainEngine<C, L, N> {
    clock: C,
    sink: L,
    notifier: N,
    language: Language,
}

impl<C: Clock, L: LogSink, N: Notifier> ChainEngine<C, L, N> {
    pub fn new(clock: C, sink: L, notifier: N) -> Self {
        Self {
            clock,
            sink,
            notifier,
            language: Language::System,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &L {
        &self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Build a full state snapshot event for a task.
    pub fn snapshot(&self, task: &Task) -> Event {
        let now = self.clock.now();
        let countdown = Countdown::for_task(task, now);
        Event::StateSnapshot {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            state: task.state,
            remaining_ms: countdown.remaining_ms,
            total_ms: countdown.total_ms,
            percent: countdown.percent,
            display: countdown.display,
            main_chain_count: task.main_chain_count,
            aux_chain_count: task.aux_chain_count,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────
    //
    // Unknown task ids and rejected guards yield `None` and change nothing.

    pub fn book(&self, store: &mut TaskStore, task_id: &str) -> Option<Event> {
        let now = self.clock.now();
        let event = store.get_mut(task_id)?.book(now);
        log_event(event.as_ref());
        event
    }

    pub fn start(&self, store: &mut TaskStore, task_id: &str) -> Option<Event> {
        let now = self.clock.now();
        let event = store.get_mut(task_id)?.start(now);
        log_event(event.as_ref());
        event
    }

    pub fn pause(&self, store: &mut TaskStore, task_id: &str, precedent_id: &str) -> Option<Event> {
        let now = self.clock.now();
        let event = store.get_mut(task_id)?.pause(precedent_id, now);
        log_event(event.as_ref());
        event
    }

    /// Register a new precedent on an active task and pause with it at once.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyName`] for a blank name. Nothing is
    /// registered in that case, nor when the task is not active.
    pub fn create_and_pause(
        &self,
        store: &mut TaskStore,
        task_id: &str,
        name: &str,
        description: &str,
        limit_minutes: &str,
    ) -> Result<Option<Event>, ValidationError> {
        let now = self.clock.now();
        let Some(task) = store.get_mut(task_id) else {
            return Ok(None);
        };
        if task.state != TaskState::Active {
            return Ok(None);
        }
        let precedent_id = task.precedents.create(name, description, limit_minutes)?.id.clone();
        let event = task.pause(&precedent_id, now);
        log_event(event.as_ref());
        Ok(event)
    }

    pub fn resume(&self, store: &mut TaskStore, task_id: &str) -> Option<Event> {
        let now = self.clock.now();
        let event = store.get_mut(task_id)?.resume(now);
        log_event(event.as_ref());
        event
    }

    /// Complete the active session, writing its daily log line first.
    pub fn complete(&self, store: &mut TaskStore, task_id: &str) -> Option<Event> {
        let now = self.clock.now();
        let task = store.get_mut(task_id)?;
        let event = self.complete_task(task, now);
        log_event(event.as_ref());
        event
    }

    /// Give up: reset the chain from any state.
    pub fn fail(&self, store: &mut TaskStore, task_id: &str) -> Option<Event> {
        let now = self.clock.now();
        let event = store.get_mut(task_id)?.fail(FailReason::GaveUp, now);
        log_event(Some(&event));
        Some(event)
    }

    /// Re-evaluate every task against the clock and fire due transitions.
    ///
    /// Each task is evaluated once; its state selects at most one of the
    /// three timeout checks, so at most one transition fires per task.
    pub fn tick(&self, store: &mut TaskStore) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();

        for task in store.tasks_mut() {
            if let Some(fired) = self.evaluate(task, now) {
                if let Some(kind) = fired.notice {
                    self.notifier.notify(&Notice::new(kind, self.language, &task.name));
                }
                report.dirty = true;
                report.needs_refresh = true;
                report.fired.push(fired);
            }
        }

        report.status_text = store.active_task().and_then(|task| status_text(task, now));
        report
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn evaluate(&self, task: &mut Task, now: DateTime<Utc>) -> Option<AutoTransition> {
        let (notice, event) = match task.state {
            TaskState::Idle => return None,
            TaskState::Booked => {
                let since = task.booking_start_time?;
                if elapsed_ms(now, since) < task.booking_ms() {
                    return None;
                }
                (Some(NoticeKind::SessionAutoStarted), task.start(now)?)
            }
            TaskState::Active => {
                let since = task.session_start_time?;
                if elapsed_ms(now, since) < task.session_ms() {
                    return None;
                }
                (Some(NoticeKind::SessionComplete), self.complete_task(task, now)?)
            }
            TaskState::Paused => {
                let since = task.pause_start_time?;
                match task.active_precedent().map(|p| p.limit_ms()) {
                    Some(limit) if elapsed_ms(now, since) < limit => return None,
                    Some(_) => (
                        Some(NoticeKind::PauseLimitExceeded),
                        task.fail(FailReason::PauseLimitExceeded, now),
                    ),
                    None => {
                        tracing::warn!(task = %task.id, "paused on an unknown precedent, resuming");
                        (None, task.resume(now)?)
                    }
                }
            }
        };
        tracing::info!(task = %task.id, name = %task.name, state = %task.state, "automatic transition");
        Some(AutoTransition {
            task_id: task.id.clone(),
            notice,
            event,
        })
    }

    fn complete_task(&self, task: &mut Task, now: DateTime<Utc>) -> Option<Event> {
        task.complete_with(now, |record| self.emit_log(record))
    }

    /// Hand a record to the sink. Failures become a soft notice only.
    fn emit_log(&self, record: &DailyLogRecord) {
        match self.sink.append(record) {
            Ok(()) => self.notifier.notify(&Notice::new(
                NoticeKind::LoggedToDailyNote,
                self.language,
                &record.task_name,
            )),
            Err(e) => {
                tracing::warn!(error = %e, task = %record.task_name, "daily log write failed");
                self.notifier
                    .notify(&Notice::new(NoticeKind::LogFailed, self.language, &e.to_string()));
            }
        }
    }
}

fn log_event(event: Option<&Event>) {
    if let Some(event) = event {
        tracing::debug!(task = %event.task_id(), ?event, "transition");
    }
}
