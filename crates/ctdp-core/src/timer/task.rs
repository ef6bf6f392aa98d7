//! Chain task state machine.
//!
//! A task owns its state, its timestamps and its chain counters. All
//! transitions take `now` explicitly; the caller (see [`super::ChainEngine`])
//! decides where time comes from.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Booked -> Active <-> Paused
//! Active -> Idle            (complete, main chain +1)
//! Booked | Active | Paused -> Idle   (fail, chain reset)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::precedent::{Precedent, PrecedentRegistry};
use crate::clock::elapsed_ms;
use crate::daily_log::DailyLogRecord;
use crate::error::ValidationError;
use crate::events::{Event, FailReason};

pub const DEFAULT_SESSION_MINUTES: u32 = 60;
pub const DEFAULT_BOOKING_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    #[default]
    Idle,
    Booked,
    Active,
    Paused,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Idle => "IDLE",
            TaskState::Booked => "BOOKED",
            TaskState::Active => "ACTIVE",
            TaskState::Paused => "PAUSED",
        };
        f.write_str(s)
    }
}

/// One tracked habit chain.
///
/// Field names and the epoch-millisecond timestamp encoding match the
/// persisted record, so older data files deserialize without conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Session length in minutes.
    #[serde(default = "default_session", deserialize_with = "de_session_minutes")]
    pub session_duration: u32,
    /// Booking delay in minutes; 0 skips booking.
    #[serde(default = "default_booking", deserialize_with = "de_booking_minutes")]
    pub booking_duration: u32,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub main_chain_count: u32,
    #[serde(default)]
    pub aux_chain_count: u32,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub booking_start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub session_start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub pause_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_precedent_id: Option<String>,
    #[serde(default)]
    pub precedents: PrecedentRegistry,
    /// Original booking time of the open cycle, kept after the session starts.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub log_booking_start_time: Option<DateTime<Utc>>,
    /// Precedent names used during the open cycle, in order of use.
    #[serde(default, deserialize_with = "de_null_as_empty")]
    pub log_precedents: Vec<String>,
}

fn default_session() -> u32 {
    DEFAULT_SESSION_MINUTES
}

fn default_booking() -> u32 {
    DEFAULT_BOOKING_MINUTES
}

/// Accept any integer; negatives clamp to 0 ("skip booking").
fn de_booking_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}

/// A stored session length must be positive; anything else loads as the default.
fn de_session_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(positive_minutes(raw, DEFAULT_SESSION_MINUTES))
}

/// `raw` as minutes when strictly positive, otherwise `default`.
pub(crate) fn positive_minutes(raw: i64, default: u32) -> u32 {
    match u32::try_from(raw) {
        Ok(n) if n > 0 => n,
        _ => default,
    }
}

fn de_null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a strictly positive minute count, falling back to `default`.
pub fn parse_minutes(input: &str, default: u32) -> u32 {
    input
        .trim()
        .parse::<i64>()
        .map_or(default, |n| positive_minutes(n, default))
}

/// Parse a booking delay. Zero is meaningful (skip booking) and is kept.
pub fn parse_booking_minutes(input: &str) -> u32 {
    match input.trim().parse::<i64>() {
        Ok(n) if n >= 0 => u32::try_from(n).unwrap_or(DEFAULT_BOOKING_MINUTES),
        _ => DEFAULT_BOOKING_MINUTES,
    }
}

impl Task {
    /// Create an idle task with empty counters and no precedents.
    ///
    /// Durations are raw user input; see [`parse_minutes`] and
    /// [`parse_booking_minutes`] for the fallbacks.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyName`] for a blank name.
    pub fn new(
        name: &str,
        description: &str,
        session_minutes: &str,
        booking_minutes: &str,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName { what: "Task" });
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.trim().to_string(),
            session_duration: parse_minutes(session_minutes, DEFAULT_SESSION_MINUTES),
            booking_duration: parse_booking_minutes(booking_minutes),
            state: TaskState::Idle,
            main_chain_count: 0,
            aux_chain_count: 0,
            booking_start_time: None,
            session_start_time: None,
            pause_start_time: None,
            active_precedent_id: None,
            precedents: PrecedentRegistry::new(),
            log_booking_start_time: None,
            log_precedents: Vec::new(),
        })
    }

    /// Edit the user-editable fields. `None` leaves a field unchanged.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyName`] when a blank name is submitted;
    /// nothing is changed in that case.
    pub fn update(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
        session_minutes: Option<&str>,
        booking_minutes: Option<&str>,
    ) -> Result<(), ValidationError> {
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyName { what: "Task" });
            }
        }
        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = description {
            self.description = description.trim().to_string();
        }
        if let Some(session) = session_minutes {
            self.session_duration = parse_minutes(session, DEFAULT_SESSION_MINUTES);
        }
        if let Some(booking) = booking_minutes {
            self.booking_duration = parse_booking_minutes(booking);
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_ms(&self) -> u64 {
        u64::from(self.session_duration) * 60_000
    }

    pub fn booking_ms(&self) -> u64 {
        u64::from(self.booking_duration) * 60_000
    }

    /// The precedent currently excusing a pause, if it still resolves.
    pub fn active_precedent(&self) -> Option<&Precedent> {
        self.active_precedent_id
            .as_deref()
            .and_then(|id| self.precedents.get(id))
    }

    /// Whether the timing fields agree with `state`.
    pub fn is_consistent(&self) -> bool {
        let booking = self.booking_start_time.is_some();
        let session = self.session_start_time.is_some();
        let pause = self.pause_start_time.is_some();
        match self.state {
            TaskState::Idle => {
                !booking
                    && !session
                    && !pause
                    && self.active_precedent_id.is_none()
                    && self.log_booking_start_time.is_none()
                    && self.log_precedents.is_empty()
            }
            TaskState::Booked => {
                booking && !session && !pause && self.active_precedent_id.is_none()
            }
            TaskState::Active => {
                session && !booking && !pause && self.active_precedent_id.is_none()
            }
            TaskState::Paused => {
                session && pause && !booking && self.active_precedent().is_some()
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Commit to a session that starts after the booking delay.
    ///
    /// With a zero booking delay the session starts immediately and the aux
    /// chain is left alone.
    pub fn book(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TaskState::Idle {
            return None;
        }
        if self.booking_duration == 0 {
            return self.start(now);
        }
        self.state = TaskState::Booked;
        self.booking_start_time = Some(now);
        self.log_booking_start_time = Some(now);
        self.log_precedents.clear();
        Some(Event::SessionBooked {
            task_id: self.id.clone(),
            booking_minutes: self.booking_duration,
            at: now,
        })
    }

    /// Start the focus session, honoring a pending booking if there is one.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let from_booking = match self.state {
            TaskState::Idle => {
                self.log_booking_start_time = None;
                self.log_precedents.clear();
                false
            }
            TaskState::Booked => true,
            TaskState::Active | TaskState::Paused => return None,
        };
        if from_booking {
            self.aux_chain_count = self.aux_chain_count.saturating_add(1);
        }
        self.state = TaskState::Active;
        self.session_start_time = Some(now);
        if self.log_booking_start_time.is_none() {
            self.log_booking_start_time = self.booking_start_time;
        }
        self.booking_start_time = None;
        self.pause_start_time = None;
        self.active_precedent_id = None;
        Some(Event::SessionStarted {
            task_id: self.id.clone(),
            from_booking,
            aux_chain_count: self.aux_chain_count,
            at: now,
        })
    }

    /// Pause under a registered precedent. Unknown precedents are ignored.
    pub fn pause(&mut self, precedent_id: &str, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TaskState::Active {
            return None;
        }
        let precedent = self.precedents.get_mut(precedent_id)?;
        precedent.usage_count = precedent.usage_count.saturating_add(1);
        let precedent_name = precedent.name.clone();

        self.state = TaskState::Paused;
        self.pause_start_time = Some(now);
        self.active_precedent_id = Some(precedent_id.to_string());
        self.log_precedents.push(precedent_name.clone());
        Some(Event::SessionPaused {
            task_id: self.id.clone(),
            precedent_id: precedent_id.to_string(),
            precedent_name,
            at: now,
        })
    }

    /// Resume a paused session, shifting its start by the paused duration.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TaskState::Paused {
            return None;
        }
        let paused_ms = self
            .pause_start_time
            .map(|since| elapsed_ms(now, since))
            .unwrap_or(0);
        let shift = Duration::milliseconds(i64::try_from(paused_ms).unwrap_or(i64::MAX));
        self.session_start_time = Some(self.session_start_time.map_or(now, |start| start + shift));
        self.state = TaskState::Active;
        self.pause_start_time = None;
        self.active_precedent_id = None;
        Some(Event::SessionResumed {
            task_id: self.id.clone(),
            paused_ms,
            at: now,
        })
    }

    /// Build the daily log record for the open session without changing it.
    pub fn completion_record(&self, now: DateTime<Utc>) -> Option<DailyLogRecord> {
        if self.state != TaskState::Active {
            return None;
        }
        Some(DailyLogRecord {
            task_name: self.name.clone(),
            session_start: self.session_start_time.unwrap_or(now),
            session_end: now,
            booking_start: self.log_booking_start_time,
            precedents_used: self.log_precedents.clone(),
        })
    }

    /// Complete the session and extend the main chain.
    ///
    /// `emit` receives the completion record before the log accumulators are
    /// cleared. Whatever it does, the chain count is incremented.
    pub fn complete_with(
        &mut self,
        now: DateTime<Utc>,
        emit: impl FnOnce(&DailyLogRecord),
    ) -> Option<Event> {
        let record = self.completion_record(now)?;
        emit(&record);

        self.main_chain_count = self.main_chain_count.saturating_add(1);
        self.state = TaskState::Idle;
        self.session_start_time = None;
        self.log_booking_start_time = None;
        self.log_precedents.clear();
        Some(Event::SessionCompleted {
            task_id: self.id.clone(),
            main_chain_count: self.main_chain_count,
            at: now,
        })
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.complete_with(now, |_| {})
    }

    /// Break the chain: counters reset and every precedent is discarded.
    ///
    /// Allowed from any state; on an already reset task this changes nothing.
    pub fn fail(&mut self, reason: FailReason, now: DateTime<Utc>) -> Event {
        let main_chain_lost = self.main_chain_count;
        self.state = TaskState::Idle;
        self.main_chain_count = 0;
        self.aux_chain_count = 0;
        self.precedents.clear();
        self.booking_start_time = None;
        self.session_start_time = None;
        self.pause_start_time = None;
        self.active_precedent_id = None;
        self.log_booking_start_time = None;
        self.log_precedents.clear();
        Event::ChainFailed {
            task_id: self.id.clone(),
            reason,
            main_chain_lost,
            at: now,
        }
    }

    /// Remove a precedent from this task.
    ///
    /// # Errors
    /// Returns [`ValidationError::PrecedentInUse`] when the precedent is
    /// excusing the current pause.
    pub fn delete_precedent(&mut self, id: &str) -> Result<Option<Precedent>, ValidationError> {
        if self.state == TaskState::Paused && self.active_precedent_id.as_deref() == Some(id) {
            if let Some(p) = self.precedents.get(id) {
                return Err(ValidationError::PrecedentInUse {
                    name: p.name.clone(),
                });
            }
        }
        Ok(self.precedents.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::DEFAULT_PAUSE_LIMIT_MINUTES;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn task(session: &str, booking: &str) -> Task {
        Task::new("Deep Work", "", session, booking).unwrap()
    }

    #[test]
    fn new_task_is_idle_and_empty() {
        let t = task("25", "5");
        assert_eq!(t.state, TaskState::Idle);
        assert_eq!(t.session_duration, 25);
        assert_eq!(t.booking_duration, 5);
        assert_eq!(t.main_chain_count, 0);
        assert!(t.precedents.is_empty());
        assert!(t.is_consistent());
    }

    #[test]
    fn new_rejects_blank_name() {
        let err = Task::new("  ", "", "25", "5").unwrap_err();
        assert_eq!(err, ValidationError::EmptyName { what: "Task" });
    }

    #[test]
    fn durations_fall_back_to_defaults() {
        let t = Task::new("X", "", "soon", "-3").unwrap();
        assert_eq!(t.session_duration, DEFAULT_SESSION_MINUTES);
        assert_eq!(t.booking_duration, DEFAULT_BOOKING_MINUTES);
        let t = Task::new("X", "", "0", "0").unwrap();
        assert_eq!(t.session_duration, DEFAULT_SESSION_MINUTES);
        assert_eq!(t.booking_duration, 0);
    }

    #[test]
    fn book_then_start_honors_booking() {
        let mut t = task("25", "5");
        assert!(t.book(t0()).is_some());
        assert_eq!(t.state, TaskState::Booked);
        assert_eq!(t.log_booking_start_time, Some(t0()));
        assert!(t.is_consistent());

        let later = t0() + Duration::minutes(2);
        match t.start(later) {
            Some(Event::SessionStarted { from_booking, aux_chain_count, .. }) => {
                assert!(from_booking);
                assert_eq!(aux_chain_count, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(t.session_start_time, Some(later));
        assert_eq!(t.booking_start_time, None);
        assert_eq!(t.log_booking_start_time, Some(t0()));
        assert!(t.is_consistent());
    }

    #[test]
    fn zero_booking_starts_directly_without_aux() {
        let mut t = task("25", "0");
        t.book(t0());
        assert_eq!(t.state, TaskState::Active);
        assert_eq!(t.aux_chain_count, 0);
        assert_eq!(t.log_booking_start_time, None);
    }

    #[test]
    fn book_is_rejected_outside_idle() {
        let mut t = task("25", "5");
        t.start(t0());
        assert!(t.book(t0()).is_none());
        assert_eq!(t.state, TaskState::Active);
    }

    #[test]
    fn pause_unknown_precedent_changes_nothing() {
        let mut t = task("25", "0");
        t.precedents.create("Bathroom", "", "3").unwrap();
        t.start(t0());
        let before = t.clone();
        assert!(t.pause("nope", t0() + Duration::minutes(1)).is_none());
        assert_eq!(t, before);
    }

    #[test]
    fn pause_resume_shifts_session_start() {
        let mut t = task("25", "0");
        let pid = t.precedents.create("Bathroom", "", "3").unwrap().id.clone();
        t.start(t0());
        t.pause(&pid, t0() + Duration::minutes(10)).unwrap();
        assert_eq!(t.state, TaskState::Paused);
        assert_eq!(t.precedents.get(&pid).unwrap().usage_count, 1);
        assert_eq!(t.log_precedents, ["Bathroom"]);
        assert!(t.is_consistent());

        t.resume(t0() + Duration::minutes(12)).unwrap();
        assert_eq!(t.state, TaskState::Active);
        assert_eq!(t.session_start_time, Some(t0() + Duration::minutes(2)));
        assert_eq!(t.active_precedent_id, None);
        assert!(t.is_consistent());
    }

    #[test]
    fn complete_emits_record_before_clearing() {
        let mut t = task("25", "5");
        let pid = t.precedents.create("Bathroom", "", "3").unwrap().id.clone();
        t.book(t0());
        t.start(t0() + Duration::minutes(5));
        t.pause(&pid, t0() + Duration::minutes(6)).unwrap();
        t.resume(t0() + Duration::minutes(7)).unwrap();

        let mut seen = None;
        let end = t0() + Duration::minutes(31);
        t.complete_with(end, |r| seen = Some(r.clone())).unwrap();
        let record = seen.unwrap();
        assert_eq!(record.booking_start, Some(t0()));
        assert_eq!(record.precedents_used, ["Bathroom"]);
        assert_eq!(record.session_start, t0() + Duration::minutes(6));
        assert_eq!(record.session_end, end);

        assert_eq!(t.main_chain_count, 1);
        assert_eq!(t.state, TaskState::Idle);
        assert!(t.log_precedents.is_empty());
        assert!(t.is_consistent());
    }

    #[test]
    fn complete_requires_active() {
        let mut t = task("25", "5");
        assert!(t.complete(t0()).is_none());
        t.book(t0());
        assert!(t.complete(t0()).is_none());
        assert_eq!(t.main_chain_count, 0);
    }

    #[test]
    fn fail_wipes_chain_and_precedents() {
        let mut t = task("25", "0");
        t.precedents.create("Bathroom", "", "3").unwrap();
        t.start(t0());
        t.complete(t0() + Duration::minutes(25));
        t.start(t0() + Duration::minutes(30));
        let event = t.fail(FailReason::GaveUp, t0() + Duration::minutes(31));
        assert!(matches!(event, Event::ChainFailed { main_chain_lost: 1, .. }));
        assert_eq!(t.main_chain_count, 0);
        assert!(t.precedents.is_empty());
        assert!(t.is_consistent());

        let snapshot = t.clone();
        t.fail(FailReason::GaveUp, t0() + Duration::minutes(32));
        assert_eq!(t, snapshot);
    }

    #[test]
    fn active_precedent_cannot_be_deleted() {
        let mut t = task("25", "0");
        let pid = t.precedents.create("Bathroom", "", "3").unwrap().id.clone();
        t.start(t0());
        t.pause(&pid, t0()).unwrap();
        assert!(matches!(
            t.delete_precedent(&pid),
            Err(ValidationError::PrecedentInUse { .. })
        ));
        t.resume(t0()).unwrap();
        assert!(t.delete_precedent(&pid).unwrap().is_some());
    }

    #[test]
    fn loads_legacy_record_with_missing_fields() {
        let json = r#"{
            "id": "1700000000000",
            "name": "Deep Work",
            "description": "",
            "sessionDuration": 60,
            "bookingDuration": -1,
            "state": "BOOKED",
            "mainChainCount": 3,
            "auxChainCount": 2,
            "bookingStartTime": 1700000000000,
            "sessionStartTime": null,
            "pauseStartTime": null,
            "activePrecedentId": null,
            "precedents": []
        }"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.booking_duration, 0);
        assert!(t.log_precedents.is_empty());
        assert_eq!(t.log_booking_start_time, None);
        assert_eq!(
            t.booking_start_time.map(|d| d.timestamp_millis()),
            Some(1_700_000_000_000)
        );
        assert!(t.is_consistent());
    }

    #[test]
    fn non_positive_session_loads_as_default() {
        for raw in ["0", "-5"] {
            let json = format!(
                r#"{{"id":"1","name":"Read","sessionDuration":{raw},"bookingDuration":0,
                    "precedents":[{{"id":"p","name":"Door","autoFailMinutes":{raw}}}]}}"#
            );
            let t: Task = serde_json::from_str(&json).unwrap();
            assert_eq!(t.session_duration, DEFAULT_SESSION_MINUTES);
            assert_eq!(t.booking_duration, 0);
            assert_eq!(
                t.precedents.get("p").unwrap().auto_fail_minutes,
                DEFAULT_PAUSE_LIMIT_MINUTES
            );
        }
    }

    #[test]
    fn loaded_zero_session_does_not_complete_at_once() {
        let json = r#"{"id":"1","name":"Read","sessionDuration":-5,"bookingDuration":0}"#;
        let mut t: Task = serde_json::from_str(json).unwrap();
        t.book(t0()).unwrap();
        assert_eq!(t.session_ms(), u64::from(DEFAULT_SESSION_MINUTES) * 60_000);
        assert_eq!(t.state, TaskState::Active);
    }
}
