//! End-to-end chain scenarios driven through the engine and poller.
//!
//! Every test runs against a [`ManualClock`] so deadlines are crossed by
//! advancing time instead of sleeping.

use std::cell::RefCell;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use ctdp_core::timer::remaining_ms;
use ctdp_core::{
    ChainEngine, Event, FailReason, Language, ManualClock, MarkdownDailyLog, Notice, NoticeKind,
    Notifier, NullLogSink, TaskState, TaskStore,
};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Default)]
struct Inbox(RefCell<Vec<Notice>>);

impl Notifier for Inbox {
    fn notify(&self, notice: &Notice) {
        self.0.borrow_mut().push(notice.clone());
    }
}

impl Inbox {
    fn kinds(&self) -> Vec<NoticeKind> {
        self.0.borrow().iter().map(|n| n.kind).collect()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

fn engine() -> ChainEngine<ManualClock, NullLogSink, Inbox> {
    ChainEngine::new(ManualClock::new(t0()), NullLogSink, Inbox::default())
        .with_language(Language::En)
}

fn mins_secs(m: i64, s: i64) -> Duration {
    Duration::minutes(m) + Duration::seconds(s)
}

// ============================================================================
// Booking, completion and failure
// ============================================================================

#[test]
fn booking_is_honoured_then_session_completes() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "5").unwrap().id.clone();

    engine.book(&mut store, &id).unwrap();
    assert_eq!(store.get(&id).unwrap().state, TaskState::Booked);

    engine.clock().advance(mins_secs(5, 1));
    let report = engine.tick(&mut store);
    assert_eq!(report.fired.len(), 1);
    let task = store.get(&id).unwrap();
    assert_eq!(task.state, TaskState::Active);
    assert_eq!(task.aux_chain_count, 1);
    assert_eq!(task.session_start_time, Some(t0() + mins_secs(5, 1)));
    assert_eq!(task.log_booking_start_time, Some(t0()));

    engine.clock().advance(mins_secs(25, 1));
    let report = engine.tick(&mut store);
    assert!(matches!(
        report.fired[0].event,
        Event::SessionCompleted { main_chain_count: 1, .. }
    ));
    let task = store.get(&id).unwrap();
    assert_eq!(task.state, TaskState::Idle);
    assert_eq!(task.main_chain_count, 1);
    assert_eq!(task.aux_chain_count, 1);
    assert!(task.is_consistent());

    assert_eq!(
        engine.notifier().kinds(),
        [
            NoticeKind::SessionAutoStarted,
            NoticeKind::LoggedToDailyNote,
            NoticeKind::SessionComplete
        ]
    );
}

#[test]
fn overstaying_a_pause_breaks_the_chain() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "0").unwrap().id.clone();
    {
        let task = store.get_mut(&id).unwrap();
        task.main_chain_count = 3;
        task.aux_chain_count = 2;
    }

    engine.start(&mut store, &id).unwrap();
    engine
        .create_and_pause(&mut store, &id, "Bathroom", "", "3")
        .unwrap()
        .unwrap();
    assert_eq!(store.get(&id).unwrap().precedents.iter().next().unwrap().usage_count, 1);

    engine.clock().advance(mins_secs(2, 59));
    assert!(engine.tick(&mut store).fired.is_empty());

    engine.clock().advance(Duration::seconds(2));
    let report = engine.tick(&mut store);
    assert_eq!(report.fired[0].notice, Some(NoticeKind::PauseLimitExceeded));
    assert!(matches!(
        report.fired[0].event,
        Event::ChainFailed {
            reason: FailReason::PauseLimitExceeded,
            main_chain_lost: 3,
            ..
        }
    ));

    let task = store.get(&id).unwrap();
    assert_eq!(task.state, TaskState::Idle);
    assert_eq!(task.main_chain_count, 0);
    assert_eq!(task.aux_chain_count, 0);
    assert!(task.precedents.is_empty());
    assert!(task.is_consistent());
}

#[test]
fn pause_with_unknown_precedent_changes_nothing() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "0").unwrap().id.clone();
    engine.start(&mut store, &id).unwrap();
    store.get_mut(&id).unwrap().precedents.create("Tea", "", "5").unwrap();
    let before = store.get(&id).unwrap().clone();

    engine.clock().advance(Duration::minutes(1));
    assert!(engine.pause(&mut store, &id, "missing").is_none());
    assert_eq!(store.get(&id).unwrap(), &before);
}

#[test]
fn give_up_is_idempotent() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "5").unwrap().id.clone();
    engine.book(&mut store, &id).unwrap();

    engine.fail(&mut store, &id).unwrap();
    let once = store.get(&id).unwrap().clone();
    engine.fail(&mut store, &id).unwrap();
    assert_eq!(store.get(&id).unwrap(), &once);
    assert_eq!(once.state, TaskState::Idle);
    assert!(once.is_consistent());
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn zero_booking_starts_directly() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "0").unwrap().id.clone();

    let event = engine.book(&mut store, &id).unwrap();
    assert!(matches!(
        event,
        Event::SessionStarted {
            from_booking: false,
            aux_chain_count: 0,
            ..
        }
    ));
    let task = store.get(&id).unwrap();
    assert_eq!(task.state, TaskState::Active);
    assert_eq!(task.aux_chain_count, 0);
    assert_eq!(task.log_booking_start_time, None);
}

#[test]
fn pause_and_resume_preserve_remaining_time() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "0").unwrap().id.clone();
    engine.start(&mut store, &id).unwrap();
    let pid = store
        .get_mut(&id)
        .unwrap()
        .precedents
        .create("Door", "", "10")
        .unwrap()
        .id
        .clone();

    engine.clock().advance(Duration::minutes(10));
    let task = store.get(&id).unwrap();
    let before = remaining_ms(engine.now(), task.session_start_time.unwrap(), 25);
    engine.pause(&mut store, &id, &pid).unwrap();

    engine.clock().advance(mins_secs(7, 30));
    assert!(engine.tick(&mut store).fired.is_empty());
    engine.resume(&mut store, &id).unwrap();

    let task = store.get(&id).unwrap();
    let after = remaining_ms(engine.now(), task.session_start_time.unwrap(), 25);
    assert_eq!(before, after);
    assert_eq!(after, 15 * 60_000);
}

#[test]
fn clock_set_backwards_fires_nothing() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "5").unwrap().id.clone();
    engine.book(&mut store, &id).unwrap();

    engine.clock().set(t0() - Duration::hours(2));
    let report = engine.tick(&mut store);
    assert!(report.fired.is_empty());
    assert_eq!(report.status_text.as_deref(), Some("🗓️ 05:00"));
}

#[test]
fn only_overdue_tasks_transition() {
    let engine = engine();
    let mut store = TaskStore::in_memory();
    let short = store.create_task("Short", "", "10", "1").unwrap().id.clone();
    let long = store.create_task("Long", "", "10", "30").unwrap().id.clone();
    engine.book(&mut store, &short).unwrap();
    engine.book(&mut store, &long).unwrap();

    engine.clock().advance(Duration::minutes(2));
    let report = engine.tick(&mut store);
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].task_id, short);
    assert_eq!(store.get(&long).unwrap().state, TaskState::Booked);
}

// ============================================================================
// Daily log
// ============================================================================

#[test]
fn completed_session_lands_in_daily_note() {
    let dir = TempDir::new().unwrap();
    let utc = FixedOffset::east_opt(0).unwrap();
    let sink = MarkdownDailyLog::new(dir.path().join("daily"), "%Y-%m-%d").with_offset(utc);
    let engine = ChainEngine::new(ManualClock::new(t0()), sink, Inbox::default())
        .with_language(Language::En);
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "5").unwrap().id.clone();
    let pid = store
        .get_mut(&id)
        .unwrap()
        .precedents
        .create("Bathroom", "", "3")
        .unwrap()
        .id
        .clone();

    engine.book(&mut store, &id).unwrap();
    engine.clock().advance(mins_secs(5, 1));
    engine.tick(&mut store);
    engine.pause(&mut store, &id, &pid).unwrap();
    engine.clock().advance(Duration::minutes(1));
    engine.resume(&mut store, &id).unwrap();
    engine.clock().advance(mins_secs(25, 1));
    engine.tick(&mut store);

    let note = std::fs::read_to_string(dir.path().join("daily").join("2024-03-04.md")).unwrap();
    assert_eq!(
        note,
        "- [x] 09:06 - 09:31 🎯 **Deep Work** (⏰ Booked: 09:00, ⏸️ Exceptions: Bathroom)"
    );
    assert_eq!(store.get(&id).unwrap().main_chain_count, 1);
}

#[test]
fn broken_date_format_only_raises_soft_notice() {
    let dir = TempDir::new().unwrap();
    let sink = MarkdownDailyLog::new(dir.path(), "%Q");
    let engine = ChainEngine::new(ManualClock::new(t0()), sink, Inbox::default())
        .with_language(Language::En);
    let mut store = TaskStore::in_memory();
    let id = store.create_task("Deep Work", "", "25", "0").unwrap().id.clone();

    engine.start(&mut store, &id).unwrap();
    engine.complete(&mut store, &id).unwrap();

    assert_eq!(store.get(&id).unwrap().main_chain_count, 1);
    assert_eq!(engine.notifier().kinds(), [NoticeKind::LogFailed]);
}
