//! Orchestrator tests, driving whole sync runs against a mocked DLB system


use chrono::{NaiveDate, NaiveTime, Weekday};

use muster_sync::brigade::Brigade;
use muster_sync::holidays::{PublicHoliday, Region};
use muster_sync::attendance::{AttendanceRecord, AttendanceStatus};
use muster_sync::config::DlbConfig;
use muster_sync::sync::report::{feedback_channel, SyncEvent};
use muster_sync::SyncOrchestrator;

use mock_dlb::{enabled_config, MemoryStore, MockDlb, RemoteOutcome};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn monday_brigade(region: Region) -> Brigade {
    Brigade::new(
        "b1",
        "Dunsandel Volunteer Fire Brigade",
        region,
        Weekday::Mon,
        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        2,
    )
}

#[tokio::test]
async fn holiday_shifted_occurrence_reaches_the_remote() {
    let _ = env_logger::builder().is_test(true).try_init();

    // January 2026, Auckland: the 26th is Auckland Anniversary Day and must be
    // synced as the 27th. New Year's Day is a Thursday, so no other shift happens.
    let brigade = monday_brigade(Region::Auckland);
    let mut orchestrator = SyncOrchestrator::new(MockDlb::new(), MemoryStore::new(), enabled_config());

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert!(run.is_success());
    assert_eq!(run.created, 4);
    assert_eq!(run.skipped, 0);
    assert_eq!(run.failed, 0);

    let calls = orchestrator.remote().call_dates();
    assert_eq!(calls, vec![
        ymd(2026, 1, 5),
        ymd(2026, 1, 12),
        ymd(2026, 1, 19),
        ymd(2026, 1, 27),
    ]);

    // Every created muster was also recorded in the local calendar
    let recorded: Vec<NaiveDate> = orchestrator.local().recorded.iter().map(|(date, _)| *date).collect();
    assert_eq!(recorded, calls);
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let mut orchestrator = SyncOrchestrator::new(MockDlb::new(), MemoryStore::new(), enabled_config());

    let first = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;
    assert_eq!(first.created, 4);

    // The second run sees the locally recorded events and never contacts the remote again
    let second = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;
    assert!(second.is_success());
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 4);
    assert_eq!(orchestrator.remote().call_dates().len(), 4);
}

#[tokio::test]
async fn preexisting_events_are_never_sent() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let store = MemoryStore::new()
        .with_training_event("b1", ymd(2026, 1, 5))
        .with_training_event("b1", ymd(2026, 1, 12))
        .with_training_event("b1", ymd(2026, 1, 19))
        .with_training_event("b1", ymd(2026, 1, 26));
    let mut orchestrator = SyncOrchestrator::new(MockDlb::new(), store, enabled_config());

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert!(run.is_success());
    assert_eq!(run.created, 0);
    assert_eq!(run.skipped, 4);
    assert!(orchestrator.remote().call_dates().is_empty());
}

#[tokio::test]
async fn remote_conflict_counts_as_skip() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let remote = MockDlb::new().outcome_on(ymd(2026, 1, 12), RemoteOutcome::Conflict);
    let mut orchestrator = SyncOrchestrator::new(remote, MemoryStore::new(), enabled_config());

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert!(run.is_success());
    assert_eq!(run.created, 3);
    assert_eq!(run.skipped, 1);
    assert_eq!(run.failed, 0);
    assert!(run.errors.is_empty());
}

#[tokio::test]
async fn partial_failure_processes_the_whole_batch() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Five Mondays between 2026-01-05 and 2026-02-05; the third one fails
    let brigade = monday_brigade(Region::National);
    let remote = MockDlb::new().outcome_on(ymd(2026, 1, 19), RemoteOutcome::ServerError);
    let mut orchestrator = SyncOrchestrator::new(remote, MemoryStore::new(), enabled_config());

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 5)).await;

    assert!(!run.is_success());
    assert_eq!(run.created, 4);
    assert_eq!(run.failed, 1);
    assert_eq!(run.errors.len(), 1);
    assert!(run.errors[0].contains("HTTP 500"));
    // Occurrences after the failing one were still attempted
    assert_eq!(orchestrator.remote().call_dates().len(), 5);
}

#[tokio::test]
async fn connection_failures_do_not_abort_the_batch() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let remote = MockDlb::new().outcome_on(ymd(2026, 1, 5), RemoteOutcome::ConnectionFailure);
    let mut orchestrator = SyncOrchestrator::new(remote, MemoryStore::new(), enabled_config());

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert_eq!(run.created, 3);
    assert_eq!(run.failed, 1);
    assert!(run.errors[0].contains("CONNECTION_ERROR"));
    assert_eq!(orchestrator.remote().call_dates().len(), 4);
}

#[tokio::test]
async fn auth_failure_short_circuits_the_batch() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let remote = MockDlb::new().outcome_on(ymd(2026, 1, 12), RemoteOutcome::AuthFailure);
    let mut orchestrator = SyncOrchestrator::new(remote, MemoryStore::new(), enabled_config());

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert!(!run.is_success());
    assert_eq!(run.created, 1);
    // The failing occurrence plus the two never-attempted ones
    assert_eq!(run.failed, 3);
    assert!(run.errors.iter().any(|e| e.contains("INVALID_TOKEN")));
    assert!(run.errors.iter().any(|e| e.contains("not attempted")));
    // No remote call was made after the auth failure
    assert_eq!(orchestrator.remote().call_dates(), vec![ymd(2026, 1, 5), ymd(2026, 1, 12)]);
}

#[tokio::test]
async fn disabled_integration_is_a_clean_noop() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let config = DlbConfig { enabled: false, ..enabled_config() };
    let mut orchestrator = SyncOrchestrator::new(MockDlb::new(), MemoryStore::new(), config);

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert!(run.is_success());
    assert_eq!(run.created + run.skipped + run.failed, 0);
    assert!(orchestrator.remote().call_dates().is_empty());
    assert!(!orchestrator.test_connection().await);
}

#[tokio::test]
async fn missing_token_fails_fast() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let config = DlbConfig { api_token: String::new(), ..enabled_config() };
    let mut orchestrator = SyncOrchestrator::new(MockDlb::new(), MemoryStore::new(), config);

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert!(!run.is_success());
    assert_eq!(run.failed, 0);
    assert_eq!(run.errors.len(), 1);
    assert!(run.errors[0].contains("token"));
    assert!(orchestrator.remote().call_dates().is_empty());
}

#[tokio::test]
async fn persisted_holidays_take_precedence_over_computed_ones() {
    let _ = env_logger::builder().is_test(true).try_init();

    // The portal has an announced Auckland observance on Monday the 19th. For that
    // (year, region) pair the computed anniversary (the 26th) must not be used;
    // national holidays are still computed since their pair has no persisted rows.
    let brigade = monday_brigade(Region::Auckland);
    let store = MemoryStore::new().with_holiday(PublicHoliday::new(
        ymd(2026, 1, 19),
        "Auckland Anniversary Day (observed)",
        Region::Auckland,
    ));
    let mut orchestrator = SyncOrchestrator::new(MockDlb::new(), store, enabled_config());

    let run = orchestrator.create_future_musters_as_of(&brigade, Some(1), ymd(2026, 1, 1)).await;

    assert!(run.is_success());
    let calls = orchestrator.remote().call_dates();
    assert_eq!(calls, vec![
        ymd(2026, 1, 5),
        ymd(2026, 1, 12),
        ymd(2026, 1, 20), // shifted off the persisted observance
        ymd(2026, 1, 26), // the computed anniversary no longer applies
    ]);
}

#[tokio::test]
async fn attendance_pull_counts_new_and_known_rows() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let records = vec![
        AttendanceRecord::new("m-1", "member-a", ymd(2026, 1, 5), AttendanceStatus::Present),
        AttendanceRecord::new("m-1", "member-b", ymd(2026, 1, 5), AttendanceStatus::Apology),
        AttendanceRecord::new("m-2", "member-a", ymd(2026, 1, 12), AttendanceStatus::Present),
    ];
    let remote = MockDlb::new().with_attendance(records);
    let store = MemoryStore::new().with_attendance_key("m-1", "member-a");
    let mut orchestrator = SyncOrchestrator::new(remote, store, enabled_config());

    let run = orchestrator.sync_attendance(&brigade, ymd(2026, 1, 1), ymd(2026, 1, 31)).await;

    assert!(run.is_success());
    assert_eq!(run.created, 2);
    assert_eq!(run.skipped, 1);
}

#[tokio::test]
async fn attendance_pull_reports_remote_failures() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let remote = MockDlb::new().failing_attendance();
    let mut orchestrator = SyncOrchestrator::new(remote, MemoryStore::new(), enabled_config());

    let run = orchestrator.sync_attendance(&brigade, ymd(2026, 1, 1), ymd(2026, 1, 31)).await;

    assert!(!run.is_success());
    assert_eq!(run.failed, 1);
    assert!(run.errors[0].contains("CONNECTION_ERROR"));
}

#[tokio::test]
async fn feedback_channel_reports_progress() {
    let _ = env_logger::builder().is_test(true).try_init();

    let brigade = monday_brigade(Region::National);
    let mut orchestrator = SyncOrchestrator::new(MockDlb::new(), MemoryStore::new(), enabled_config());

    let (sender, receiver) = feedback_channel();
    let run = orchestrator.create_future_musters_with_feedback(&brigade, Some(1), sender).await;

    assert!(run.is_success());
    assert!(matches!(*receiver.borrow(), SyncEvent::Finished { success: true }));
}
