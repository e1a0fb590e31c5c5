//! `SqliteStore` against an in-memory SQLite database.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_session::{SessionConfig, SessionState};
use rollcall_store::admin::{mark_status, remove_attendance, resolve_participant};
use rollcall_store::{
    AttendanceFilter, AttendanceStore, CommitConfig, CommitPipeline, MarkOutcome, SqliteStore,
    StoreError,
};
use rollcall_types::{AttendanceRecord, AttendanceStatus, Enrollment, ParticipantId, SessionId};

// =========================================================================
// Helpers
// =========================================================================

async fn store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:").await.unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, d).unwrap()
}

fn at(d: u32, secs: u32) -> NaiveDateTime {
    day(d).and_hms_opt(9, 0, secs).unwrap()
}

fn record(participant: u64, session: &str, d: u32) -> AttendanceRecord {
    AttendanceRecord {
        participant_id: ParticipantId(participant),
        display_name: format!("p{participant}"),
        timestamp: at(d, participant as u32 % 60),
        date: day(d),
        session_id: SessionId::new(session),
        status: AttendanceStatus::Present,
    }
}

// =========================================================================
// Records
// =========================================================================

#[tokio::test]
async fn test_upsert_then_query_round_trips_every_field() {
    let store = store().await;
    let mut excused = record(1, "S", 1);
    excused.status = AttendanceStatus::Excused;

    store.upsert_attendance(&excused).await.unwrap();
    let stored = store.query(&AttendanceFilter::all()).await.unwrap();

    assert_eq!(stored, vec![excused]);
}

#[tokio::test]
async fn test_upsert_same_key_keeps_single_row() {
    let store = store().await;
    store.upsert_attendance(&record(1, "S", 1)).await.unwrap();
    let mut again = record(1, "S", 1);
    again.display_name = "renamed".into();
    again.timestamp = at(1, 59);

    store.upsert_attendance(&again).await.unwrap();

    let stored = store.query(&AttendanceFilter::all()).await.unwrap();
    assert_eq!(stored, vec![again]);
}

#[tokio::test]
async fn test_large_participant_id_survives_storage() {
    let store = store().await;
    let mut big = record(0, "S", 1);
    big.participant_id = ParticipantId(u64::MAX - 7);

    store.upsert_attendance(&big).await.unwrap();

    let stored = store
        .query(&AttendanceFilter::all().of(ParticipantId(u64::MAX - 7)))
        .await
        .unwrap();
    assert_eq!(stored, vec![big]);
}

#[tokio::test]
async fn test_query_filters_and_orders() {
    let store = store().await;
    for r in [
        record(2, "S2", 2),
        record(1, "S1", 1),
        record(3, "S1", 1),
        record(1, "S2", 2),
    ] {
        store.upsert_attendance(&r).await.unwrap();
    }

    let day_one = store.query(&AttendanceFilter::all().on(day(1))).await.unwrap();
    let s2 = store
        .query(&AttendanceFilter::session(SessionId::new("S2")))
        .await
        .unwrap();
    let p1 = store
        .query(&AttendanceFilter::all().of(ParticipantId(1)))
        .await
        .unwrap();

    let ids = |rs: &[AttendanceRecord]| rs.iter().map(|r| r.participant_id.0).collect::<Vec<_>>();
    assert_eq!(ids(&day_one), vec![1, 3]);
    assert_eq!(ids(&s2), vec![1, 2]);
    assert_eq!(
        p1.iter().map(|r| r.session_id.as_str()).collect::<Vec<_>>(),
        vec!["S1", "S2"]
    );
}

#[tokio::test]
async fn test_null_status_reads_as_present() {
    let store = store().await;
    sqlx::query(
        "INSERT INTO attendance (participant_id, display_name, timestamp, date, session_id, status)
         VALUES (5, 'legacy', '2025-12-01 09:00:00', '2025-12-01', 'OLD', NULL)",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let stored = store.query(&AttendanceFilter::all()).await.unwrap();

    assert_eq!(stored[0].status, AttendanceStatus::Present);
}

#[tokio::test]
async fn test_corrupt_timestamp_reported_not_panicking() {
    let store = store().await;
    sqlx::query(
        "INSERT INTO attendance (participant_id, display_name, timestamp, date, session_id, status)
         VALUES (5, 'bad', 'yesterday', '2025-12-01', 'OLD', 'present')",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let result = store.query(&AttendanceFilter::all()).await;

    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

#[tokio::test]
async fn test_set_status_and_remove_respect_filter() {
    let store = store().await;
    for r in [record(1, "S1", 1), record(2, "S1", 1), record(1, "S2", 2)] {
        store.upsert_attendance(&r).await.unwrap();
    }

    let changed = store
        .set_status(
            &AttendanceFilter::all().of(ParticipantId(1)).on(day(1)),
            AttendanceStatus::Excused,
        )
        .await
        .unwrap();
    let removed = store
        .remove(&AttendanceFilter::session(SessionId::new("S2")))
        .await
        .unwrap();
    let unscoped = store.remove(&AttendanceFilter::all()).await;

    assert_eq!(changed, 1);
    assert_eq!(removed, 1);
    assert!(matches!(unscoped, Err(StoreError::UnscopedRemoval)));
    let left = store.query(&AttendanceFilter::all()).await.unwrap();
    assert_eq!(left.len(), 2);
    assert_eq!(left[0].status, AttendanceStatus::Excused);
    assert_eq!(left[1].status, AttendanceStatus::Present);
}

#[tokio::test]
async fn test_session_ids_distinct_newest_first() {
    let store = store().await;
    for r in [record(1, "A", 1), record(2, "A", 1), record(1, "C", 3), record(1, "B", 2)] {
        store.upsert_attendance(&r).await.unwrap();
    }

    let ids = store.session_ids().await.unwrap();

    assert_eq!(
        ids,
        vec![SessionId::new("C"), SessionId::new("B"), SessionId::new("A")]
    );
}

#[tokio::test]
async fn test_session_ids_manual_sorted_by_activity_not_name() {
    let store = store().await;
    store
        .upsert_attendance(&record(1, "manual-2025-12-01", 1))
        .await
        .unwrap();
    store
        .upsert_attendance(&record(1, "20251202-090000-000", 2))
        .await
        .unwrap();

    let ids = store.session_ids().await.unwrap();

    assert_eq!(
        ids,
        vec![
            SessionId::new("20251202-090000-000"),
            SessionId::new("manual-2025-12-01"),
        ]
    );
}

// =========================================================================
// Enrollment & export
// =========================================================================

#[tokio::test]
async fn test_register_reports_update_and_export_joins() {
    let store = store().await;
    let ada = Enrollment {
        participant_id: ParticipantId(1),
        student_id: "S100".into(),
        student_name: None,
    };
    let first = store.register(ada.clone()).await.unwrap();
    let second = store
        .register(Enrollment {
            student_name: Some("Ada".into()),
            ..ada
        })
        .await
        .unwrap();
    store.upsert_attendance(&record(1, "S", 1)).await.unwrap();
    store.upsert_attendance(&record(2, "S", 1)).await.unwrap();

    let exported = store.export(&AttendanceFilter::all()).await.unwrap();

    assert!(!first);
    assert!(second);
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].student_id.as_deref(), Some("S100"));
    assert_eq!(exported[0].student_name.as_deref(), Some("Ada"));
    assert_eq!(exported[1].student_id, None);
    assert_eq!(exported[1].record, record(2, "S", 1));
}

#[tokio::test]
async fn test_find_enrollment_by_student_id_or_name() {
    let store = store().await;
    store
        .register(Enrollment {
            participant_id: ParticipantId(9),
            student_id: "S900".into(),
            student_name: Some("Grace Hopper".into()),
        })
        .await
        .unwrap();

    let by_id = store.find_enrollment("S900").await.unwrap();
    let by_name = store.find_enrollment("GRACE HOPPER").await.unwrap();

    assert_eq!(by_id.unwrap().participant_id, ParticipantId(9));
    assert_eq!(by_name.unwrap().participant_id, ParticipantId(9));
    assert!(store.find_enrollment("nobody").await.unwrap().is_none());
    assert!(store.enrollment(ParticipantId(10)).await.unwrap().is_none());
}

// =========================================================================
// Pipeline & admin on SQLite
// =========================================================================

#[tokio::test]
async fn test_commit_fifty_participants_no_duplicates() {
    let state = SessionState::new(SessionConfig::default());
    let session_id = SessionId::new("20251201-090000-000");
    let code = state.open(session_id.clone()).await.unwrap().code;
    for i in 0..50u64 {
        state
            .submit(ParticipantId(i), &format!("p{i}"), &code, at(1, i as u32))
            .await
            .unwrap();
    }
    let snapshot = state.close().await.unwrap();
    let store = Arc::new(store().await);
    let pipeline = CommitPipeline::new(Arc::clone(&store), CommitConfig::default());

    pipeline.commit(&snapshot).await.unwrap();
    pipeline.commit(&snapshot).await.unwrap();

    let stored = store
        .query(&AttendanceFilter::session(session_id))
        .await
        .unwrap();
    assert_eq!(stored.len(), 50);
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendance")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 50);
}

#[tokio::test]
async fn test_admin_excuse_then_remove_manual_record() {
    let store = store().await;
    store
        .register(Enrollment {
            participant_id: ParticipantId(3),
            student_id: "S300".into(),
            student_name: Some("Alan".into()),
        })
        .await
        .unwrap();

    let who = resolve_participant(&store, "S300").await.unwrap().unwrap();
    let outcome = mark_status(
        &store,
        who.participant_id,
        &who.display_name,
        day(4),
        None,
        AttendanceStatus::Excused,
        at(4, 0),
    )
    .await
    .unwrap();
    assert_eq!(outcome, MarkOutcome::Inserted(SessionId::manual(day(4))));

    let removed = remove_attendance(&store, who.participant_id, Some(day(4)), None)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.query(&AttendanceFilter::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_file_database_creates_directory() {
    let dir = std::env::temp_dir().join(format!("rollcall-store-{}", std::process::id()));
    let url = format!("sqlite:{}", dir.join("nested/attendance.db").display());

    let store = SqliteStore::connect(&url).await.unwrap();
    store.upsert_attendance(&record(1, "S", 1)).await.unwrap();
    store.close().await;

    let reopened = SqliteStore::connect(&url).await.unwrap();
    assert_eq!(reopened.query(&AttendanceFilter::all()).await.unwrap().len(), 1);
    reopened.close().await;
    let _ = std::fs::remove_dir_all(dir);
}
