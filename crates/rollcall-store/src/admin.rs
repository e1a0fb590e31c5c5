//! Administrator corrections applied directly to durable storage.
//!
//! None of these touch a live session. All of them go through the
//! [`AttendanceStore`] methods, so the `(participant, session)` key stays
//! unique whatever they do.

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_types::{
    AttendanceRecord, AttendanceStatus, DATE_FORMAT, Enrollment, ParticipantId, SessionId,
};

use crate::{AttendanceFilter, AttendanceStore, StoreError};

/// What [`mark_status`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Existing records were changed.
    Updated(u64),
    /// No record matched; a new one was written under this session id.
    Inserted(SessionId),
}

/// A participant found by [`resolve_participant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParticipant {
    pub participant_id: ParticipantId,
    /// Best available name: student name, then last display name seen in
    /// attendance, then student id, then the participant id itself.
    pub display_name: String,
    pub enrollment: Option<Enrollment>,
}

/// Scope of an admin correction. A named session wins over a date.
fn scope(participant: ParticipantId, date: Option<NaiveDate>, session: Option<SessionId>) -> AttendanceFilter {
    match (session, date) {
        (Some(session), _) => AttendanceFilter::session(session).of(participant),
        (None, Some(date)) => AttendanceFilter::all().of(participant).on(date),
        (None, None) => AttendanceFilter::all().of(participant),
    }
}

/// Sets `participant`'s status for `date` (or for `session`, if named).
///
/// Matching records are updated in place. If none match, a manual record
/// is inserted, timestamped `now`, under `session` or
/// [`SessionId::manual(date)`](SessionId::manual).
pub async fn mark_status<S: AttendanceStore>(
    store: &S,
    participant: ParticipantId,
    display_name: &str,
    date: NaiveDate,
    session: Option<SessionId>,
    status: AttendanceStatus,
    now: NaiveDateTime,
) -> Result<MarkOutcome, StoreError> {
    let filter = scope(participant, Some(date), session.clone());
    let changed = store.set_status(&filter, status).await?;
    if changed > 0 {
        tracing::info!(%participant, %date, %status, changed, "attendance status updated");
        return Ok(MarkOutcome::Updated(changed));
    }

    let session_id = session.unwrap_or_else(|| SessionId::manual(date));
    let record = AttendanceRecord {
        participant_id: participant,
        display_name: display_name.to_string(),
        timestamp: now,
        date,
        session_id: session_id.clone(),
        status,
    };
    store.upsert_attendance(&record).await?;
    tracing::info!(%participant, %date, %status, %session_id, "manual attendance recorded");
    Ok(MarkOutcome::Inserted(session_id))
}

/// The attendance date of `session`: the date of its stored records, or
/// the date a `manual-YYYY-MM-DD` id names. `None` for a live session with
/// nothing stored yet.
pub async fn session_date<S: AttendanceStore>(
    store: &S,
    session: &SessionId,
) -> Result<Option<NaiveDate>, StoreError> {
    let stored = store
        .query(&AttendanceFilter::session(session.clone()))
        .await?
        .first()
        .map(|record| record.date);
    Ok(stored.or_else(|| {
        session
            .as_str()
            .strip_prefix("manual-")
            .and_then(|date| NaiveDate::parse_from_str(date, DATE_FORMAT).ok())
    }))
}

/// Deletes `participant`'s records for `session`, or for `date` when no
/// session is named.
///
/// # Errors
/// [`StoreError::UnscopedRemoval`] if neither is given.
pub async fn remove_attendance<S: AttendanceStore>(
    store: &S,
    participant: ParticipantId,
    date: Option<NaiveDate>,
    session: Option<SessionId>,
) -> Result<u64, StoreError> {
    let removed = store.remove(&scope(participant, date, session)).await?;
    tracing::info!(%participant, removed, "attendance removed");
    Ok(removed)
}

/// Finds a participant by student id, then student name, then participant
/// id (`42`, `U-42` or `<@42>`).
pub async fn resolve_participant<S: AttendanceStore>(
    store: &S,
    identifier: &str,
) -> Result<Option<ResolvedParticipant>, StoreError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(None);
    }

    let (participant_id, enrollment) = match store.find_enrollment(identifier).await? {
        Some(enrollment) => (enrollment.participant_id, Some(enrollment)),
        None => match identifier.parse::<ParticipantId>() {
            Ok(participant_id) => (participant_id, store.enrollment(participant_id).await?),
            Err(_) => return Ok(None),
        },
    };

    let last_seen = store
        .query(&AttendanceFilter::all().of(participant_id))
        .await?
        .pop()
        .map(|record| record.display_name);

    if enrollment.is_none() && last_seen.is_none() {
        return Ok(None);
    }

    let display_name = enrollment
        .as_ref()
        .and_then(|e| e.student_name.clone())
        .or(last_seen)
        .or_else(|| enrollment.as_ref().map(|e| e.student_id.clone()))
        .unwrap_or_else(|| participant_id.to_string());

    Ok(Some(ResolvedParticipant {
        participant_id,
        display_name,
        enrollment,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, d).unwrap()
    }

    fn at(d: u32) -> NaiveDateTime {
        day(d).and_hms_opt(9, 30, 0).unwrap()
    }

    fn live(participant: u64, session: &str, d: u32) -> AttendanceRecord {
        AttendanceRecord {
            participant_id: ParticipantId(participant),
            display_name: format!("p{participant}"),
            timestamp: at(d),
            date: day(d),
            session_id: SessionId::new(session),
            status: AttendanceStatus::Present,
        }
    }

    #[tokio::test]
    async fn test_mark_status_existing_record_updated_in_place() {
        let store = MemoryStore::new();
        store.upsert_attendance(&live(1, "S", 1)).await.unwrap();

        let outcome = mark_status(
            &store,
            ParticipantId(1),
            "p1",
            day(1),
            None,
            AttendanceStatus::Excused,
            at(2),
        )
        .await
        .unwrap();

        assert_eq!(outcome, MarkOutcome::Updated(1));
        let all = store.query(&AttendanceFilter::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, AttendanceStatus::Excused);
        assert_eq!(all[0].session_id, SessionId::new("S"));
    }

    #[tokio::test]
    async fn test_mark_status_no_record_inserts_manual_session() {
        let store = MemoryStore::new();

        let outcome = mark_status(
            &store,
            ParticipantId(1),
            "ada",
            day(3),
            None,
            AttendanceStatus::Excused,
            at(4),
        )
        .await
        .unwrap();

        assert_eq!(outcome, MarkOutcome::Inserted(SessionId::manual(day(3))));
        let all = store.query(&AttendanceFilter::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].date, day(3));
        assert_eq!(all[0].timestamp, at(4));
        assert_eq!(all[0].status, AttendanceStatus::Excused);
    }

    #[tokio::test]
    async fn test_mark_status_twice_keeps_one_manual_record() {
        let store = MemoryStore::new();
        for status in [AttendanceStatus::Excused, AttendanceStatus::Present] {
            mark_status(&store, ParticipantId(1), "ada", day(3), None, status, at(3))
                .await
                .unwrap();
        }

        let all = store.query(&AttendanceFilter::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn test_mark_status_named_session_ignores_date() {
        let store = MemoryStore::new();
        store.upsert_attendance(&live(1, "S", 1)).await.unwrap();

        let outcome = mark_status(
            &store,
            ParticipantId(1),
            "p1",
            day(9),
            Some(SessionId::new("S")),
            AttendanceStatus::Excused,
            at(9),
        )
        .await
        .unwrap();

        assert_eq!(outcome, MarkOutcome::Updated(1));
    }

    #[tokio::test]
    async fn test_session_date_from_records_then_manual_id() {
        let store = MemoryStore::new();
        store.upsert_attendance(&live(1, "S", 4)).await.unwrap();

        let live_session = session_date(&store, &SessionId::new("S")).await.unwrap();
        let manual = session_date(&store, &SessionId::manual(day(6))).await.unwrap();
        let unknown = session_date(&store, &SessionId::new("nothing")).await.unwrap();

        assert_eq!(live_session, Some(day(4)));
        assert_eq!(manual, Some(day(6)));
        assert_eq!(unknown, None);
    }

    #[tokio::test]
    async fn test_remove_attendance_by_date_leaves_other_days() {
        let store = MemoryStore::new();
        store.upsert_attendance(&live(1, "S1", 1)).await.unwrap();
        store.upsert_attendance(&live(1, "S2", 2)).await.unwrap();
        store.upsert_attendance(&live(2, "S1", 1)).await.unwrap();

        let removed = remove_attendance(&store, ParticipantId(1), Some(day(1)), None)
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_remove_attendance_without_scope_returns_error() {
        let store = MemoryStore::new();
        store.upsert_attendance(&live(1, "S1", 1)).await.unwrap();

        let result = remove_attendance(&store, ParticipantId(1), None, None).await;

        assert!(matches!(result, Err(StoreError::UnscopedRemoval)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_resolve_participant_by_student_id_name_and_id() {
        let store = MemoryStore::new();
        store
            .register(Enrollment {
                participant_id: ParticipantId(42),
                student_id: "S100".into(),
                student_name: Some("Ada Lovelace".into()),
            })
            .await
            .unwrap();

        for identifier in ["S100", "ada lovelace", "42", "<@42>"] {
            let found = resolve_participant(&store, identifier).await.unwrap().unwrap();
            assert_eq!(found.participant_id, ParticipantId(42), "{identifier}");
            assert_eq!(found.display_name, "Ada Lovelace");
        }
    }

    #[tokio::test]
    async fn test_resolve_participant_lookup_order_student_id_name_then_id() {
        let store = MemoryStore::new();
        for (participant, student_id, name) in [(1, "7", "Ada"), (2, "S200", "1"), (7, "S700", "Bob")] {
            store
                .register(Enrollment {
                    participant_id: ParticipantId(participant),
                    student_id: student_id.into(),
                    student_name: Some(name.into()),
                })
                .await
                .unwrap();
        }

        // "7" is participant 7's id but participant 1's student id.
        let by_student_id = resolve_participant(&store, "7").await.unwrap().unwrap();
        // "1" is participant 1's id but participant 2's student name.
        let by_name = resolve_participant(&store, "1").await.unwrap().unwrap();
        let by_participant_id = resolve_participant(&store, "U-7").await.unwrap().unwrap();

        assert_eq!(by_student_id.participant_id, ParticipantId(1));
        assert_eq!(by_name.participant_id, ParticipantId(2));
        assert_eq!(by_participant_id.participant_id, ParticipantId(7));
    }

    #[tokio::test]
    async fn test_resolve_participant_unregistered_uses_attendance_name() {
        let store = MemoryStore::new();
        store.upsert_attendance(&live(7, "S", 1)).await.unwrap();

        let found = resolve_participant(&store, "7").await.unwrap().unwrap();

        assert_eq!(found.display_name, "p7");
        assert!(found.enrollment.is_none());
    }

    #[tokio::test]
    async fn test_resolve_participant_unknown_returns_none() {
        let store = MemoryStore::new();
        assert!(resolve_participant(&store, "nobody").await.unwrap().is_none());
        assert!(resolve_participant(&store, "99").await.unwrap().is_none());
        assert!(resolve_participant(&store, "  ").await.unwrap().is_none());
    }
}
