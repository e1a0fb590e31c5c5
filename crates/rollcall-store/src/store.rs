//! The durable storage seam.

use std::future::Future;

use rollcall_types::{
    AttendanceRecord, AttendanceStatus, Enrollment, ExportRecord, ParticipantId, SessionId,
};

use crate::{AttendanceFilter, StoreError};

/// Durable attendance storage.
///
/// Records are keyed on `(participant_id, session_id)`; no method may ever
/// leave two records with the same key. Results of [`query`](Self::query)
/// and [`export`](Self::export) are ordered by date, then session, then
/// timestamp, then participant.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one store is shared by the commit pipeline
///   and every admin command, from any task.
pub trait AttendanceStore: Send + Sync + 'static {
    /// Insert `record`, or overwrite the record with the same key.
    fn upsert_attendance(
        &self,
        record: &AttendanceRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Records matching `filter`.
    fn query(
        &self,
        filter: &AttendanceFilter,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send;

    /// Set the status of every record matching `filter`. Returns how many
    /// records changed.
    fn set_status(
        &self,
        filter: &AttendanceFilter,
        status: AttendanceStatus,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Delete every record matching `filter`. Returns how many were deleted.
    ///
    /// # Errors
    /// [`StoreError::UnscopedRemoval`] if `filter` names neither a date nor
    /// a session.
    fn remove(
        &self,
        filter: &AttendanceFilter,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Link a participant to their student identity. Returns `true` if an
    /// existing enrollment was replaced.
    fn register(
        &self,
        enrollment: Enrollment,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// The enrollment of `participant`, if registered.
    fn enrollment(
        &self,
        participant: ParticipantId,
    ) -> impl Future<Output = Result<Option<Enrollment>, StoreError>> + Send;

    /// Looks an enrollment up by student id (exact), then by student name
    /// (case-insensitive).
    fn find_enrollment(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<Enrollment>, StoreError>> + Send;

    /// Records matching `filter`, each left-joined with its enrollment.
    fn export(
        &self,
        filter: &AttendanceFilter,
    ) -> impl Future<Output = Result<Vec<ExportRecord>, StoreError>> + Send;

    /// Every session id that has at least one record, most recently
    /// active first.
    fn session_ids(&self) -> impl Future<Output = Result<Vec<SessionId>, StoreError>> + Send;
}

/// Sort order shared by every implementation.
pub(crate) fn sort_records(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.session_id.cmp(&b.session_id))
            .then_with(|| a.timestamp.cmp(&b.timestamp))
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
}
