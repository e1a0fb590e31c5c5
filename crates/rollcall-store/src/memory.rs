//! In-process store.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use rollcall_types::{
    AttendanceRecord, AttendanceStatus, Enrollment, ExportRecord, ParticipantId, SessionId,
};
use tokio::sync::RwLock;

use crate::store::sort_records;
use crate::{AttendanceFilter, AttendanceStore, StoreError};

type Key = (ParticipantId, SessionId);

/// An [`AttendanceStore`] that keeps everything in memory.
///
/// The map key is the record key, so uniqueness holds by construction.
/// Contents are lost with the process; use it for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Key, AttendanceRecord>>,
    enrollments: RwLock<BTreeMap<ParticipantId, Enrollment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored attendance records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl AttendanceStore for MemoryStore {
    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.key(), record.clone());
        Ok(())
    }

    async fn query(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut found: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_records(&mut found);
        Ok(found)
    }

    async fn set_status(
        &self,
        filter: &AttendanceFilter,
        status: AttendanceStatus,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let mut changed = 0;
        for record in records.values_mut().filter(|r| filter.matches(r)) {
            record.status = status;
            changed += 1;
        }
        Ok(changed)
    }

    async fn remove(&self, filter: &AttendanceFilter) -> Result<u64, StoreError> {
        if !filter.is_scoped() {
            return Err(StoreError::UnscopedRemoval);
        }
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn register(&self, enrollment: Enrollment) -> Result<bool, StoreError> {
        let replaced = self
            .enrollments
            .write()
            .await
            .insert(enrollment.participant_id, enrollment);
        Ok(replaced.is_some())
    }

    async fn enrollment(&self, participant: ParticipantId) -> Result<Option<Enrollment>, StoreError> {
        Ok(self.enrollments.read().await.get(&participant).cloned())
    }

    async fn find_enrollment(&self, identifier: &str) -> Result<Option<Enrollment>, StoreError> {
        let enrollments = self.enrollments.read().await;
        let by_student_id = enrollments.values().find(|e| e.student_id == identifier);
        let found = by_student_id.or_else(|| {
            enrollments.values().find(|e| {
                e.student_name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(identifier))
            })
        });
        Ok(found.cloned())
    }

    async fn export(&self, filter: &AttendanceFilter) -> Result<Vec<ExportRecord>, StoreError> {
        let records = self.query(filter).await?;
        let enrollments = self.enrollments.read().await;
        Ok(records
            .into_iter()
            .map(|r| {
                let enrollment = enrollments.get(&r.participant_id);
                ExportRecord::join(r, enrollment)
            })
            .collect())
    }

    async fn session_ids(&self) -> Result<Vec<SessionId>, StoreError> {
        let records = self.records.read().await;
        let mut latest: HashMap<&SessionId, NaiveDateTime> = HashMap::new();
        for record in records.values() {
            let seen = latest.entry(&record.session_id).or_insert(record.timestamp);
            *seen = (*seen).max(record.timestamp);
        }
        let mut ids: Vec<_> = latest.into_iter().collect();
        ids.sort_by(|(a_id, a_at), (b_id, b_at)| b_at.cmp(a_at).then_with(|| b_id.cmp(a_id)));
        Ok(ids.into_iter().map(|(id, _)| id.clone()).collect())
    }
}
