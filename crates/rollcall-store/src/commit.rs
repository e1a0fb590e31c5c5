//! Close-time commit of a session snapshot.

use std::sync::Arc;
use std::time::Duration;

use rollcall_session::SessionSnapshot;
use rollcall_types::{AttendanceRecord, SessionId};
use serde::{Deserialize, Serialize};

use crate::{AttendanceStore, CommitError};

/// Retry policy for [`CommitPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Tries per record, including the first. At least 1.
    pub max_attempts: u32,
    /// Pause before each retry.
    pub retry_backoff: Duration,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl CommitConfig {
    /// Raise `max_attempts` to at least 1.
    pub fn validated(mut self) -> Self {
        if self.max_attempts == 0 {
            tracing::warn!("commit max_attempts is 0, using 1");
            self.max_attempts = 1;
        }
        self
    }
}

/// Outcome of a fully successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub session_id: SessionId,
    /// Records written. Always the snapshot size on success.
    pub saved: usize,
    /// Records that needed more than one attempt.
    pub retried: usize,
}

/// Persists session snapshots.
///
/// Each submission becomes one [`AttendanceRecord`] written with
/// [`AttendanceStore::upsert_attendance`]. The upsert is keyed on
/// `(participant, session)`, so committing the same snapshot twice, or
/// retrying after a partial failure, converges on the same stored state.
#[derive(Debug)]
pub struct CommitPipeline<S> {
    store: Arc<S>,
    config: CommitConfig,
}

impl<S> Clone for CommitPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: AttendanceStore> CommitPipeline<S> {
    pub fn new(store: Arc<S>, config: CommitConfig) -> Self {
        Self {
            store,
            config: config.validated(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> CommitConfig {
        self.config
    }

    /// Writes every submission in `snapshot`.
    ///
    /// Records are written in submission order, each retried up to
    /// `max_attempts` times. One failing record does not stop the others.
    ///
    /// # Errors
    /// [`CommitError::Partial`] if any record is still unwritten after its
    /// last attempt. The error names those participants; everything else is
    /// durably stored.
    pub async fn commit(&self, snapshot: &SessionSnapshot) -> Result<CommitReport, CommitError> {
        let total = snapshot.len();
        let mut saved = 0;
        let mut retried = 0;
        let mut failed = Vec::new();

        for submission in snapshot.ordered() {
            let record = AttendanceRecord::from_submission(submission);
            match self.write(&record).await {
                Some(attempts) => {
                    saved += 1;
                    if attempts > 1 {
                        retried += 1;
                    }
                }
                None => failed.push(record.participant_id),
            }
        }

        if !failed.is_empty() {
            tracing::error!(
                session_id = %snapshot.session_id,
                saved,
                total,
                failed = failed.len(),
                "partial commit"
            );
            return Err(CommitError::Partial {
                session_id: snapshot.session_id.clone(),
                saved,
                total,
                failed,
            });
        }

        tracing::info!(
            session_id = %snapshot.session_id,
            saved,
            retried,
            "session committed"
        );
        Ok(CommitReport {
            session_id: snapshot.session_id.clone(),
            saved,
            retried,
        })
    }

    /// Returns the number of attempts it took, or `None` once they run out.
    async fn write(&self, record: &AttendanceRecord) -> Option<u32> {
        let mut attempt = 1;
        loop {
            match self.store.upsert_attendance(record).await {
                Ok(()) => return Some(attempt),
                Err(err) if attempt < self.config.max_attempts => {
                    tracing::warn!(
                        participant_id = %record.participant_id,
                        session_id = %record.session_id,
                        attempt,
                        %err,
                        "upsert failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        participant_id = %record.participant_id,
                        session_id = %record.session_id,
                        attempts = attempt,
                        %err,
                        "upsert failed, giving up"
                    );
                    return None;
                }
            }
        }
    }
}
