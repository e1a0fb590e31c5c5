//! Shared, lock-guarded access to the attendance session.

use chrono::NaiveDateTime;
use rollcall_types::{DisplayHandle, ParticipantId, SessionId};
use tokio::sync::Mutex;

use crate::{
    Accepted, AttendanceSession, Opened, Rotation, SessionConfig, SessionError,
    SessionSnapshot, SessionStatus,
};

/// The attendance session, shareable across tasks (`Arc<SessionState>`).
///
/// One mutex guards all four mutating operations. Each method locks,
/// runs the corresponding [`AttendanceSession`] operation, and unlocks
/// before returning, so:
///
/// - "compare code, record submission" can never interleave with a
///   rotation or another submission,
/// - the close-time snapshot and the switch to inactive are one step,
/// - the lock is never held across I/O (storage commits and display
///   updates happen in callers, after these methods return).
#[derive(Debug)]
pub struct SessionState {
    inner: Mutex<AttendanceSession>,
}

impl SessionState {
    /// Creates shared state holding an inactive session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            inner: Mutex::new(AttendanceSession::new(config)),
        }
    }

    /// See [`AttendanceSession::open`].
    pub async fn open(&self, session_id: SessionId) -> Result<Opened, SessionError> {
        self.inner.lock().await.open(session_id)
    }

    /// See [`AttendanceSession::rotate`].
    pub async fn rotate(&self) -> Result<Rotation, SessionError> {
        self.inner.lock().await.rotate()
    }

    /// See [`AttendanceSession::submit`].
    pub async fn submit(
        &self,
        participant_id: ParticipantId,
        display_name: &str,
        code: &str,
        submitted_at: NaiveDateTime,
    ) -> Result<Accepted, SessionError> {
        self.inner
            .lock()
            .await
            .submit(participant_id, display_name, code, submitted_at)
    }

    /// See [`AttendanceSession::close`].
    pub async fn close(&self) -> Result<SessionSnapshot, SessionError> {
        self.inner.lock().await.close()
    }

    /// See [`AttendanceSession::attach_display`].
    pub async fn attach_display(&self, handle: DisplayHandle) -> Result<(), SessionError> {
        self.inner.lock().await.attach_display(handle)
    }

    /// See [`AttendanceSession::detach_display`].
    pub async fn detach_display(&self, handle: &DisplayHandle) {
        self.inner.lock().await.detach_display(handle);
    }

    /// See [`AttendanceSession::status`].
    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.status()
    }

    /// `true` while a session is open.
    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.is_active()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
