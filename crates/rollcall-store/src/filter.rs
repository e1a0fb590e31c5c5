use chrono::NaiveDate;
use rollcall_types::{AttendanceRecord, ParticipantId, SessionId};
use serde::{Deserialize, Serialize};

/// Selects attendance records. Unset fields match everything.
///
/// ```ignore
/// let filter = AttendanceFilter::all().on(date).of(participant);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceFilter {
    pub participant: Option<ParticipantId>,
    pub session_id: Option<SessionId>,
    pub date: Option<NaiveDate>,
}

impl AttendanceFilter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches records of one session.
    pub fn session(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::default()
        }
    }

    /// Narrow to one participant.
    pub fn of(mut self, participant: ParticipantId) -> Self {
        self.participant = Some(participant);
        self
    }

    /// Narrow to one date.
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Narrow to one session.
    pub fn in_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// `true` if a date or a session is named.
    pub fn is_scoped(&self) -> bool {
        self.date.is_some() || self.session_id.is_some()
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.participant.is_none_or(|p| p == record.participant_id)
            && self
                .session_id
                .as_ref()
                .is_none_or(|s| *s == record.session_id)
            && self.date.is_none_or(|d| d == record.date)
    }
}
