//! Record types: what a session collects and what storage keeps.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{ParticipantId, SessionId, TypesError};

/// Text format for stored timestamps (`2025-12-01 09:30:12`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text format for stored dates (`2025-12-01`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// AttendanceStatus
// ---------------------------------------------------------------------------

/// How a durable attendance record counts.
///
/// New records always carry an explicit status. Older rows may have a
/// NULL status column; [`AttendanceStatus::from_stored`] reads those as
/// `Present`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// Attended (submitted a valid code, or marked present by an admin).
    #[default]
    Present,
    /// Absent with an excuse recorded by an admin.
    Excused,
}

impl AttendanceStatus {
    /// The lowercase form written to storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Excused => "excused",
        }
    }

    /// Reads a nullable status column. NULL counts as present.
    pub fn from_stored(value: Option<&str>) -> Result<Self, TypesError> {
        match value {
            None => Ok(Self::Present),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "excused" => Ok(Self::Excused),
            _ => Err(TypesError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SubmissionRecord
// ---------------------------------------------------------------------------

/// One accepted submission, held in memory until the session closes.
///
/// Replaced wholesale when the same participant submits again; never
/// edited field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Who submitted.
    pub participant_id: ParticipantId,
    /// The participant's display name at the moment of submission.
    pub display_name: String,
    /// Local wall-clock time of the submission.
    pub submitted_at: NaiveDateTime,
    /// The session the submission was admitted into.
    pub session_id: SessionId,
}

// ---------------------------------------------------------------------------
// AttendanceRecord
// ---------------------------------------------------------------------------

/// A durable attendance row. Unique on `(participant_id, session_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub timestamp: NaiveDateTime,
    /// The attendance date. For live submissions this is the date of the
    /// submission itself, not of the session opening.
    pub date: NaiveDate,
    pub session_id: SessionId,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Converts an in-memory submission into the row that gets committed.
    pub fn from_submission(submission: &SubmissionRecord) -> Self {
        Self {
            participant_id: submission.participant_id,
            display_name: submission.display_name.clone(),
            timestamp: submission.submitted_at,
            date: submission.submitted_at.date(),
            session_id: submission.session_id.clone(),
            status: AttendanceStatus::Present,
        }
    }

    /// Storage key. Two records with the same key are the same row.
    pub fn key(&self) -> (ParticipantId, SessionId) {
        (self.participant_id, self.session_id.clone())
    }
}

// ---------------------------------------------------------------------------
// Enrollment / ExportRecord
// ---------------------------------------------------------------------------

/// Links a participant to their external (gradebook) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub participant_id: ParticipantId,
    /// Institution-issued student id.
    pub student_id: String,
    pub student_name: Option<String>,
}

/// An attendance row left-joined with its enrollment, if any.
///
/// This is the shape handed to export formatters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub student_id: Option<String>,
    pub student_name: Option<String>,
}

impl ExportRecord {
    /// Joins `record` with an optional enrollment.
    pub fn join(record: AttendanceRecord, enrollment: Option<&Enrollment>) -> Self {
        Self {
            record,
            student_id: enrollment.map(|e| e.student_id.clone()),
            student_name: enrollment.and_then(|e| e.student_name.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// DisplayHandle
// ---------------------------------------------------------------------------

/// Points at a message the transport rendered for a session.
///
/// The core never looks inside; it only hands the handle back to the
/// display implementation on every rotation and at close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayHandle {
    pub channel: u64,
    pub message: u64,
}

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_status_parses_case_insensitively() {
        assert_eq!("Present".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Present);
        assert_eq!(" EXCUSED ".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Excused);
    }

    #[test]
    fn test_status_unknown_returns_error() {
        let result = "late".parse::<AttendanceStatus>();
        assert!(matches!(result, Err(TypesError::UnknownStatus(s)) if s == "late"));
    }

    #[test]
    fn test_status_null_reads_as_present() {
        assert_eq!(AttendanceStatus::from_stored(None).unwrap(), AttendanceStatus::Present);
        assert_eq!(
            AttendanceStatus::from_stored(Some("excused")).unwrap(),
            AttendanceStatus::Excused
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&AttendanceStatus::Excused).unwrap();
        assert_eq!(json, "\"excused\"");
    }

    #[test]
    fn test_from_submission_derives_date_and_present_status() {
        let submission = SubmissionRecord {
            participant_id: ParticipantId(5),
            display_name: "ada".into(),
            submitted_at: at(23, 59, 59),
            session_id: SessionId::new("s1"),
        };

        let record = AttendanceRecord::from_submission(&submission);

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(record.timestamp, at(23, 59, 59));
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.key(), (ParticipantId(5), SessionId::new("s1")));
    }

    #[test]
    fn test_export_record_joins_enrollment() {
        let record = AttendanceRecord {
            participant_id: ParticipantId(5),
            display_name: "ada".into(),
            timestamp: at(9, 0, 0),
            date: at(9, 0, 0).date(),
            session_id: SessionId::new("s1"),
            status: AttendanceStatus::Present,
        };
        let enrollment = Enrollment {
            participant_id: ParticipantId(5),
            student_id: "S-100".into(),
            student_name: Some("Ada Lovelace".into()),
        };

        let joined = ExportRecord::join(record.clone(), Some(&enrollment));
        let bare = ExportRecord::join(record, None);

        assert_eq!(joined.student_id.as_deref(), Some("S-100"));
        assert_eq!(joined.student_name.as_deref(), Some("Ada Lovelace"));
        assert!(bare.student_id.is_none());
    }

    #[test]
    fn test_export_record_json_is_flat() {
        let record = AttendanceRecord {
            participant_id: ParticipantId(5),
            display_name: "ada".into(),
            timestamp: at(9, 0, 0),
            date: at(9, 0, 0).date(),
            session_id: SessionId::new("s1"),
            status: AttendanceStatus::Present,
        };
        let value = serde_json::to_value(ExportRecord::join(record, None)).unwrap();

        assert_eq!(value["participant_id"], 5);
        assert_eq!(value["status"], "present");
        assert!(value["student_id"].is_null());
    }
}
