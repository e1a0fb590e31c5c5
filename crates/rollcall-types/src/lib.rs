//! Shared vocabulary for Rollcall.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - **Identity** ([`ParticipantId`], [`SessionId`], [`SessionIdGenerator`]):
//!   who submitted, and during which session.
//! - **Records** ([`SubmissionRecord`], [`AttendanceRecord`],
//!   [`Enrollment`], [`ExportRecord`]): what is kept in memory while a
//!   session is open and what ends up in durable storage afterwards.
//! - **Display** ([`DisplayHandle`]): an opaque pointer to a message the
//!   transport rendered, so the rotation loop can keep it in sync.
//!
//! # Architecture
//!
//! ```text
//! Session (in-memory)  ──close──→  Commit  ──upsert──→  Store (durable)
//!   SubmissionRecord                        AttendanceRecord
//! ```

mod error;
mod ids;
mod records;

pub use error::TypesError;
pub use ids::{ParticipantId, SessionId, SessionIdGenerator};
pub use records::{
    AttendanceRecord, AttendanceStatus, DATE_FORMAT, DisplayHandle,
    Enrollment, ExportRecord, SubmissionRecord, TIMESTAMP_FORMAT,
};
