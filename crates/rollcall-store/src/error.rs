//! Error types for the storage layer.

use rollcall_types::{ParticipantId, SessionId, TypesError};

/// Errors from an [`AttendanceStore`](crate::AttendanceStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed a statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed to apply.
    #[error("migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Could not prepare the database location.
    #[error("cannot prepare database path: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be read back into a record.
    #[error("corrupt row: {0}")]
    Corrupt(#[from] TypesError),

    /// A removal named neither a date nor a session. Wiping a participant's
    /// whole history has to be done one scope at a time.
    #[error("removal needs a date or a session")]
    UnscopedRemoval,

    /// The backend is temporarily unable to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The commit pipeline could not persist the whole snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// `saved` of `total` records were written. `failed` lists the
    /// participants whose record is missing from storage.
    #[error("session {session_id}: saved {saved} of {total} records")]
    Partial {
        session_id: SessionId,
        saved: usize,
        total: usize,
        failed: Vec<ParticipantId>,
    },
}
