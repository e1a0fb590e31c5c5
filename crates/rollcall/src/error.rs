//! Unified error type for Rollcall.

use rollcall_session::SessionError;
use rollcall_store::{CommitError, StoreError};

use crate::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` conversions let `?` lift layer errors into this one.
#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    /// Session state rejected the operation (already open, not open, ...).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Durable storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A closed session could not be fully committed.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An admin command named someone storage doesn't know.
    #[error("participant not found: {0}")]
    UnknownParticipant(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_types::{ParticipantId, SessionId};

    #[test]
    fn test_from_session_error() {
        let err: RollcallError = SessionError::NotActive.into();
        assert!(matches!(err, RollcallError::Session(SessionError::NotActive)));
        assert_eq!(err.to_string(), "no attendance session is active");
    }

    #[test]
    fn test_from_store_error() {
        let err: RollcallError = StoreError::UnscopedRemoval.into();
        assert!(matches!(err, RollcallError::Store(_)));
    }

    #[test]
    fn test_from_commit_error_keeps_counts_in_message() {
        let err: RollcallError = CommitError::Partial {
            session_id: SessionId::new("S"),
            saved: 48,
            total: 50,
            failed: vec![ParticipantId(1), ParticipantId(2)],
        }
        .into();
        assert!(matches!(err, RollcallError::Commit(_)));
        assert!(err.to_string().contains("48 of 50"));
    }

    #[test]
    fn test_from_config_error() {
        let err: RollcallError = ConfigError::Missing("store").into();
        assert!(matches!(err, RollcallError::Config(_)));
    }
}
