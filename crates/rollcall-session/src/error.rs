//! Error types for the session layer.

use rollcall_types::SessionId;

/// Misconfiguration of the code generator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    /// Codes must be at least one character long.
    #[error("code length must be at least 1, got {0}")]
    InvalidLength(usize),
}

/// Errors that can occur while operating on the attendance session.
///
/// All of these are expected outcomes of user actions, reported back so
/// the transport can translate them. None of them leave the state
/// half-modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// `open` was called while a session is already running.
    /// The caller has to close it first; opens are never queued.
    #[error("session {0} is already active")]
    AlreadyActive(SessionId),

    /// `rotate`, `submit` or `close` was called with no session open.
    #[error("no attendance session is active")]
    NotActive,

    /// The submitted code isn't the current one. It was either
    /// mistyped or has already been rotated out.
    #[error("code is invalid or has expired")]
    CodeMismatch,

    /// The code generator is misconfigured.
    #[error(transparent)]
    Code(#[from] CodeError),
}
