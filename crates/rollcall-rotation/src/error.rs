//! Error types for code displays.

use rollcall_types::DisplayHandle;

/// Why a display could not be updated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayError {
    /// The display no longer exists (message deleted, channel gone).
    /// The rotation task stops pushing to it but keeps rotating.
    #[error("display {0} is gone")]
    Gone(DisplayHandle),

    /// The update failed for some other reason. Logged and ignored; the
    /// next rotation tries again.
    #[error("display update failed: {0}")]
    Failed(String),
}
