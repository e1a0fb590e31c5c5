//! The seam between rotation and whatever renders the code.

use std::future::Future;
use std::time::Duration;

use rollcall_types::{DisplayHandle, SessionId};

use crate::DisplayError;

/// What a display shows while a session is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUpdate {
    pub session_id: SessionId,
    pub code: String,
    /// Submissions accepted so far.
    pub submitted: usize,
    /// How long `code` stays valid.
    pub interval: Duration,
}

/// What a display shows once the session has closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseSummary {
    pub session_id: SessionId,
    /// Records written to storage.
    pub saved: usize,
    /// Records the session held at close.
    pub total: usize,
}

/// Renders attendance codes on some external surface (a chat message,
/// a projector window, a terminal).
///
/// Implementations are shared between the rotation task and the desk, so
/// they take `&self`. Both methods may be slow; nothing calls them with
/// the session lock held.
pub trait CodeDisplay: Send + Sync + 'static {
    /// Replace what `handle` shows with the current code.
    fn show_code(
        &self,
        handle: &DisplayHandle,
        update: &CodeUpdate,
    ) -> impl Future<Output = Result<(), DisplayError>> + Send;

    /// Replace what `handle` shows with the closing summary.
    fn show_closed(
        &self,
        handle: &DisplayHandle,
        summary: &CloseSummary,
    ) -> impl Future<Output = Result<(), DisplayError>> + Send;
}

/// A display that renders nothing. Useful when codes are read through
/// [`status`](rollcall_session::SessionState::status) instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl CodeDisplay for NullDisplay {
    async fn show_code(&self, _: &DisplayHandle, _: &CodeUpdate) -> Result<(), DisplayError> {
        Ok(())
    }

    async fn show_closed(
        &self,
        _: &DisplayHandle,
        _: &CloseSummary,
    ) -> Result<(), DisplayError> {
        Ok(())
    }
}
