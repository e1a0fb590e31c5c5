//! Attendance session state for Rollcall.
//!
//! This crate holds the one piece of mutable state the whole system
//! contends on: whether a session is open, which code is valid right now,
//! and who has submitted.
//!
//! 1. **Codes**: [`generate_code`] draws random tokens that never repeat
//!    the immediately preceding one
//! 2. **State machine**: [`AttendanceSession`] implements open / rotate /
//!    submit / close on plain `&mut self`
//! 3. **Sharing**: [`SessionState`] puts that state machine behind a
//!    single mutex so concurrent submissions and the rotation loop each
//!    observe every operation as indivisible
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (above)    ← admission policy, open/close coordination
//!     ↕
//! Session (this crate)  ← the in-memory truth for the active session
//!     ↕
//! Types (below)     ← ParticipantId, SessionId, SubmissionRecord
//! ```

mod code;
mod error;
mod session;
mod state;

pub use code::{CODE_ALPHABET, generate_code};
pub use error::{CodeError, SessionError};
pub use session::{
    Accepted, AttendanceSession, Opened, Rotation, SessionConfig,
    SessionSnapshot, SessionStatus,
};
pub use state::SessionState;
