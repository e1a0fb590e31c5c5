//! The attendance session state machine.
//!
//! [`AttendanceSession`] is constructed once, inactive, and reused for
//! every logical session the process runs:
//!
//! ```text
//!            open(id)                 close()
//! [Inactive] ────────→ [Active] ──────────────→ [Inactive]
//!                       │    ↑                   (snapshot handed out)
//!                       └────┘
//!                 rotate() / submit()
//! ```
//!
//! # Concurrency note
//!
//! This type is NOT thread-safe by itself; every operation takes
//! `&mut self`. [`SessionState`](crate::SessionState) wraps it in a mutex
//! for sharing between tasks. Keeping the locking out of here lets the
//! state machine be tested synchronously.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rollcall_types::{DisplayHandle, ParticipantId, SessionId, SubmissionRecord};
use serde::{Deserialize, Serialize};

use crate::{SessionError, generate_code};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior. Fixed for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of symbols in each attendance code. Must be at least 1;
    /// 4 or more is recommended.
    pub code_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { code_length: 4 }
    }
}

// ---------------------------------------------------------------------------
// Operation outcomes
// ---------------------------------------------------------------------------

/// Returned by a successful `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub session_id: SessionId,
    /// The first valid code.
    pub code: String,
}

/// Returned by a successful `rotate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub session_id: SessionId,
    /// The code that is valid from now on.
    pub code: String,
    /// The code it replaced. Always different from `code`.
    pub previous: String,
    /// Distinct submitters so far, for the display.
    pub submitted: usize,
    /// Where the new code has to be shown.
    pub displays: Vec<DisplayHandle>,
}

/// Returned by an accepted `submit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    /// Distinct submitters after this submission.
    pub submitted: usize,
    /// `true` if this replaced the participant's earlier submission.
    pub replaced: bool,
}

/// Everything collected during one session, captured at close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    /// One record per distinct participant (their last accepted call).
    pub submissions: HashMap<ParticipantId, SubmissionRecord>,
    /// Display handles that were attached while the session ran.
    pub displays: Vec<DisplayHandle>,
}

impl SessionSnapshot {
    /// Number of distinct submitters.
    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    /// `true` if nobody submitted.
    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Submissions ordered by submission time, then participant.
    pub fn ordered(&self) -> Vec<&SubmissionRecord> {
        let mut records: Vec<_> = self.submissions.values().collect();
        records.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then(a.participant_id.cmp(&b.participant_id))
        });
        records
    }
}

/// A read-only view of the session, for displays and status commands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub session_id: Option<SessionId>,
    pub current_code: Option<String>,
    pub submitted: usize,
    pub displays: Vec<DisplayHandle>,
}

impl SessionStatus {
    /// `true` while a session is open.
    pub fn is_active(&self) -> bool {
        self.session_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// AttendanceSession
// ---------------------------------------------------------------------------

/// Lifecycle phase. The current code only exists inside `Active`, so
/// "code is set iff a session is open" holds by construction.
#[derive(Debug)]
enum Phase {
    Inactive,
    Active(ActiveSession),
}

#[derive(Debug)]
struct ActiveSession {
    session_id: SessionId,
    current_code: String,
    /// `None` until the first rotation.
    previous_code: Option<String>,
    displays: Vec<DisplayHandle>,
}

/// The process-wide attendance session, passed around explicitly.
#[derive(Debug)]
pub struct AttendanceSession {
    config: SessionConfig,
    phase: Phase,
    /// Keyed by participant, so each participant appears at most once.
    submissions: HashMap<ParticipantId, SubmissionRecord>,
}

impl AttendanceSession {
    /// Creates an inactive session with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Inactive,
            submissions: HashMap::new(),
        }
    }

    /// Opens a new session under `session_id` and draws its first code.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyActive`] if a session is already open
    /// - [`SessionError::Code`] if the configured code length is invalid
    pub fn open(&mut self, session_id: SessionId) -> Result<Opened, SessionError> {
        if let Phase::Active(active) = &self.phase {
            return Err(SessionError::AlreadyActive(active.session_id.clone()));
        }

        // Draw before mutating anything, so a config error leaves us inactive.
        let code = generate_code(self.config.code_length, None)?;

        self.submissions.clear();
        self.phase = Phase::Active(ActiveSession {
            session_id: session_id.clone(),
            current_code: code.clone(),
            previous_code: None,
            displays: Vec::new(),
        });

        tracing::info!(%session_id, "attendance session opened");
        Ok(Opened { session_id, code })
    }

    /// Replaces the current code with a fresh one.
    ///
    /// # Errors
    /// Returns [`SessionError::NotActive`] if no session is open.
    pub fn rotate(&mut self) -> Result<Rotation, SessionError> {
        let Phase::Active(active) = &mut self.phase else {
            return Err(SessionError::NotActive);
        };

        let code =
            generate_code(self.config.code_length, Some(&active.current_code))?;
        let previous = std::mem::replace(&mut active.current_code, code.clone());
        active.previous_code = Some(previous.clone());

        tracing::debug!(session_id = %active.session_id, "code rotated");
        Ok(Rotation {
            session_id: active.session_id.clone(),
            code,
            previous,
            submitted: self.submissions.len(),
            displays: active.displays.clone(),
        })
    }

    /// Records a submission if `code` equals the current code.
    ///
    /// A participant who submits again replaces their earlier record;
    /// that is not an error.
    ///
    /// # Errors
    /// - [`SessionError::NotActive`] if no session is open
    /// - [`SessionError::CodeMismatch`] if `code` isn't the current code
    pub fn submit(
        &mut self,
        participant_id: ParticipantId,
        display_name: &str,
        code: &str,
        submitted_at: NaiveDateTime,
    ) -> Result<Accepted, SessionError> {
        let Phase::Active(active) = &self.phase else {
            return Err(SessionError::NotActive);
        };
        if code != active.current_code {
            return Err(SessionError::CodeMismatch);
        }

        let record = SubmissionRecord {
            participant_id,
            display_name: display_name.to_string(),
            submitted_at,
            session_id: active.session_id.clone(),
        };
        let replaced = self.submissions.insert(participant_id, record).is_some();

        Ok(Accepted {
            submitted: self.submissions.len(),
            replaced,
        })
    }

    /// Closes the session and hands back everything it collected.
    ///
    /// The snapshot is taken and the session deactivated in the same call,
    /// so under the [`SessionState`](crate::SessionState) lock no submission
    /// can land in between.
    ///
    /// # Errors
    /// Returns [`SessionError::NotActive`] if no session is open.
    pub fn close(&mut self) -> Result<SessionSnapshot, SessionError> {
        let Phase::Active(active) =
            std::mem::replace(&mut self.phase, Phase::Inactive)
        else {
            return Err(SessionError::NotActive);
        };

        let submissions = std::mem::take(&mut self.submissions);
        tracing::info!(
            session_id = %active.session_id,
            submitted = submissions.len(),
            "attendance session closed"
        );

        Ok(SessionSnapshot {
            session_id: active.session_id,
            submissions,
            displays: active.displays,
        })
    }

    /// Remembers a transport-rendered message to keep in sync.
    ///
    /// # Errors
    /// Returns [`SessionError::NotActive`] if no session is open.
    pub fn attach_display(&mut self, handle: DisplayHandle) -> Result<(), SessionError> {
        let Phase::Active(active) = &mut self.phase else {
            return Err(SessionError::NotActive);
        };
        if !active.displays.contains(&handle) {
            active.displays.push(handle);
        }
        Ok(())
    }

    /// Forgets a display handle (e.g. the message was deleted).
    pub fn detach_display(&mut self, handle: &DisplayHandle) {
        if let Phase::Active(active) = &mut self.phase {
            active.displays.retain(|h| h != handle);
        }
    }

    /// Returns `true` while a session is open.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    /// The currently valid code, if a session is open.
    pub fn current_code(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active(active) => Some(&active.current_code),
            Phase::Inactive => None,
        }
    }

    /// The code replaced by the last rotation, if any.
    pub fn previous_code(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active(active) => active.previous_code.as_deref(),
            Phase::Inactive => None,
        }
    }

    /// Looks up a participant's current submission.
    pub fn submission(&self, participant_id: &ParticipantId) -> Option<&SubmissionRecord> {
        self.submissions.get(participant_id)
    }

    /// Number of distinct submitters in the open session.
    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }

    /// A read-only view of the session.
    pub fn status(&self) -> SessionStatus {
        match &self.phase {
            Phase::Active(active) => SessionStatus {
                session_id: Some(active.session_id.clone()),
                current_code: Some(active.current_code.clone()),
                submitted: self.submissions.len(),
                displays: active.displays.clone(),
            },
            Phase::Inactive => SessionStatus::default(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
