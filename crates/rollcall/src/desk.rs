//! `AttendanceDesk` builder and session lifecycle.
//!
//! The desk is the entry point a transport talks to. It ties the layers
//! together: session state, code rotation, and durable storage.

use std::sync::Arc;

use chrono::NaiveDate;
use rollcall_rotation::{
    CloseSummary, CodeDisplay, CodeUpdate, DisplayError, RotationHandle, spawn_rotation,
};
use rollcall_session::{Opened, SessionSnapshot, SessionState, SessionStatus};
use rollcall_store::admin::{self, MarkOutcome, ResolvedParticipant};
use rollcall_store::{
    AttendanceFilter, AttendanceStore, CommitError, CommitPipeline, StoreError,
};
use rollcall_types::{
    AttendanceStatus, DisplayHandle, Enrollment, ExportRecord, ParticipantId, SessionId,
    SessionIdGenerator,
};
use tokio::sync::Mutex;

use crate::admission::{Admission, Clock, SystemClock, admit};
use crate::{ConfigError, RollcallConfig, RollcallError};

/// What [`AttendanceDesk::close`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    pub session_id: SessionId,
    /// Distinct participants who submitted.
    pub total: usize,
    /// Records written to storage. Equals `total` on success.
    pub saved: usize,
    /// Records that needed more than one write attempt.
    pub retried: usize,
    /// Codes issued after the opening one.
    pub rotations: u64,
}

/// Builder for [`AttendanceDesk`].
///
/// # Example
///
/// ```rust,ignore
/// let desk = AttendanceDesk::builder()
///     .config(RollcallConfig::from_env()?)
///     .display(Arc::new(MyDisplay::new()))
///     .store(Arc::new(SqliteStore::connect(&url).await?))
///     .build()?;
/// ```
pub struct AttendanceDeskBuilder<D, S> {
    config: RollcallConfig,
    display: Option<Arc<D>>,
    store: Option<Arc<S>>,
    clock: Arc<dyn Clock>,
}

impl<D: CodeDisplay, S: AttendanceStore> AttendanceDeskBuilder<D, S> {
    fn new() -> Self {
        Self {
            config: RollcallConfig::default(),
            display: None,
            store: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: RollcallConfig) -> Self {
        self.config = config;
        self
    }

    /// Where codes are rendered. Required.
    pub fn display(mut self, display: Arc<D>) -> Self {
        self.display = Some(display);
        self
    }

    /// Where closed sessions are committed. Required.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the system clock (tests, replays).
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validates the configuration and builds the desk.
    pub fn build(self) -> Result<AttendanceDesk<D, S>, RollcallError> {
        self.config.validate()?;
        let display = self.display.ok_or(ConfigError::Missing("display"))?;
        let store = self.store.ok_or(ConfigError::Missing("store"))?;

        Ok(AttendanceDesk {
            state: Arc::new(SessionState::new(self.config.session())),
            pipeline: CommitPipeline::new(store, self.config.commit()),
            display,
            clock: self.clock,
            ids: SessionIdGenerator::new(),
            rotation: Mutex::new(None),
            config: self.config,
        })
    }
}

/// Runs attendance sessions: one open at a time, codes rotating while it
/// is open, submissions committed to storage when it closes.
///
/// All methods take `&self`; share the desk as `Arc<AttendanceDesk<..>>`.
pub struct AttendanceDesk<D, S> {
    config: RollcallConfig,
    state: Arc<SessionState>,
    display: Arc<D>,
    pipeline: CommitPipeline<S>,
    clock: Arc<dyn Clock>,
    ids: SessionIdGenerator,
    /// The rotation task of the open session. Also serializes open/close.
    rotation: Mutex<Option<RotationHandle>>,
}

impl<D: CodeDisplay, S: AttendanceStore> AttendanceDesk<D, S> {
    pub fn builder() -> AttendanceDeskBuilder<D, S> {
        AttendanceDeskBuilder::new()
    }

    pub fn config(&self) -> &RollcallConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        self.pipeline.store()
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Opens a new session, shows its first code on every handle, and
    /// starts rotating.
    ///
    /// # Errors
    /// [`SessionError::AlreadyActive`](rollcall_session::SessionError::AlreadyActive)
    /// if a session is open. Opens are never queued.
    pub async fn open(&self, handles: Vec<DisplayHandle>) -> Result<Opened, RollcallError> {
        let mut slot = self.rotation.lock().await;

        let opened = self.state.open(self.ids.next()).await?;
        for handle in &handles {
            self.state.attach_display(*handle).await?;
        }

        // A task left over from a session closed behind our back.
        if let Some(stale) = slot.take() {
            stale.cancel().await;
        }

        let update = CodeUpdate {
            session_id: opened.session_id.clone(),
            code: opened.code.clone(),
            submitted: 0,
            interval: self.config.rotation().interval,
        };
        let displays = self.state.status().await.displays;
        for handle in &displays {
            self.show_code(handle, &update).await;
        }

        *slot = Some(spawn_rotation(
            Arc::clone(&self.state),
            Arc::clone(&self.display),
            self.config.rotation(),
        ));
        tracing::info!(
            session_id = %opened.session_id,
            displays = displays.len(),
            "attendance desk opened"
        );
        Ok(opened)
    }

    /// Evaluates one submission.
    ///
    /// `raw_code` is trimmed and upper-cased before comparison.
    pub async fn submit(
        &self,
        participant: ParticipantId,
        display_name: &str,
        raw_code: &str,
    ) -> Result<Admission, RollcallError> {
        Ok(admit(&self.state, self.clock.as_ref(), participant, display_name, raw_code).await?)
    }

    /// Closes the session and commits what it collected.
    ///
    /// The snapshot is taken and the session deactivated in one step, then
    /// rotation is stopped, then the snapshot is committed with the session
    /// lock released. The session stays closed whatever the commit does.
    ///
    /// # Errors
    /// - [`SessionError::NotActive`](rollcall_session::SessionError::NotActive)
    ///   if no session is open
    /// - [`CommitError::Partial`] if some records could not be stored
    pub async fn close(&self) -> Result<CloseReport, RollcallError> {
        let mut slot = self.rotation.lock().await;
        let snapshot = self.state.close().await?;
        let rotations = match slot.take() {
            Some(handle) => handle.cancel().await.rotations,
            None => 0,
        };
        drop(slot);

        tracing::info!(
            session_id = %snapshot.session_id,
            submitted = snapshot.len(),
            "attendance session closed, committing"
        );
        let committed = self.pipeline.commit(&snapshot).await;

        let saved = match &committed {
            Ok(report) => report.saved,
            Err(CommitError::Partial { saved, .. }) => *saved,
        };
        self.show_closed(&snapshot, saved).await;

        let report = committed?;
        Ok(CloseReport {
            session_id: snapshot.session_id,
            total: snapshot.submissions.len(),
            saved: report.saved,
            retried: report.retried,
            rotations,
        })
    }

    /// Current session id, code and submission count.
    pub async fn status(&self) -> SessionStatus {
        self.state.status().await
    }

    /// Adds a display to the open session. It gets the code from the next
    /// rotation on.
    pub async fn attach_display(&self, handle: DisplayHandle) -> Result<(), RollcallError> {
        Ok(self.state.attach_display(handle).await?)
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Links `participant` to a student id. Returns `true` if an earlier
    /// registration was replaced.
    pub async fn register(
        &self,
        participant: ParticipantId,
        student_id: &str,
        student_name: Option<&str>,
    ) -> Result<bool, RollcallError> {
        let updated = self
            .store()
            .register(Enrollment {
                participant_id: participant,
                student_id: student_id.trim().to_string(),
                student_name: student_name
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
            .await?;
        tracing::info!(%participant, student_id, updated, "participant registered");
        Ok(updated)
    }

    /// Marks a participant present for `date` or `session`.
    ///
    /// Without a date, a named session's own date is used, else today.
    pub async fn mark_present(
        &self,
        identifier: &str,
        date: Option<NaiveDate>,
        session: Option<SessionId>,
    ) -> Result<MarkOutcome, RollcallError> {
        self.mark(identifier, date, session, AttendanceStatus::Present)
            .await
    }

    /// Marks a participant excused for `date` or `session`.
    ///
    /// Without a date, a named session's own date is used, else today.
    pub async fn excuse(
        &self,
        identifier: &str,
        date: Option<NaiveDate>,
        session: Option<SessionId>,
    ) -> Result<MarkOutcome, RollcallError> {
        self.mark(identifier, date, session, AttendanceStatus::Excused)
            .await
    }

    /// Deletes a participant's records for `session`, or for `date`.
    pub async fn remove_attendance(
        &self,
        identifier: &str,
        date: Option<NaiveDate>,
        session: Option<SessionId>,
    ) -> Result<u64, RollcallError> {
        if date.is_none() && session.is_none() {
            return Err(StoreError::UnscopedRemoval.into());
        }
        let who = self.resolve(identifier).await?;
        Ok(admin::remove_attendance(self.store().as_ref(), who.participant_id, date, session).await?)
    }

    /// Attendance joined with enrollment, for one session or everything.
    pub async fn export(&self, session: Option<SessionId>) -> Result<Vec<ExportRecord>, RollcallError> {
        let filter = AttendanceFilter {
            session_id: session,
            ..AttendanceFilter::default()
        };
        Ok(self.store().export(&filter).await?)
    }

    /// Every session with stored attendance, newest first.
    pub async fn sessions(&self) -> Result<Vec<SessionId>, RollcallError> {
        Ok(self.store().session_ids().await?)
    }

    async fn mark(
        &self,
        identifier: &str,
        date: Option<NaiveDate>,
        session: Option<SessionId>,
        status: AttendanceStatus,
    ) -> Result<MarkOutcome, RollcallError> {
        let who = self.resolve(identifier).await?;
        let now = self.clock.now();
        let date = match (date, &session) {
            (Some(date), _) => date,
            (None, Some(session)) => admin::session_date(self.store().as_ref(), session)
                .await?
                .unwrap_or(now.date()),
            (None, None) => now.date(),
        };
        Ok(admin::mark_status(
            self.store().as_ref(),
            who.participant_id,
            &who.display_name,
            date,
            session,
            status,
            now,
        )
        .await?)
    }

    async fn resolve(&self, identifier: &str) -> Result<ResolvedParticipant, RollcallError> {
        admin::resolve_participant(self.store().as_ref(), identifier)
            .await?
            .ok_or_else(|| RollcallError::UnknownParticipant(identifier.to_string()))
    }

    // -----------------------------------------------------------------------
    // Display helpers
    // -----------------------------------------------------------------------

    async fn show_code(&self, handle: &DisplayHandle, update: &CodeUpdate) {
        match self.display.show_code(handle, update).await {
            Ok(()) => {}
            Err(DisplayError::Gone(gone)) => {
                tracing::warn!(display = %gone, "display gone, detaching");
                self.state.detach_display(&gone).await;
            }
            Err(err) => tracing::warn!(display = %handle, %err, "display update failed"),
        }
    }

    async fn show_closed(&self, snapshot: &SessionSnapshot, saved: usize) {
        let summary = CloseSummary {
            session_id: snapshot.session_id.clone(),
            saved,
            total: snapshot.len(),
        };
        for handle in &snapshot.displays {
            if let Err(err) = self.display.show_closed(handle, &summary).await {
                tracing::warn!(display = %handle, %err, "closing summary not shown");
            }
        }
    }
}
