//! # Rollcall
//!
//! Attendance-taking with rotating codes.
//!
//! An administrator opens a session; a short code is shown on one or more
//! displays and replaced every few seconds. Participants submit the code
//! they see. When the session closes, everyone who submitted a valid code
//! is committed to durable storage in one batch.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rollcall::prelude::*;
//!
//! let config = RollcallConfig::from_env()?;
//! let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
//! let desk = AttendanceDesk::builder()
//!     .config(config)
//!     .display(Arc::new(NullDisplay))
//!     .store(store)
//!     .build()?;
//!
//! let opened = desk.open(vec![]).await?;
//! desk.submit(ParticipantId(1), "ada", &opened.code).await?;
//! let report = desk.close().await?;
//! ```
//!
//! ## Crates
//!
//! - [`rollcall_types`]: identifiers and records
//! - [`rollcall_session`]: session state and code generation
//! - [`rollcall_rotation`]: the timed rotation task and display seam
//! - [`rollcall_store`]: storage, commit pipeline, admin corrections

mod admission;
mod config;
mod desk;
mod error;

pub use admission::{Admission, Clock, SystemClock, normalize_code};
pub use config::{
    ConfigError, ENV_CODE_LENGTH, ENV_COMMIT_ATTEMPTS, ENV_DATABASE_URL, ENV_ROTATION_INTERVAL,
    RollcallConfig,
};
pub use desk::{AttendanceDesk, AttendanceDeskBuilder, CloseReport};
pub use error::RollcallError;

pub use rollcall_rotation;
pub use rollcall_session;
pub use rollcall_store;
pub use rollcall_types;

/// The types most callers need.
pub mod prelude {
    pub use crate::{
        Admission, AttendanceDesk, Clock, CloseReport, RollcallConfig, RollcallError,
    };
    pub use rollcall_rotation::{
        CloseSummary, CodeDisplay, CodeUpdate, DisplayError, NullDisplay,
    };
    pub use rollcall_session::{Opened, SessionError, SessionStatus};
    pub use rollcall_store::{
        AttendanceFilter, AttendanceStore, CommitError, MarkOutcome, MemoryStore, SqliteStore,
        StoreError,
    };
    pub use rollcall_types::{
        AttendanceRecord, AttendanceStatus, DisplayHandle, Enrollment, ExportRecord,
        ParticipantId, SessionId,
    };
}
