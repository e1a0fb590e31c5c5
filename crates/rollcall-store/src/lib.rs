//! Durable storage for Rollcall.
//!
//! Live sessions keep submissions in memory
//! ([`rollcall_session`]). At close, the [`CommitPipeline`] turns the
//! snapshot into [`AttendanceRecord`](rollcall_types::AttendanceRecord)s
//! and upserts them into an [`AttendanceStore`]:
//!
//! - [`SqliteStore`]: the production store (sqlx, WAL mode, embedded
//!   migrations).
//! - [`MemoryStore`]: same contract, in memory.
//!
//! The [`admin`] module holds the out-of-band corrections administrators
//! make after the fact (excuse, mark present, remove).

pub mod admin;
mod commit;
mod error;
mod filter;
mod memory;
pub mod migrations;
mod sqlite;
mod store;

pub use admin::{MarkOutcome, ResolvedParticipant};
pub use commit::{CommitConfig, CommitPipeline, CommitReport};
pub use error::{CommitError, StoreError};
pub use filter::AttendanceFilter;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::AttendanceStore;
