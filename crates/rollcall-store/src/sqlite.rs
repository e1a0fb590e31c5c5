//! SQLite-backed store.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_types::{
    AttendanceRecord, AttendanceStatus, DATE_FORMAT, Enrollment, ExportRecord, ParticipantId,
    SessionId, TIMESTAMP_FORMAT, TypesError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::migrations::run_migrations;
use crate::{AttendanceFilter, AttendanceStore, StoreError};

const RECORD_COLUMNS: &str =
    "a.participant_id, a.display_name, a.timestamp, a.date, a.session_id, a.status";
const ORDER: &str = " ORDER BY a.date, a.session_id, a.timestamp, a.participant_id";

/// An [`AttendanceStore`] on a SQLite database.
///
/// File databases run in WAL mode so exports don't block commits.
/// `sqlite::memory:` is supported for tests; the pool is then pinned to one
/// connection that never expires, since every connection would otherwise
/// see its own empty database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and brings the
    /// schema up to date.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        if !in_memory {
            ensure_parent_dir(url)?;
        }

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(if in_memory {
                SqliteJournalMode::Memory
            } else {
                SqliteJournalMode::Wal
            })
            .busy_timeout(Duration::from_secs(5));

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, applying pending migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let applied = run_migrations(&pool).await?;
        tracing::debug!(applied, "sqlite store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn ensure_parent_dir(url: &str) -> Result<(), StoreError> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// Participant ids are stored bit-for-bit in SQLite's signed INTEGER.
fn to_db(participant: ParticipantId) -> i64 {
    participant.0 as i64
}

fn from_db(value: i64) -> ParticipantId {
    ParticipantId(value as u64)
}

/// Appends a WHERE clause for `filter`. `prefix` qualifies the columns
/// (`"a."` when the attendance table is aliased, `""` otherwise).
fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &AttendanceFilter, prefix: &str) {
    let mut sep = " WHERE ";
    if let Some(participant) = filter.participant {
        builder
            .push(sep)
            .push(format!("{prefix}participant_id = "))
            .push_bind(to_db(participant));
        sep = " AND ";
    }
    if let Some(session_id) = &filter.session_id {
        builder
            .push(sep)
            .push(format!("{prefix}session_id = "))
            .push_bind(session_id.as_str().to_owned());
        sep = " AND ";
    }
    if let Some(date) = filter.date {
        builder
            .push(sep)
            .push(format!("{prefix}date = "))
            .push_bind(date.format(DATE_FORMAT).to_string());
    }
}

fn row_to_record(row: &SqliteRow) -> Result<AttendanceRecord, StoreError> {
    let timestamp: String = row.try_get("timestamp")?;
    let date: String = row.try_get("date")?;
    let status: Option<String> = row.try_get("status")?;

    Ok(AttendanceRecord {
        participant_id: from_db(row.try_get("participant_id")?),
        display_name: row.try_get("display_name")?,
        timestamp: NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT).map_err(|_| {
            TypesError::InvalidTime {
                field: "timestamp",
                value: timestamp.clone(),
            }
        })?,
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|_| {
            TypesError::InvalidTime {
                field: "date",
                value: date.clone(),
            }
        })?,
        session_id: SessionId::new(row.try_get::<String, _>("session_id")?),
        status: AttendanceStatus::from_stored(status.as_deref())?,
    })
}

fn row_to_enrollment(row: &SqliteRow) -> Result<Enrollment, StoreError> {
    Ok(Enrollment {
        participant_id: from_db(row.try_get("participant_id")?),
        student_id: row.try_get("student_id")?,
        student_name: row.try_get("student_name")?,
    })
}

impl AttendanceStore for SqliteStore {
    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance (participant_id, display_name, timestamp, date, session_id, status)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(participant_id, session_id) DO UPDATE SET
                display_name = excluded.display_name,
                timestamp = excluded.timestamp,
                date = excluded.date,
                status = excluded.status
            "#,
        )
        .bind(to_db(record.participant_id))
        .bind(&record.display_name)
        .bind(record.timestamp.format(TIMESTAMP_FORMAT).to_string())
        .bind(record.date.format(DATE_FORMAT).to_string())
        .bind(record.session_id.as_str())
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder.push(RECORD_COLUMNS).push(" FROM attendance a");
        push_filter(&mut builder, filter, "a.");
        builder.push(ORDER);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn set_status(
        &self,
        filter: &AttendanceFilter,
        status: AttendanceStatus,
    ) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE attendance SET status = ");
        builder.push_bind(status.as_str());
        push_filter(&mut builder, filter, "");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn remove(&self, filter: &AttendanceFilter) -> Result<u64, StoreError> {
        if !filter.is_scoped() {
            return Err(StoreError::UnscopedRemoval);
        }
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM attendance");
        push_filter(&mut builder, filter, "");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn register(&self, enrollment: Enrollment) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query("SELECT 1 FROM enrollment WHERE participant_id = ?")
            .bind(to_db(enrollment.participant_id))
            .fetch_optional(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO enrollment (participant_id, student_id, student_name)
            VALUES (?, ?, ?)
            ON CONFLICT(participant_id) DO UPDATE SET
                student_id = excluded.student_id,
                student_name = excluded.student_name
            "#,
        )
        .bind(to_db(enrollment.participant_id))
        .bind(&enrollment.student_id)
        .bind(enrollment.student_name.as_deref())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(existing.is_some())
    }

    async fn enrollment(&self, participant: ParticipantId) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query(
            "SELECT participant_id, student_id, student_name FROM enrollment WHERE participant_id = ?",
        )
        .bind(to_db(participant))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_enrollment).transpose()
    }

    async fn find_enrollment(&self, identifier: &str) -> Result<Option<Enrollment>, StoreError> {
        let by_student_id = sqlx::query(
            r#"
            SELECT participant_id, student_id, student_name FROM enrollment
            WHERE student_id = ?
            ORDER BY participant_id
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = by_student_id {
            return row_to_enrollment(&row).map(Some);
        }

        let by_name = sqlx::query(
            r#"
            SELECT participant_id, student_id, student_name FROM enrollment
            WHERE student_name = ? COLLATE NOCASE
            ORDER BY participant_id
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        by_name.as_ref().map(row_to_enrollment).transpose()
    }

    async fn export(&self, filter: &AttendanceFilter) -> Result<Vec<ExportRecord>, StoreError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder
            .push(RECORD_COLUMNS)
            .push(", e.student_id, e.student_name")
            .push(" FROM attendance a LEFT JOIN enrollment e ON e.participant_id = a.participant_id");
        push_filter(&mut builder, filter, "a.");
        builder.push(ORDER);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<ExportRecord, StoreError> {
                Ok(ExportRecord {
                    record: row_to_record(row)?,
                    student_id: row.try_get("student_id")?,
                    student_name: row.try_get("student_name")?,
                })
            })
            .collect()
    }

    async fn session_ids(&self) -> Result<Vec<SessionId>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT session_id FROM attendance
            GROUP BY session_id
            ORDER BY MAX(timestamp) DESC, session_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<SessionId, StoreError> {
                Ok(SessionId::new(row.try_get::<String, _>("session_id")?))
            })
            .collect()
    }
}
