//! Embedded schema migrations for [`SqliteStore`](crate::SqliteStore).
//!
//! Each migration is a list of statements applied in order and recorded
//! in `_migrations`, so opening an existing database only applies what is
//! new.

use sqlx::{Row, SqlitePool};

use crate::StoreError;

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Unique, strictly increasing.
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_attendance",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                participant_id INTEGER NOT NULL,
                display_name TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                date TEXT NOT NULL,
                session_id TEXT NOT NULL,
                status TEXT,
                UNIQUE(participant_id, session_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_attendance_session ON attendance(session_id)",
            "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        ],
    },
    Migration {
        version: 2,
        name: "create_enrollment",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS enrollment (
                participant_id INTEGER PRIMARY KEY,
                student_id TEXT NOT NULL,
                student_name TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_enrollment_student ON enrollment(student_id)",
        ],
    },
];

/// Applies every migration not yet recorded. Returns how many ran.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<i64> = sqlx::query("SELECT version FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.try_get("version"))
        .collect::<Result<_, _>>()?;

    let mut count = 0;
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        apply(pool, migration).await?;
        tracing::info!(version = migration.version, name = migration.name, "migration applied");
        count += 1;
    }
    Ok(count)
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> Result<(), StoreError> {
    let failed = |source| StoreError::Migration {
        version: migration.version,
        name: migration.name,
        source,
    };

    let mut tx = pool.begin().await?;
    for statement in migration.statements {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    tx.commit().await?;
    Ok(())
}
