use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// One append-only table holds finished activity records; the newest row
/// is the one a summary view rehydrates.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: the progress_records table.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_records (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    course TEXT NOT NULL,
                    avatar INTEGER NOT NULL CHECK (avatar BETWEEN 1 AND 6),
                    equipment TEXT NOT NULL,
                    procedure TEXT NOT NULL,
                    feedback TEXT NOT NULL,
                    safety_answer TEXT NOT NULL,
                    safety_correct INTEGER NOT NULL,
                    mass REAL NOT NULL,
                    initial_volume REAL NOT NULL,
                    final_volume REAL NOT NULL,
                    apparent_density REAL NOT NULL,
                    user_density REAL NOT NULL,
                    mineral TEXT NOT NULL,
                    justification TEXT NOT NULL,
                    sample_id TEXT NOT NULL,
                    label_date TEXT NOT NULL,
                    material TEXT NOT NULL,
                    report TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                    completed INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_records_completed_at
                ON progress_records(completed_at DESC);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?1)")
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
