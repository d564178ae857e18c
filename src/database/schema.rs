//! Database schema and migrations
//!
//! Versioned migrations tracked in a `migrations` table. Each migration is
//! applied inside its own transaction.

use crate::error::Result;
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize the database schema, applying any pending migrations.
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);

    apply_migrations(pool, current_version).await?;

    tracing::info!("Database schema up to date");
    Ok(())
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32) -> Result<()> {
    for (version, sql) in migrations() {
        if version > current_version {
            tracing::info!("Applying migration version {}", version);

            let mut tx = pool.begin().await?;

            for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
        }
    }

    Ok(())
}

fn migrations() -> Vec<(i32, &'static str)> {
    vec![(
        1,
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            task_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            task_description TEXT,
            task_date_time TEXT NOT NULL,
            notes TEXT,
            is_completed INTEGER NOT NULL DEFAULT 0,
            is_synced INTEGER NOT NULL DEFAULT 0,
            is_marked_for_deletion INTEGER NOT NULL DEFAULT 0,
            synced_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks (user_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_user_date_time ON tasks (user_id, task_date_time)
        "#,
    )]
}
