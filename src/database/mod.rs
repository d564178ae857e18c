//! Database module
//!
//! Pool construction, schema migrations, model definitions, and the task
//! repository.

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::TaskRepository;
pub use schema::initialize_database;

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Create a connection pool for the database at `db_path` and bring the
/// schema up to date. WAL mode keeps concurrent readers off the writers'
/// backs during sync batches.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Opening task database at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_database(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn create_pool_initializes_schema() {
        let temp = TempDir::new().unwrap();
        let pool = create_pool(&temp.path().join("tasks.db")).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(count, 0);
    }
}
