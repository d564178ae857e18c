//! Task repository
//!
//! CRUD, soft-delete lifecycle, and sync bookkeeping for the `tasks` table.
//!
//! The query functions are generic over `SqliteExecutor`, so the same code
//! runs against the pool for standalone requests and against an open
//! transaction when the sync reconciler composes a batch. `TaskRepository`
//! is the pool-backed convenience wrapper the services hold.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use super::models::{Task, TaskAssertion, TaskPatch};
use crate::error::Result;

#[derive(Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for callers that open their own transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new, server-assigned task. Starts unsynced.
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        task_description: Option<&str>,
        task_date_time: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<Task> {
        let task_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (task_id, user_id, title, task_description, task_date_time, notes,
                               is_completed, is_synced, is_marked_for_deletion, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&task_id)
        .bind(user_id)
        .bind(title)
        .bind(task_description)
        .bind(task_date_time)
        .bind(notes)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created task: {}", task_id);
        Ok(task)
    }

    pub async fn get_by_id(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        get_by_id(&self.pool, user_id, task_id).await
    }

    pub async fn list_by_user(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<Task>> {
        list_by_user(&self.pool, user_id, date).await
    }

    pub async fn update(
        &self,
        user_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>> {
        update(&self.pool, user_id, task_id, patch, Utc::now()).await
    }

    pub async fn soft_delete(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        soft_delete(&self.pool, user_id, task_id).await
    }

    pub async fn soft_delete_by_date(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Task>> {
        soft_delete_by_date(&self.pool, user_id, date).await
    }
}

/// Fetch a task by identity. Soft-deleted rows are returned too; listing
/// visibility is `list_by_user`'s concern, and the reconciler needs to see
/// flagged rows to classify re-deletes.
pub async fn get_by_id<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    task_id: &str,
) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE user_id = ? AND task_id = ?",
    )
    .bind(user_id)
    .bind(task_id)
    .fetch_optional(ex)
    .await?;

    Ok(task)
}

/// List a user's live tasks, oldest scheduled first. With `date`, only that
/// calendar date's tasks are returned (the cacheable partition).
pub async fn list_by_user<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    date: Option<NaiveDate>,
) -> Result<Vec<Task>> {
    let tasks = match date {
        Some(date) => {
            sqlx::query_as::<_, Task>(
                r#"
                SELECT * FROM tasks
                WHERE user_id = ? AND is_marked_for_deletion = 0 AND date(task_date_time) = ?
                ORDER BY task_date_time ASC
                "#,
            )
            .bind(user_id)
            .bind(date)
            .fetch_all(ex)
            .await?
        }
        None => {
            sqlx::query_as::<_, Task>(
                r#"
                SELECT * FROM tasks
                WHERE user_id = ? AND is_marked_for_deletion = 0
                ORDER BY task_date_time ASC
                "#,
            )
            .bind(user_id)
            .fetch_all(ex)
            .await?
        }
    };

    Ok(tasks)
}

/// Apply a partial update to a live task. Any edit resets `is_synced`;
/// `updated_at` is the caller's timestamp (normally "now").
pub async fn update<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    task_id: &str,
    patch: TaskPatch,
    updated_at: DateTime<Utc>,
) -> Result<Option<Task>> {
    let mut sql = String::from("UPDATE tasks SET is_synced = 0, updated_at = ?");

    if patch.title.is_some() {
        sql.push_str(", title = ?");
    }
    if patch.task_description.is_some() {
        sql.push_str(", task_description = ?");
    }
    if patch.notes.is_some() {
        sql.push_str(", notes = ?");
    }
    if patch.task_date_time.is_some() {
        sql.push_str(", task_date_time = ?");
    }
    if patch.is_completed.is_some() {
        sql.push_str(", is_completed = ?");
    }

    sql.push_str(" WHERE user_id = ? AND task_id = ? AND is_marked_for_deletion = 0 RETURNING *");

    let mut query = sqlx::query_as::<_, Task>(&sql).bind(updated_at);

    if let Some(title) = &patch.title {
        query = query.bind(title);
    }
    if let Some(description) = &patch.task_description {
        query = query.bind(description);
    }
    if let Some(notes) = &patch.notes {
        query = query.bind(notes);
    }
    if let Some(date_time) = patch.task_date_time {
        query = query.bind(date_time);
    }
    if let Some(is_completed) = patch.is_completed {
        query = query.bind(is_completed);
    }

    let task = query.bind(user_id).bind(task_id).fetch_optional(ex).await?;

    Ok(task)
}

/// Overwrite every content field from a client assertion. The client's
/// `updated_at` is written through unchanged: last writer wins, and the
/// client is the authority on when its edit happened.
pub async fn overwrite_for_sync<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    item: &TaskAssertion,
) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET title = ?, task_description = ?, task_date_time = ?, notes = ?,
            is_completed = ?, is_synced = 0, updated_at = ?
        WHERE user_id = ? AND task_id = ?
        RETURNING *
        "#,
    )
    .bind(&item.title)
    .bind(&item.task_description)
    .bind(item.task_date_time)
    .bind(&item.notes)
    .bind(item.is_completed)
    .bind(item.updated_at)
    .bind(user_id)
    .bind(&item.task_id)
    .fetch_optional(ex)
    .await?;

    Ok(task)
}

/// Insert a task first seen from a sync client, preserving the client's id
/// and both timestamps.
pub async fn create_for_sync<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    item: &TaskAssertion,
) -> Result<Task> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks (task_id, user_id, title, task_description, task_date_time, notes,
                           is_completed, is_synced, is_marked_for_deletion, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&item.task_id)
    .bind(user_id)
    .bind(&item.title)
    .bind(&item.task_description)
    .bind(item.task_date_time)
    .bind(&item.notes)
    .bind(item.is_completed)
    .bind(item.created_at)
    .bind(item.updated_at)
    .fetch_one(ex)
    .await?;

    tracing::debug!("Created task from sync: {}", item.task_id);
    Ok(task)
}

/// Flag a live task as deleted. Returns None when the task is absent or
/// already flagged.
pub async fn soft_delete<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    task_id: &str,
) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET is_marked_for_deletion = 1, is_synced = 0, updated_at = ?
        WHERE user_id = ? AND task_id = ? AND is_marked_for_deletion = 0
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(task_id)
    .fetch_optional(ex)
    .await?;

    Ok(task)
}

/// Flag every live task on one calendar date as deleted.
pub async fn soft_delete_by_date<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    date: NaiveDate,
) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET is_marked_for_deletion = 1, is_synced = 0, updated_at = ?
        WHERE user_id = ? AND date(task_date_time) = ? AND is_marked_for_deletion = 0
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(date)
    .fetch_all(ex)
    .await?;

    Ok(tasks)
}

/// Permanently remove every soft-deleted row for the user. Returns the
/// purged rows for reporting.
pub async fn hard_delete_purge<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
) -> Result<Vec<Task>> {
    let purged = sqlx::query_as::<_, Task>(
        "DELETE FROM tasks WHERE user_id = ? AND is_marked_for_deletion = 1 RETURNING *",
    )
    .bind(user_id)
    .fetch_all(ex)
    .await?;

    if !purged.is_empty() {
        tracing::debug!("Purged {} soft-deleted task(s) for {}", purged.len(), user_id);
    }

    Ok(purged)
}

/// Mark the given tasks as reconciled. No-op on an empty id list.
pub async fn mark_synced<'e>(
    ex: impl SqliteExecutor<'e>,
    user_id: &str,
    task_ids: &[String],
    synced_at: DateTime<Utc>,
) -> Result<Vec<Task>> {
    if task_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; task_ids.len()].join(", ");
    let sql = format!(
        "UPDATE tasks SET is_synced = 1, synced_at = ? \
         WHERE user_id = ? AND task_id IN ({placeholders}) RETURNING *"
    );

    let mut query = sqlx::query_as::<_, Task>(&sql).bind(synced_at).bind(user_id);
    for task_id in task_ids {
        query = query.bind(task_id);
    }

    let tasks = query.fetch_all(ex).await?;
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> TaskRepository {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        TaskRepository::new(pool)
    }

    fn dt(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn create_and_get_task() {
        let repo = create_test_repo().await;

        let task = repo
            .create("user-1", "Buy milk", None, dt("2025-03-14T09:00:00Z"), None)
            .await
            .unwrap();

        assert!(!task.is_synced);
        assert!(!task.is_marked_for_deletion);
        assert!(task.synced_at.is_none());

        let fetched = repo.get_by_id("user-1", &task.task_id).await.unwrap();
        assert_eq!(fetched.unwrap().title, "Buy milk");

        // Wrong owner sees nothing
        let other = repo.get_by_id("user-2", &task.task_id).await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_date_and_orders_by_time() {
        let repo = create_test_repo().await;

        repo.create("user-1", "Late", None, dt("2025-03-14T18:00:00Z"), None)
            .await
            .unwrap();
        repo.create("user-1", "Early", None, dt("2025-03-14T08:00:00Z"), None)
            .await
            .unwrap();
        repo.create("user-1", "Other day", None, dt("2025-03-15T08:00:00Z"), None)
            .await
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let tasks = repo.list_by_user("user-1", Some(day)).await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Early");
        assert_eq!(tasks[1].title, "Late");

        let all = repo.list_by_user("user-1", None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn update_applies_partial_fields_and_resets_sync_flag() {
        let repo = create_test_repo().await;

        let task = repo
            .create(
                "user-1",
                "Original",
                Some("desc"),
                dt("2025-03-14T09:00:00Z"),
                None,
            )
            .await
            .unwrap();

        mark_synced(
            repo.pool(),
            "user-1",
            &[task.task_id.clone()],
            Utc::now(),
        )
        .await
        .unwrap();

        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            is_completed: Some(true),
            ..Default::default()
        };

        let updated = repo
            .update("user-1", &task.task_id, patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert!(updated.is_completed);
        assert_eq!(updated.task_description.as_deref(), Some("desc"));
        assert!(!updated.is_synced, "any edit must reset is_synced");
    }

    #[tokio::test]
    async fn soft_delete_hides_from_listing_but_not_identity_lookup() {
        let repo = create_test_repo().await;

        let task = repo
            .create("user-1", "Doomed", None, dt("2025-03-14T09:00:00Z"), None)
            .await
            .unwrap();

        let deleted = repo
            .soft_delete("user-1", &task.task_id)
            .await
            .unwrap()
            .unwrap();
        assert!(deleted.is_marked_for_deletion);

        // Re-deleting is a no-op
        let again = repo.soft_delete("user-1", &task.task_id).await.unwrap();
        assert!(again.is_none());

        let listed = repo.list_by_user("user-1", None).await.unwrap();
        assert!(listed.is_empty());

        let by_id = repo.get_by_id("user-1", &task.task_id).await.unwrap();
        assert!(by_id.is_some(), "flagged rows stay queryable until purged");
    }

    #[tokio::test]
    async fn soft_delete_by_date_flags_only_that_date() {
        let repo = create_test_repo().await;

        repo.create("user-1", "A", None, dt("2025-03-14T09:00:00Z"), None)
            .await
            .unwrap();
        repo.create("user-1", "B", None, dt("2025-03-14T12:00:00Z"), None)
            .await
            .unwrap();
        repo.create("user-1", "C", None, dt("2025-03-15T09:00:00Z"), None)
            .await
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let deleted = repo.soft_delete_by_date("user-1", day).await.unwrap();
        assert_eq!(deleted.len(), 2);

        let remaining = repo.list_by_user("user-1", None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "C");
    }

    #[tokio::test]
    async fn purge_removes_only_flagged_rows() {
        let repo = create_test_repo().await;

        let doomed = repo
            .create("user-1", "Doomed", None, dt("2025-03-14T09:00:00Z"), None)
            .await
            .unwrap();
        repo.create("user-1", "Kept", None, dt("2025-03-14T10:00:00Z"), None)
            .await
            .unwrap();
        let foreign = repo
            .create("user-2", "Foreign", None, dt("2025-03-14T11:00:00Z"), None)
            .await
            .unwrap();

        repo.soft_delete("user-1", &doomed.task_id).await.unwrap();
        repo.soft_delete("user-2", &foreign.task_id).await.unwrap();

        let purged = hard_delete_purge(repo.pool(), "user-1").await.unwrap();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].task_id, doomed.task_id);

        assert!(repo
            .get_by_id("user-1", &doomed.task_id)
            .await
            .unwrap()
            .is_none());

        // Another user's flagged rows are untouched
        assert!(repo
            .get_by_id("user-2", &foreign.task_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn mark_synced_stamps_rows_and_skips_empty_input() {
        let repo = create_test_repo().await;

        let a = repo
            .create("user-1", "A", None, dt("2025-03-14T09:00:00Z"), None)
            .await
            .unwrap();
        let b = repo
            .create("user-1", "B", None, dt("2025-03-14T10:00:00Z"), None)
            .await
            .unwrap();

        let empty = mark_synced(repo.pool(), "user-1", &[], Utc::now())
            .await
            .unwrap();
        assert!(empty.is_empty());

        let now = Utc::now();
        let synced = mark_synced(
            repo.pool(),
            "user-1",
            &[a.task_id.clone(), b.task_id.clone()],
            now,
        )
        .await
        .unwrap();

        assert_eq!(synced.len(), 2);
        assert!(synced.iter().all(|t| t.is_synced && t.synced_at.is_some()));
    }

    #[tokio::test]
    async fn create_for_sync_preserves_client_identity_and_timestamps() {
        let repo = create_test_repo().await;

        let item = TaskAssertion {
            task_id: "client-id-1".to_string(),
            title: "From phone".to_string(),
            task_description: None,
            task_date_time: dt("2025-03-14T09:00:00Z"),
            notes: Some("offline".to_string()),
            is_completed: true,
            is_marked_for_deletion: false,
            is_synced: false,
            created_at: dt("2025-03-10T08:00:00Z"),
            updated_at: dt("2025-03-12T17:30:00Z"),
        };

        let task = create_for_sync(repo.pool(), "user-1", &item).await.unwrap();

        assert_eq!(task.task_id, "client-id-1");
        assert_eq!(task.created_at, item.created_at);
        assert_eq!(task.updated_at, item.updated_at);
        assert!(task.is_completed);
        assert!(!task.is_synced);
    }

    #[tokio::test]
    async fn overwrite_for_sync_replaces_content_with_client_timestamp() {
        let repo = create_test_repo().await;

        let task = repo
            .create(
                "user-1",
                "Server copy",
                Some("old"),
                dt("2025-03-14T09:00:00Z"),
                Some("old note"),
            )
            .await
            .unwrap();

        let item = TaskAssertion {
            task_id: task.task_id.clone(),
            title: "Client copy".to_string(),
            task_description: None,
            task_date_time: dt("2025-03-14T11:00:00Z"),
            notes: None,
            is_completed: true,
            is_marked_for_deletion: false,
            is_synced: false,
            created_at: task.created_at,
            updated_at: dt("2025-03-14T12:00:00Z"),
        };

        let updated = overwrite_for_sync(repo.pool(), "user-1", &item)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Client copy");
        assert_eq!(updated.task_description, None);
        assert_eq!(updated.notes, None);
        assert!(updated.is_completed);
        assert_eq!(updated.updated_at, item.updated_at);
    }
}
