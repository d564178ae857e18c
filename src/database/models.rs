//! Database models
//!
//! Rust structs representing the `tasks` entity and the DTOs the services
//! exchange with the API layer and the sync client.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One task row.
///
/// `is_marked_for_deletion` is the soft-delete flag: flagged rows are hidden
/// from listings but stay addressable by id until the reconciler's purge
/// removes them. `updated_at` is the conflict-comparison timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub task_description: Option<String>,
    pub task_date_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub is_completed: bool,
    pub is_synced: bool,
    pub is_marked_for_deletion: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Calendar date this task falls on; keys the listing cache partition.
    pub fn calendar_date(&self) -> NaiveDate {
        self.task_date_time.date_naive()
    }
}

/// Create task request (direct endpoint)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub task_description: Option<String>,
    pub task_date: NaiveDate,
    pub task_time: NaiveTime,
    pub notes: Option<String>,
}

/// Update task request (direct endpoint). Absent fields are left untouched;
/// date and time can be replaced independently of each other.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub task_description: Option<String>,
    pub notes: Option<String>,
    pub is_completed: Option<bool>,
    pub task_date: Option<NaiveDate>,
    pub task_time: Option<NaiveTime>,
}

/// Column-level partial update applied by the repository.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub task_description: Option<String>,
    pub notes: Option<String>,
    pub task_date_time: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
}

/// Client-asserted task state submitted in a sync batch.
///
/// Timestamps are the client's own; for creates and overwrites they are
/// written through verbatim (the client is authoritative for its edits).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssertion {
    pub task_id: String,
    pub title: String,
    pub task_description: Option<String>,
    pub task_date_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub is_completed: bool,
    pub is_marked_for_deletion: bool,
    pub is_synced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the reconciler did with one batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Created,
    Updated,
    Deleted,
    Skipped,
}

/// Per-item outcome reported back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct SyncItemOutcome {
    pub task_id: String,
    pub action: SyncAction,
}

/// Aggregate result of one reconciliation batch.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<SyncItemOutcome>,
    pub sync_count: usize,
    pub hard_deleted_count: usize,
}
