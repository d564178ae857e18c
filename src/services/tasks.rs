//! Task service
//!
//! Orchestrates the direct task endpoints: quota check on create, CRUD via
//! the repository, read-through caching of date-scoped listings, and cache
//! invalidation after every mutation.

use chrono::{NaiveDate, NaiveDateTime};

use crate::cache::{listing_key, Cache};
use crate::config::{
    DEFAULT_TASKS_PER_DATE_LIMIT, LISTING_CACHE_TTL_SECONDS, MAX_DESCRIPTION_LEN, MAX_NOTES_LEN,
    MAX_TITLE_LEN,
};
use crate::database::{CreateTaskRequest, Task, TaskPatch, TaskRepository, UpdateTaskRequest};
use crate::error::{AppError, Result};
use crate::services::RateLimiter;

/// Bounds check shared by the direct endpoints and the sync batch.
/// `title` is None for patches that leave the title untouched.
pub(crate) fn validate_task_fields(
    title: Option<&str>,
    description: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    if let Some(title) = title {
        if title.is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(format!(
                "title cannot exceed {MAX_TITLE_LEN} characters"
            )));
        }
    }
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        return Err(AppError::Validation(format!(
            "description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(AppError::Validation(format!(
            "notes cannot exceed {MAX_NOTES_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct TaskService {
    repo: TaskRepository,
    cache: Cache,
    limiter: RateLimiter,
}

impl TaskService {
    pub fn new(repo: TaskRepository, cache: Cache, limiter: RateLimiter) -> Self {
        Self { repo, cache, limiter }
    }

    /// Create a task. Counts against the user's per-date creation quota and
    /// invalidates the cached listing for the task's date.
    pub async fn create_task(&self, user_id: &str, req: CreateTaskRequest) -> Result<Task> {
        validate_task_fields(
            Some(&req.title),
            req.task_description.as_deref(),
            req.notes.as_deref(),
        )?;

        self.limiter
            .check_task_creation_limit(user_id, req.task_date, DEFAULT_TASKS_PER_DATE_LIMIT)
            .await?;

        let date_time = NaiveDateTime::new(req.task_date, req.task_time).and_utc();

        let task = self
            .repo
            .create(
                user_id,
                &req.title,
                req.task_description.as_deref(),
                date_time,
                req.notes.as_deref(),
            )
            .await?;

        self.invalidate_listing(user_id, req.task_date).await;

        tracing::info!("Task created: {}", task.task_id);
        Ok(task)
    }

    /// List the user's live tasks. Date-scoped listings are served from the
    /// cache when present and cached after a store read; undated listings
    /// always hit the store.
    pub async fn list_tasks(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<Task>> {
        let Some(date) = date else {
            return self.repo.list_by_user(user_id, None).await;
        };

        let key = listing_key(user_id, date);

        if let Some(cached) = self.cache.get::<Vec<Task>>(&key).await {
            tracing::debug!("Listing cache hit: {}", key);
            return Ok(cached);
        }

        let tasks = self.repo.list_by_user(user_id, Some(date)).await?;
        self.cache.set(&key, &tasks, LISTING_CACHE_TTL_SECONDS).await;

        Ok(tasks)
    }

    /// Fetch one live task by id.
    pub async fn get_task(&self, user_id: &str, task_id: &str) -> Result<Task> {
        match self.repo.get_by_id(user_id, task_id).await? {
            Some(task) if !task.is_marked_for_deletion => Ok(task),
            _ => Err(AppError::TaskNotFound(task_id.to_string())),
        }
    }

    /// Partially update a task. A patch may replace the date, the time, or
    /// both; the untouched half of `task_date_time` is kept. Listings for
    /// the old date, and the new one when the task moved, are invalidated.
    pub async fn update_task(
        &self,
        user_id: &str,
        task_id: &str,
        req: UpdateTaskRequest,
    ) -> Result<Task> {
        validate_task_fields(
            req.title.as_deref(),
            req.task_description.as_deref(),
            req.notes.as_deref(),
        )?;

        let existing = self.get_task(user_id, task_id).await?;
        let old_date = existing.calendar_date();

        let task_date_time = if req.task_date.is_some() || req.task_time.is_some() {
            let current = existing.task_date_time.naive_utc();
            let merged = NaiveDateTime::new(
                req.task_date.unwrap_or_else(|| current.date()),
                req.task_time.unwrap_or_else(|| current.time()),
            );
            Some(merged.and_utc())
        } else {
            None
        };

        let patch = TaskPatch {
            title: req.title,
            task_description: req.task_description,
            notes: req.notes,
            task_date_time,
            is_completed: req.is_completed,
        };

        let updated = self
            .repo
            .update(user_id, task_id, patch)
            .await?
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))?;

        self.invalidate_listing(user_id, old_date).await;
        let new_date = updated.calendar_date();
        if new_date != old_date {
            self.invalidate_listing(user_id, new_date).await;
        }

        tracing::debug!("Task updated: {}", task_id);
        Ok(updated)
    }

    /// Soft-delete one task and invalidate its date's listing.
    pub async fn soft_delete_task(&self, user_id: &str, task_id: &str) -> Result<Task> {
        let deleted = self
            .repo
            .soft_delete(user_id, task_id)
            .await?
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))?;

        self.invalidate_listing(user_id, deleted.calendar_date()).await;

        tracing::info!("Task soft-deleted: {}", task_id);
        Ok(deleted)
    }

    /// Soft-delete every live task on one calendar date.
    pub async fn soft_delete_by_date(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Task>> {
        let deleted = self.repo.soft_delete_by_date(user_id, date).await?;

        self.invalidate_listing(user_id, date).await;

        tracing::info!("Soft-deleted {} task(s) on {}", deleted.len(), date);
        Ok(deleted)
    }

    /// Drop the cached listing for `(user, date)`. Failures are logged by
    /// the facade and otherwise ignored: a stale entry expires on its own.
    async fn invalidate_listing(&self, user_id: &str, date: NaiveDate) {
        self.cache.delete(&listing_key(user_id, date)).await;
    }
}
