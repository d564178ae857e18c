//! Offline-sync reconciliation engine
//!
//! Merges a client-submitted batch of task assertions into server state.
//! Each item is classified first (skip / delete / update / create), then the
//! decision is applied; the whole batch runs inside one transaction so a
//! failure anywhere leaves no partial reconciliation behind. After the
//! per-item pass, every submitted id is marked synced and every soft-deleted
//! row for the user is purged. Cache invalidation for the touched calendar
//! dates happens only after commit.
//!
//! Conflicts are last-writer-wins on the full record: the client's assertion
//! overwrites the server row, carrying the client's `updated_at`. Resubmitting
//! a batch is safe; items already applied classify as `Skip`.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::cache::{listing_key, Cache};
use crate::database::{
    repository, SyncAction, SyncItemOutcome, SyncReport, Task, TaskAssertion,
};
use crate::error::{AppError, Result};
use crate::services::tasks::validate_task_fields;

/// What to do with one batch item, decided before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncDecision {
    /// Server and client already agree; write nothing.
    Skip,
    /// Client deleted the task and the server still has it.
    Delete,
    /// Server row exists and the client's copy wins.
    Update,
    /// First time the server sees this task id.
    Create,
}

fn classify(item: &TaskAssertion, existing: Option<&Task>) -> SyncDecision {
    match existing {
        Some(row) if item.is_synced && item.updated_at == row.updated_at => SyncDecision::Skip,
        Some(_) if item.is_marked_for_deletion => SyncDecision::Delete,
        None if item.is_marked_for_deletion => SyncDecision::Skip,
        Some(_) => SyncDecision::Update,
        None => SyncDecision::Create,
    }
}

#[derive(Clone)]
pub struct SyncService {
    pool: SqlitePool,
    cache: Cache,
}

impl SyncService {
    pub fn new(pool: SqlitePool, cache: Cache) -> Self {
        Self { pool, cache }
    }

    /// Reconcile one batch for `user_id`. All-or-nothing: any store error
    /// rolls the whole batch back and the client resubmits it unchanged.
    pub async fn sync_batch(
        &self,
        user_id: &str,
        batch: &[TaskAssertion],
    ) -> Result<SyncReport> {
        // Reject malformed batches before a transaction is opened
        for item in batch {
            validate_task_fields(
                Some(&item.title),
                item.task_description.as_deref(),
                item.notes.as_deref(),
            )?;
        }

        tracing::info!("Reconciling sync batch of {} item(s) for {}", batch.len(), user_id);

        let mut tx = self.pool.begin().await?;

        let applied = match apply_batch(&mut tx, user_id, batch).await {
            Ok(applied) => applied,
            Err(err) => {
                tracing::error!("Sync batch failed, rolling back: {}", err);
                let _ = tx.rollback().await;
                return Err(AppError::Transaction(err.to_string()));
            }
        };

        tx.commit()
            .await
            .map_err(|err| AppError::Transaction(err.to_string()))?;

        // Post-commit: drop every cached listing the batch touched. Soft-fail;
        // a missed invalidation expires with the entry's TTL.
        for date in &applied.affected_dates {
            self.cache.delete(&listing_key(user_id, *date)).await;
        }

        let report = SyncReport {
            sync_count: applied.outcomes.len(),
            hard_deleted_count: applied.purged.len(),
            outcomes: applied.outcomes,
        };

        tracing::info!(
            "Sync complete for {}: {} item(s), {} purged",
            user_id,
            report.sync_count,
            report.hard_deleted_count
        );

        Ok(report)
    }
}

struct AppliedBatch {
    outcomes: Vec<SyncItemOutcome>,
    purged: Vec<Task>,
    affected_dates: BTreeSet<NaiveDate>,
}

/// The transactional body of a batch: per-item reconciliation in submission
/// order, then the batched synced-mark, then the purge. Every store call
/// goes through `tx` so the batch reads its own writes.
async fn apply_batch(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
    batch: &[TaskAssertion],
) -> Result<AppliedBatch> {
    let mut outcomes = Vec::with_capacity(batch.len());
    let mut affected_dates = BTreeSet::new();

    for item in batch {
        let existing = repository::get_by_id(&mut **tx, user_id, &item.task_id).await?;

        affected_dates.insert(item.task_date_time.date_naive());

        let action = match classify(item, existing.as_ref()) {
            SyncDecision::Skip => SyncAction::Skipped,
            SyncDecision::Delete => {
                repository::soft_delete(&mut **tx, user_id, &item.task_id).await?;
                SyncAction::Deleted
            }
            SyncDecision::Update => {
                repository::overwrite_for_sync(&mut **tx, user_id, item).await?;
                SyncAction::Updated
            }
            SyncDecision::Create => {
                repository::create_for_sync(&mut **tx, user_id, item).await?;
                SyncAction::Created
            }
        };

        outcomes.push(SyncItemOutcome {
            task_id: item.task_id.clone(),
            action,
        });
    }

    let submitted_ids: Vec<String> = batch.iter().map(|item| item.task_id.clone()).collect();
    repository::mark_synced(&mut **tx, user_id, &submitted_ids, Utc::now()).await?;

    // Cleans up rows flagged in this batch and any left over from the
    // direct delete endpoints.
    let purged = repository::hard_delete_purge(&mut **tx, user_id).await?;

    Ok(AppliedBatch {
        outcomes,
        purged,
        affected_dates,
    })
}
