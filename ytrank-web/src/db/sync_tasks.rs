//! Sync task persistence
//!
//! Tasks are audit history and are never deleted. Once a task reaches a
//! terminal status, later updates can still change counters but not the status.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use ytrank_common::models::{SyncStatus, SyncTask, TaskUpdate};
use ytrank_common::{Error, Result};

/// Message recorded on tasks that a previous process left running
pub const INTERRUPTED_MESSAGE: &str = "Sync interrupted - server was restarted";

const TASK_COLUMNS: &str =
    "id, status, started_at, completed_at, total_playlists, processed_playlists, error_message";

/// Insert a new task in `started`
pub async fn insert_task(
    pool: &SqlitePool,
    total: i64,
    started_at: DateTime<Utc>,
) -> Result<SyncTask> {
    let result = sqlx::query(
        r#"
        INSERT INTO sync_tasks (status, started_at, total_playlists, processed_playlists)
        VALUES (?, ?, ?, 0)
        "#,
    )
    .bind(SyncStatus::Started)
    .bind(started_at)
    .bind(total)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_task(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Sync task {} vanished after insert", id)))
}

pub async fn get_task(pool: &SqlitePool, task_id: i64) -> Result<Option<SyncTask>> {
    let task = sqlx::query_as::<_, SyncTask>(&format!(
        "SELECT {} FROM sync_tasks WHERE id = ?",
        TASK_COLUMNS
    ))
    .bind(task_id)
    .fetch_optional(pool)
    .await?;

    Ok(task)
}

/// Most recent task still in `started` or `inprogress`
pub async fn get_active_task(pool: &SqlitePool) -> Result<Option<SyncTask>> {
    let task = sqlx::query_as::<_, SyncTask>(&format!(
        "SELECT {} FROM sync_tasks WHERE status IN (?, ?) ORDER BY id DESC LIMIT 1",
        TASK_COLUMNS
    ))
    .bind(SyncStatus::Started)
    .bind(SyncStatus::InProgress)
    .fetch_optional(pool)
    .await?;

    Ok(task)
}

/// Merge a partial update into a task and return the stored result
///
/// A terminal status stamps `completed_at` the first time it is reached.
/// Once terminal, status and error message no longer change; callers compare
/// the returned row with what they asked for.
pub async fn update_task(
    pool: &SqlitePool,
    task_id: i64,
    update: &TaskUpdate,
    now: DateTime<Utc>,
) -> Result<SyncTask> {
    let completed_at = update.is_terminal().then_some(now);

    let result = sqlx::query(
        r#"
        UPDATE sync_tasks SET
            status = CASE
                WHEN status IN ('completed', 'failed', 'aborted') THEN status
                ELSE COALESCE(?, status)
            END,
            processed_playlists = COALESCE(?, processed_playlists),
            error_message = CASE
                WHEN status IN ('completed', 'failed', 'aborted') THEN error_message
                ELSE COALESCE(?, error_message)
            END,
            completed_at = COALESCE(completed_at, ?)
        WHERE id = ?
        "#,
    )
    .bind(update.status)
    .bind(update.processed_playlists)
    .bind(&update.error_message)
    .bind(completed_at)
    .bind(task_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Sync task {} not found", task_id)));
    }

    get_task(pool, task_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Sync task {} not found", task_id)))
}

/// Every task, most recent first
pub async fn list_tasks(pool: &SqlitePool) -> Result<Vec<SyncTask>> {
    let tasks = sqlx::query_as::<_, SyncTask>(&format!(
        "SELECT {} FROM sync_tasks ORDER BY started_at DESC, id DESC",
        TASK_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

/// Mark tasks left active by a previous process as aborted
///
/// Returns the number of tasks cleaned up.
pub async fn abort_stale_tasks(
    pool: &SqlitePool,
    message: &str,
    now: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE sync_tasks
        SET status = ?, error_message = ?, completed_at = ?
        WHERE status IN (?, ?)
        "#,
    )
    .bind(SyncStatus::Aborted)
    .bind(message)
    .bind(now)
    .bind(SyncStatus::Started)
    .bind(SyncStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
