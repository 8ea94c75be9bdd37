//! Sync control endpoints
//!
//! - POST /sync - start mirroring every stored playlist to the remote endpoint
//! - GET /sync/status - the active task, if any
//! - POST /sync/abort/:task_id - request cancellation
//! - GET /sync/history - every task, most recent first

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use ytrank_common::models::{SyncStatus, SyncTask};

use crate::db::playlists;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StartSyncResponse {
    pub task_id: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SyncStatusResponse {
    Idle {
        active: bool,
    },
    Active {
        active: bool,
        task_id: i64,
        status: SyncStatus,
        total: i64,
        processed: i64,
        started_at: DateTime<Utc>,
    },
}

impl From<Option<SyncTask>> for SyncStatusResponse {
    fn from(task: Option<SyncTask>) -> Self {
        match task {
            Some(task) => SyncStatusResponse::Active {
                active: true,
                task_id: task.id,
                status: task.status,
                total: task.total_playlists,
                processed: task.processed_playlists,
                started_at: task.started_at,
            },
            None => SyncStatusResponse::Idle { active: false },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AbortResponse {
    pub task_id: i64,
    pub status: SyncStatus,
}

/// POST /sync
///
/// 202 with the new task id, or 409 while another sync is active.
pub async fn start_sync(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<StartSyncResponse>)> {
    let snapshot = playlists::list_playlists(&state.db).await?;
    let total = snapshot.len() as i64;

    let task_id = state.coordinator.create_task(total).await?;
    state.worker.clone().spawn(task_id, snapshot);

    Ok((StatusCode::ACCEPTED, Json(StartSyncResponse { task_id, total })))
}

/// GET /sync/status
pub async fn sync_status(State(state): State<AppState>) -> ApiResult<Json<SyncStatusResponse>> {
    let task = state.coordinator.get_active_task().await?;
    Ok(Json(task.into()))
}

/// POST /sync/abort/:task_id
pub async fn abort_sync(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<AbortResponse>> {
    let task = state.coordinator.abort_task(task_id).await?;
    Ok(Json(AbortResponse {
        task_id: task.id,
        status: task.status,
    }))
}

/// GET /sync/history
pub async fn sync_history(State(state): State<AppState>) -> ApiResult<Json<Vec<SyncTask>>> {
    Ok(Json(state.coordinator.list_tasks().await?))
}

pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(start_sync))
        .route("/sync/status", get(sync_status))
        .route("/sync/abort/:task_id", post(abort_sync))
        .route("/sync/events", get(super::sse::sync_event_stream))
        .route("/sync/history", get(sync_history))
}
