//! Sync worker
//!
//! Pushes a snapshot of playlists to the remote target one by one.
//!
//! `started → inprogress → {completed | failed | aborted}`
//!
//! Cancellation is checked before each playlist and once more before the task
//! is marked completed; a request already in flight is allowed to finish.
//!
//! The stored task is authoritative: when a write finds the task already
//! terminal (aborted from outside), the worker stops and announces the stored
//! outcome instead of its own.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use ytrank_common::models::{PlaylistWithVideos, SyncStatus, SyncTask, TaskUpdate};
use ytrank_common::{Result, SyncEvent};

use super::coordinator::SyncCoordinator;
use crate::services::SyncTarget;

pub const NOT_CONFIGURED_MESSAGE: &str = "REMOTE_SERVER_URL not configured";

/// How a sync task ended
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed { processed: i64 },
    Failed { processed: i64, error: String },
    Aborted { processed: i64 },
}

impl SyncOutcome {
    pub fn status(&self) -> SyncStatus {
        match self {
            SyncOutcome::Completed { .. } => SyncStatus::Completed,
            SyncOutcome::Failed { .. } => SyncStatus::Failed,
            SyncOutcome::Aborted { .. } => SyncStatus::Aborted,
        }
    }

    /// Outcome recorded on a stored task, if it has reached a terminal status
    pub fn from_task(task: &SyncTask) -> Option<Self> {
        let processed = task.processed_playlists;
        match task.status {
            SyncStatus::Completed => Some(SyncOutcome::Completed { processed }),
            SyncStatus::Failed => Some(SyncOutcome::Failed {
                processed,
                error: task.error_message.clone().unwrap_or_default(),
            }),
            SyncStatus::Aborted => Some(SyncOutcome::Aborted { processed }),
            SyncStatus::Started | SyncStatus::InProgress => None,
        }
    }

    pub fn processed(&self) -> i64 {
        match self {
            SyncOutcome::Completed { processed }
            | SyncOutcome::Failed { processed, .. }
            | SyncOutcome::Aborted { processed } => *processed,
        }
    }
}

#[derive(Clone)]
pub struct SyncWorker {
    coordinator: SyncCoordinator,
    target: Option<Arc<dyn SyncTarget>>,
    pacing: Duration,
}

impl SyncWorker {
    pub fn new(
        coordinator: SyncCoordinator,
        target: Option<Arc<dyn SyncTarget>>,
        pacing: Duration,
    ) -> Self {
        Self {
            coordinator,
            target,
            pacing,
        }
    }

    /// Run a task in the background
    ///
    /// A panic inside the task still marks it failed and releases it.
    pub fn spawn(self, task_id: i64, playlists: Vec<PlaylistWithVideos>) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move {
            let handle = tokio::spawn(async move { self.run(task_id, playlists).await });

            match handle.await {
                Ok(outcome) => {
                    info!(task_id, status = %outcome.status(), processed = outcome.processed(), "Sync task finished");
                }
                Err(join_error) => {
                    error!(task_id, error = %join_error, "Sync task crashed");
                    let processed = match reporter.coordinator.get_task(task_id).await {
                        Ok(Some(task)) => task.processed_playlists,
                        _ => 0,
                    };
                    let message = format!("Sync worker crashed: {}", join_error);
                    reporter.fail(task_id, processed, message).await;
                    reporter.coordinator.finish_task(task_id).await;
                }
            }
        })
    }

    /// Execute a task to its end and release it
    pub async fn run(&self, task_id: i64, playlists: Vec<PlaylistWithVideos>) -> SyncOutcome {
        info!(task_id, total = playlists.len(), "Sync task started");

        let mut processed = 0;
        let outcome = match self.execute(task_id, &playlists, &mut processed).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(task_id, processed, e.to_string()).await,
        };

        self.coordinator.finish_task(task_id).await;
        outcome
    }

    async fn execute(
        &self,
        task_id: i64,
        playlists: &[PlaylistWithVideos],
        processed: &mut i64,
    ) -> Result<SyncOutcome> {
        let Some(target) = self.target.as_ref() else {
            return Ok(self.fail(task_id, 0, NOT_CONFIGURED_MESSAGE.to_string()).await);
        };

        let total = playlists.len() as i64;
        let cancel = self.coordinator.cancellation_token(task_id).await;

        let stored = self
            .coordinator
            .update_task(task_id, TaskUpdate::status(SyncStatus::InProgress))
            .await?;
        if let Some(outcome) = SyncOutcome::from_task(&stored) {
            debug!(task_id, status = %stored.status, "Sync task ended before it started");
            self.announce(task_id, total, &outcome);
            return Ok(outcome);
        }
        self.coordinator.broadcast(SyncEvent::InProgress {
            task_id,
            total,
            processed: 0,
        });

        for (index, item) in playlists.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.abort(task_id, total, *processed).await;
            }

            let title = &item.playlist.title;
            if let Err(e) = target.send_playlist(item).await {
                let message = format!(
                    "Network error while sending playlist '{}': {}",
                    title,
                    e.detail()
                );
                warn!(task_id, playlist_id = %item.playlist.id, error = %e, "Sync push failed");
                return Ok(self.fail(task_id, *processed, message).await);
            }

            *processed += 1;
            let stored = self
                .coordinator
                .update_task(task_id, TaskUpdate::processed(*processed))
                .await?;
            self.coordinator.broadcast(SyncEvent::Progress {
                task_id,
                total,
                processed: *processed,
                current_playlist: title.clone(),
            });
            info!(task_id, playlist_id = %item.playlist.id, processed = *processed, total, "Playlist synced");

            if let Some(outcome) = SyncOutcome::from_task(&stored) {
                self.announce(task_id, total, &outcome);
                return Ok(outcome);
            }

            if index + 1 < playlists.len() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        if cancel.is_cancelled() {
            return self.abort(task_id, total, *processed).await;
        }

        let stored = self
            .coordinator
            .update_task(task_id, TaskUpdate::status(SyncStatus::Completed))
            .await?;
        let outcome = SyncOutcome::from_task(&stored).unwrap_or(SyncOutcome::Completed {
            processed: *processed,
        });
        self.announce(task_id, total, &outcome);
        Ok(outcome)
    }

    async fn abort(&self, task_id: i64, total: i64, processed: i64) -> Result<SyncOutcome> {
        info!(task_id, processed, "Sync task aborted");
        let stored = self
            .coordinator
            .update_task(task_id, TaskUpdate::status(SyncStatus::Aborted))
            .await?;
        let outcome = SyncOutcome::from_task(&stored).unwrap_or(SyncOutcome::Aborted { processed });
        self.announce(task_id, total, &outcome);
        Ok(outcome)
    }

    /// Mark the task failed and tell observers; never fails itself
    ///
    /// A task that is already terminal keeps its stored outcome.
    async fn fail(&self, task_id: i64, processed: i64, message: String) -> SyncOutcome {
        let failed = SyncOutcome::Failed {
            processed,
            error: message.clone(),
        };
        let (total, outcome) = match self
            .coordinator
            .update_task(task_id, TaskUpdate::failed(message))
            .await
        {
            Ok(stored) => (
                stored.total_playlists,
                SyncOutcome::from_task(&stored).unwrap_or(failed),
            ),
            Err(e) => {
                error!(task_id, error = %e, "Failed to record sync failure");
                (0, failed)
            }
        };

        match &outcome {
            SyncOutcome::Failed { error: message, .. } => {
                error!(task_id, processed = outcome.processed(), error = %message, "Sync task failed");
            }
            other => {
                info!(task_id, status = %other.status(), "Sync failure ignored, task already ended");
            }
        }
        self.announce(task_id, total, &outcome);
        outcome
    }

    fn announce(&self, task_id: i64, total: i64, outcome: &SyncOutcome) {
        let event = match outcome {
            SyncOutcome::Completed { processed } => SyncEvent::Completed {
                task_id,
                total,
                processed: *processed,
            },
            SyncOutcome::Failed { processed, error } => SyncEvent::Failed {
                task_id,
                error: error.clone(),
                processed: *processed,
            },
            SyncOutcome::Aborted { processed } => SyncEvent::Aborted {
                task_id,
                processed: *processed,
            },
        };
        self.coordinator.broadcast(event);
    }
}
