//! Domain models shared between the store, the sync worker and the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Analyzed playlist as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub channel_name: String,
    /// Item count declared by the video source (may differ from stored videos)
    pub video_count: i64,
    pub url: String,
    /// When the data was last fetched from the source
    pub last_updated: DateTime<Utc>,
    /// When the playlist was last read (cache hit or fetch)
    pub last_analyzed: DateTime<Utc>,
}

impl Playlist {
    /// Whether the cached analysis is still usable at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.last_updated < ttl
    }
}

/// Video belonging to a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub id: String,
    pub playlist_id: String,
    pub title: String,
    /// Duration in minutes
    pub duration: f64,
    pub views: i64,
    pub likes: i64,
    pub like_percentage: f64,
    pub url: String,
    pub is_top: bool,
    pub position: i64,
}

/// Playlist together with its videos in playlist order
///
/// This is the record pushed to the remote sync endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistWithVideos {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub videos: Vec<Video>,
}

/// Playlist metadata as reported by the video source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub title: String,
    pub channel_name: String,
    pub video_count: i64,
}

/// Per-video statistics as reported by the video source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub duration_minutes: f64,
    pub views: i64,
    pub likes: i64,
}

impl VideoDetails {
    /// likes / views × 100, or 0 when there are no views
    pub fn like_percentage(&self) -> f64 {
        if self.views > 0 {
            self.likes as f64 / self.views as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Result of the analyze-or-get path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistAnalysis {
    pub playlist_info: Playlist,
    pub top_videos: Vec<Video>,
    pub all_videos: Vec<Video>,
    pub from_cache: bool,
}

impl PlaylistAnalysis {
    pub fn new(playlist: Playlist, videos: Vec<Video>, from_cache: bool) -> Self {
        let top_videos = videos.iter().filter(|v| v.is_top).cloned().collect();
        Self {
            playlist_info: playlist,
            top_videos,
            all_videos: videos,
            from_cache,
        }
    }
}

/// Sync task lifecycle
///
/// `started → inprogress → {completed | failed | aborted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SyncStatus {
    Started,
    InProgress,
    Completed,
    Failed,
    Aborted,
}

impl SyncStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Aborted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Started => "started",
            SyncStatus::InProgress => "inprogress",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted sync task (audit history, never deleted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncTask {
    pub id: i64,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_playlists: i64,
    pub processed_playlists: i64,
    pub error_message: Option<String>,
}

/// Partial update merged into a stored sync task; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<SyncStatus>,
    pub processed_playlists: Option<i64>,
    pub error_message: Option<String>,
}

impl TaskUpdate {
    pub fn status(status: SyncStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn processed(processed: i64) -> Self {
        Self {
            processed_playlists: Some(processed),
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(SyncStatus::Failed),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// True when this update moves the task into a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.map(SyncStatus::is_terminal).unwrap_or(false)
    }
}
