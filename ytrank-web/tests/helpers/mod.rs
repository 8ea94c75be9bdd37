//! Test Helper Utilities
//!
//! Shared fixtures for ytrank-web integration tests: temporary databases,
//! an in-memory video source, and recording sync targets.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use ytrank_common::models::{Playlist, PlaylistInfo, PlaylistWithVideos, Video, VideoDetails};
use ytrank_common::{Error, Result, SyncEvent};
use ytrank_web::db;
use ytrank_web::services::{PlaylistAnalyzer, PlaylistItemsPage, SyncTarget, VideoSource};
use ytrank_web::sync::{Subscription, SyncCoordinator, SyncWorker};
use ytrank_web::AppState;

/// Create a temporary database with tables initialized
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for the test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&temp_dir.path().join("test_ytrank.db"))
        .await
        .unwrap();
    (temp_dir, pool)
}

pub fn details(id: &str, views: i64, likes: i64) -> VideoDetails {
    VideoDetails {
        id: id.to_string(),
        title: format!("Video {}", id),
        duration_minutes: 3.0,
        views,
        likes,
    }
}

/// The three-video ranking scenario: only v1 qualifies as top
pub fn scenario_videos() -> Vec<VideoDetails> {
    vec![details("v1", 100, 10), details("v2", 50, 1), details("v3", 10, 5)]
}

/// In-memory `VideoSource` serving one playlist, paged by `page_size`
pub struct FakeVideoSource {
    info: Mutex<PlaylistInfo>,
    item_ids: Mutex<Vec<String>>,
    details: Mutex<HashMap<String, VideoDetails>>,
    page_size: usize,
    calls: AtomicUsize,
}

impl FakeVideoSource {
    pub fn new(playlist_id: &str, videos: Vec<VideoDetails>) -> Self {
        let source = Self {
            info: Mutex::new(PlaylistInfo {
                id: playlist_id.to_string(),
                title: format!("Playlist {}", playlist_id),
                channel_name: "Test Channel".to_string(),
                video_count: 0,
            }),
            item_ids: Mutex::new(Vec::new()),
            details: Mutex::new(HashMap::new()),
            page_size: 50,
            calls: AtomicUsize::new(0),
        };
        source.set_videos(videos);
        source
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Replace the playlist contents; the declared count follows the item list
    pub fn set_videos(&self, videos: Vec<VideoDetails>) {
        let ids: Vec<String> = videos.iter().map(|v| v.id.clone()).collect();
        self.set_items(ids, videos);
    }

    /// Replace item ids and details separately (to model repeated items)
    pub fn set_items(&self, item_ids: Vec<String>, videos: Vec<VideoDetails>) {
        self.info.lock().unwrap().video_count = item_ids.len() as i64;
        *self.item_ids.lock().unwrap() = item_ids;
        *self.details.lock().unwrap() = videos.into_iter().map(|v| (v.id.clone(), v)).collect();
    }

    /// Number of source requests served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoSource for FakeVideoSource {
    async fn playlist_info(&self, playlist_id: &str) -> Result<PlaylistInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let info = self.info.lock().unwrap().clone();
        if info.id != playlist_id {
            return Err(Error::NotFound(format!("Playlist with ID {} not found", playlist_id)));
        }
        Ok(info)
    }

    async fn playlist_items_page(
        &self,
        _playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let ids = self.item_ids.lock().unwrap().clone();
        let start = page * self.page_size;
        let end = (start + self.page_size).min(ids.len());
        let video_ids = ids.get(start..end).map(|s| s.to_vec()).unwrap_or_default();
        let next_page_token = (end < ids.len()).then(|| (page + 1).to_string());
        Ok(PlaylistItemsPage {
            video_ids,
            next_page_token,
        })
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetails>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(video_ids.len() <= 50, "details requested for more than 50 ids");
        let details = self.details.lock().unwrap();
        Ok(video_ids.iter().filter_map(|id| details.get(id).cloned()).collect())
    }
}

/// `SyncTarget` that records every push
///
/// `fail_on` makes the n-th call (0-based) fail; `gate` makes every call wait
/// for a semaphore permit first.
#[derive(Default)]
pub struct RecordingTarget {
    sent: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail_on: Option<usize>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    /// Target that blocks each push until a permit is added to the returned gate
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            },
            gate,
        )
    }

    /// Make the zero-based `call` fail, keeping any gate
    pub fn and_failing_on(self, call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..self
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTarget for RecordingTarget {
    async fn send_playlist(&self, playlist: &PlaylistWithVideos) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail_on == Some(call) {
            return Err(Error::Network("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(playlist.playlist.id.clone());
        Ok(())
    }
}

/// `SyncTarget` whose push panics
pub struct PanickingTarget;

#[async_trait]
impl SyncTarget for PanickingTarget {
    async fn send_playlist(&self, _playlist: &PlaylistWithVideos) -> Result<()> {
        panic!("remote client blew up");
    }
}

pub fn sample_playlist(id: &str, last_updated: DateTime<Utc>) -> Playlist {
    Playlist {
        id: id.to_string(),
        title: format!("Playlist {}", id),
        channel_name: "Test Channel".to_string(),
        video_count: 2,
        url: ytrank_common::youtube::playlist_url(id),
        last_updated,
        last_analyzed: last_updated,
    }
}

pub fn sample_video(playlist_id: &str, id: &str, position: i64, is_top: bool) -> Video {
    Video {
        id: id.to_string(),
        playlist_id: playlist_id.to_string(),
        title: format!("Video {}", id),
        duration: 4.25,
        views: 1000 - position * 100,
        likes: 50,
        like_percentage: 50.0 / (1000 - position * 100) as f64 * 100.0,
        url: ytrank_common::youtube::video_url(id),
        is_top,
        position,
    }
}

/// Store `count` playlists named `PL1..PLn`, each with two videos
pub async fn seed_playlists(pool: &SqlitePool, count: usize) -> Vec<PlaylistWithVideos> {
    let mut seeded = Vec::new();
    for i in 1..=count {
        let id = format!("PL{}", i);
        let playlist = sample_playlist(&id, Utc::now() - chrono::Duration::minutes(i as i64));
        let videos = vec![
            sample_video(&id, &format!("{}-a", id), 0, true),
            sample_video(&id, &format!("{}-b", id), 1, false),
        ];
        db::playlists::replace_playlist(pool, &playlist, &videos)
            .await
            .unwrap();
        seeded.push(PlaylistWithVideos { playlist, videos });
    }
    seeded
}

pub fn test_coordinator(pool: &SqlitePool) -> SyncCoordinator {
    SyncCoordinator::new(pool.clone(), 64).unwrap()
}

pub fn test_worker(coordinator: &SyncCoordinator, target: Option<Arc<dyn SyncTarget>>) -> SyncWorker {
    SyncWorker::new(coordinator.clone(), target, Duration::ZERO)
}

/// Application state wired with test collaborators
pub fn test_app_state(
    pool: &SqlitePool,
    source: Option<Arc<dyn VideoSource>>,
    target: Option<Arc<dyn SyncTarget>>,
    heartbeat: Duration,
) -> AppState {
    let coordinator = test_coordinator(pool);
    let analyzer = PlaylistAnalyzer::new(pool.clone(), source, Duration::from_secs(24 * 3600));
    let worker = test_worker(&coordinator, target);
    AppState::new(pool.clone(), coordinator, analyzer, worker, heartbeat)
}

/// Receive events until a terminal one arrives (bounded wait)
pub async fn collect_until_terminal(subscription: &mut Subscription) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
            .await
            .expect("timed out waiting for sync event")
            .expect("observer dropped");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// Wait until the coordinator has released its current task
pub async fn wait_until_idle(coordinator: &SyncCoordinator) {
    for _ in 0..500 {
        if coordinator.current_task_id().await.is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("sync task never finished");
}
