//! Playlist analysis: cache-or-fetch, rank, persist

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use ytrank_common::models::{Playlist, PlaylistAnalysis, Video};
use ytrank_common::ranking::{rank_videos, VideoStats};
use ytrank_common::youtube::{extract_playlist_id, playlist_url, video_url};
use ytrank_common::{Error, Result};

use super::video_source::{fetch_playlist_video_ids, fetch_video_details, VideoSource};
use crate::db::playlists;

pub struct PlaylistAnalyzer {
    db: SqlitePool,
    source: Option<Arc<dyn VideoSource>>,
    cache_ttl: chrono::Duration,
}

impl PlaylistAnalyzer {
    pub fn new(db: SqlitePool, source: Option<Arc<dyn VideoSource>>, cache_ttl: Duration) -> Self {
        let cache_ttl = chrono::Duration::from_std(cache_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self { db, source, cache_ttl }
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Analysis of a playlist URL or id
    ///
    /// Serves the stored analysis while it is fresh (bumping `last_analyzed`),
    /// otherwise fetches from the video source, ranks, and replaces the stored
    /// playlist. Nothing is written when the playlist has no videos.
    pub async fn get_or_analyze(
        &self,
        input: &str,
        force_refresh: bool,
    ) -> Result<PlaylistAnalysis> {
        let playlist_id = extract_playlist_id(input)?;

        if !force_refresh {
            if let Some(cached) = self.cached(&playlist_id).await? {
                return Ok(cached);
            }
        }

        self.analyze(&playlist_id).await
    }

    async fn cached(&self, playlist_id: &str) -> Result<Option<PlaylistAnalysis>> {
        let now = Utc::now();
        let Some(mut playlist) = playlists::get_playlist(&self.db, playlist_id).await? else {
            return Ok(None);
        };
        if !playlist.is_fresh(now, self.cache_ttl) {
            tracing::debug!(playlist_id, "Cached analysis expired");
            return Ok(None);
        }

        playlists::touch_last_analyzed(&self.db, playlist_id, now).await?;
        playlist.last_analyzed = now;
        let videos = playlists::get_videos(&self.db, playlist_id).await?;

        tracing::debug!(playlist_id, videos = videos.len(), "Serving cached analysis");
        Ok(Some(PlaylistAnalysis::new(playlist, videos, true)))
    }

    async fn analyze(&self, playlist_id: &str) -> Result<PlaylistAnalysis> {
        let source = self
            .source
            .as_deref()
            .ok_or_else(|| Error::Config("YouTube API key not configured".to_string()))?;

        let info = source.playlist_info(playlist_id).await?;
        let video_ids = fetch_playlist_video_ids(source, playlist_id).await?;
        let details = fetch_video_details(source, &video_ids).await?;

        let stats: Vec<VideoStats> = details.iter().map(VideoStats::from).collect();
        let report = rank_videos(&stats, info.video_count)?;

        let now = Utc::now();
        let playlist = Playlist {
            id: playlist_id.to_string(),
            title: info.title,
            channel_name: info.channel_name,
            video_count: info.video_count,
            url: playlist_url(playlist_id),
            last_updated: now,
            last_analyzed: now,
        };

        let videos: Vec<Video> = details
            .into_iter()
            .enumerate()
            .map(|(position, detail)| Video {
                like_percentage: detail.like_percentage(),
                url: video_url(&detail.id),
                is_top: report.is_top(position),
                playlist_id: playlist_id.to_string(),
                position: position as i64,
                duration: detail.duration_minutes,
                views: detail.views,
                likes: detail.likes,
                title: detail.title,
                id: detail.id,
            })
            .collect();

        playlists::replace_playlist(&self.db, &playlist, &videos).await?;

        tracing::info!(
            playlist_id,
            videos = videos.len(),
            top = report.top_indices().len(),
            top_count = report.top_count,
            "Playlist analyzed"
        );

        Ok(PlaylistAnalysis::new(playlist, videos, false))
    }
}
