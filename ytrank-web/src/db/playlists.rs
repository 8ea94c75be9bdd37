//! Playlist and video persistence

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use ytrank_common::models::{Playlist, PlaylistWithVideos, Video};
use ytrank_common::{Error, Result};

/// Load playlist by id
pub async fn get_playlist(pool: &SqlitePool, playlist_id: &str) -> Result<Option<Playlist>> {
    let playlist = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, title, channel_name, video_count, url, last_updated, last_analyzed
        FROM playlists
        WHERE id = ?
        "#,
    )
    .bind(playlist_id)
    .fetch_optional(pool)
    .await?;

    Ok(playlist)
}

/// Load the videos of a playlist in playlist order
pub async fn get_videos(pool: &SqlitePool, playlist_id: &str) -> Result<Vec<Video>> {
    let videos = sqlx::query_as::<_, Video>(
        r#"
        SELECT id, playlist_id, title, duration, views, likes, like_percentage, url, is_top, position
        FROM videos
        WHERE playlist_id = ?
        ORDER BY position ASC
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(videos)
}

/// All playlists with their videos, most recently updated first
pub async fn list_playlists(pool: &SqlitePool) -> Result<Vec<PlaylistWithVideos>> {
    let playlists = sqlx::query_as::<_, Playlist>(
        r#"
        SELECT id, title, channel_name, video_count, url, last_updated, last_analyzed
        FROM playlists
        ORDER BY last_updated DESC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut result = Vec::with_capacity(playlists.len());
    for playlist in playlists {
        let videos = get_videos(pool, &playlist.id).await?;
        result.push(PlaylistWithVideos { playlist, videos });
    }
    Ok(result)
}

/// Record that a cached playlist was served
pub async fn touch_last_analyzed(
    pool: &SqlitePool,
    playlist_id: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query("UPDATE playlists SET last_analyzed = ? WHERE id = ?")
        .bind(at)
        .bind(playlist_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Playlist {} not found", playlist_id)));
    }
    Ok(())
}

/// Insert or update a playlist and replace all of its videos
///
/// Runs in one transaction: readers see either the old or the new video set.
pub async fn replace_playlist(
    pool: &SqlitePool,
    playlist: &Playlist,
    videos: &[Video],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO playlists (id, title, channel_name, video_count, url, last_updated, last_analyzed)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            channel_name = excluded.channel_name,
            video_count = excluded.video_count,
            url = excluded.url,
            last_updated = excluded.last_updated,
            last_analyzed = excluded.last_analyzed
        "#,
    )
    .bind(&playlist.id)
    .bind(&playlist.title)
    .bind(&playlist.channel_name)
    .bind(playlist.video_count)
    .bind(&playlist.url)
    .bind(playlist.last_updated)
    .bind(playlist.last_analyzed)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM videos WHERE playlist_id = ?")
        .bind(&playlist.id)
        .execute(&mut *tx)
        .await?;

    for video in videos {
        sqlx::query(
            r#"
            INSERT INTO videos (id, playlist_id, title, duration, views, likes, like_percentage, url, is_top, position)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.id)
        .bind(&playlist.id)
        .bind(&video.title)
        .bind(video.duration)
        .bind(video.views)
        .bind(video.likes)
        .bind(video.like_percentage)
        .bind(&video.url)
        .bind(video.is_top)
        .bind(video.position)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        playlist_id = %playlist.id,
        videos = videos.len(),
        "Stored playlist analysis"
    );
    Ok(())
}

/// Delete a playlist and its videos
pub async fn delete_playlist(pool: &SqlitePool, playlist_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM videos WHERE playlist_id = ?")
        .bind(playlist_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(playlist_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(Error::NotFound(format!("Playlist {} not found", playlist_id)));
    }

    tx.commit().await?;
    Ok(())
}
