//! Persistence store for ytrank-web
//!
//! SQLite through sqlx: playlists, their videos, and sync-task history.

pub mod playlists;
pub mod sync_tasks;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use ytrank_common::Result;

/// Per-connection wait for a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);
const MAX_CONNECTIONS: u32 = 8;

/// Initialize database connection pool and create tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::debug!(path = %db_path.display(), "Connecting to database");

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables and indexes if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            channel_name TEXT NOT NULL,
            video_count INTEGER NOT NULL DEFAULT 0,
            url TEXT NOT NULL,
            last_updated TEXT NOT NULL,
            last_analyzed TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id TEXT NOT NULL,
            playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            duration REAL NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0,
            like_percentage REAL NOT NULL DEFAULT 0,
            url TEXT NOT NULL,
            is_top INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (playlist_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            total_playlists INTEGER NOT NULL DEFAULT 0,
            processed_playlists INTEGER NOT NULL DEFAULT 0,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_videos_playlist_position ON videos(playlist_id, position)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sync_tasks_status ON sync_tasks(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (playlists, videos, sync_tasks)");

    Ok(())
}
