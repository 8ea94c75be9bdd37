//! ytrank-web - playlist ranking service
//!
//! Analyzes YouTube playlists, serves the stored rankings over HTTP, and
//! mirrors stored playlists to a remote endpoint with live SSE progress.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use ytrank_common::config::CliOverrides;

use ytrank_web::{db, logging};
use ytrank_web::services::{
    HttpSyncTarget, PlaylistAnalyzer, SyncTarget, VideoSource, YouTubeClient,
};
use ytrank_web::sync::{SyncCoordinator, SyncWorker};
use ytrank_web::AppState;

/// Command-line arguments for ytrank-web
#[derive(Parser, Debug)]
#[command(name = "ytrank-web")]
#[command(about = "YouTube playlist ranking and sync service")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/ytrank/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Remote endpoint that receives synced playlists
    #[arg(long)]
    remote_server_url: Option<String>,

    /// YouTube Data API key
    #[arg(long)]
    youtube_api_key: Option<String>,

    /// Log filter directive, e.g. "info" or "ytrank_web=debug"
    #[arg(long)]
    log_level: Option<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            config_path: args.config,
            bind_address: args.bind,
            database_path: args.database,
            remote_server_url: args.remote_server_url,
            youtube_api_key: args.youtube_api_key,
            log_level: args.log_level,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = logging::resolve_config(&args.into()).context("Failed to load configuration")?;
    logging::init_logging(&config);

    info!(
        "Starting ytrank-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        ytrank_web::GIT_HASH,
        ytrank_web::BUILD_TIMESTAMP,
        ytrank_web::BUILD_PROFILE
    );
    info!("Database: {}", config.database_path.display());

    let db_pool = db::init_database_pool(&config.database_path)
        .await
        .context("Failed to open database")?;

    let cleaned = db::sync_tasks::abort_stale_tasks(
        &db_pool,
        db::sync_tasks::INTERRUPTED_MESSAGE,
        chrono::Utc::now(),
    )
    .await
    .context("Failed to clean up interrupted sync tasks")?;
    if cleaned > 0 {
        warn!(tasks = cleaned, "Marked interrupted sync tasks as aborted");
    }

    let source: Option<Arc<dyn VideoSource>> = match &config.youtube_api_key {
        Some(key) => Some(Arc::new(YouTubeClient::new(key.clone(), config.request_timeout)?)),
        None => {
            warn!("YOUTUBE_API_KEY not set; only cached playlists can be served");
            None
        }
    };

    let target: Option<Arc<dyn SyncTarget>> = match &config.remote_server_url {
        Some(url) => {
            info!("Sync target: {}", url);
            Some(Arc::new(HttpSyncTarget::new(url.clone(), config.request_timeout)?))
        }
        None => {
            warn!("REMOTE_SERVER_URL not set; sync tasks will fail");
            None
        }
    };

    let coordinator = SyncCoordinator::new(db_pool.clone(), config.observer_capacity)
        .context("Failed to start sync event hub")?;
    let analyzer = PlaylistAnalyzer::new(db_pool.clone(), source, config.cache_ttl);
    let worker = SyncWorker::new(coordinator.clone(), target, config.sync_pacing);

    let state = AppState::new(db_pool, coordinator, analyzer, worker, config.heartbeat_interval);
    let app = ytrank_web::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
