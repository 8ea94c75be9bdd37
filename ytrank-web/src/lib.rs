//! ytrank-web library interface
//!
//! Exposes the application state and router so integration tests can drive
//! the service without binding a socket.

pub mod api;
pub mod db;
pub mod error;
pub mod logging;
pub mod services;
pub mod sync;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::services::PlaylistAnalyzer;
use crate::sync::{SyncCoordinator, SyncWorker};

/// Build identification captured by build.rs
pub const GIT_HASH: &str = env!("YTRANK_GIT_HASH");
pub const BUILD_TIMESTAMP: &str = env!("YTRANK_BUILD_TIMESTAMP");
pub const BUILD_PROFILE: &str = env!("YTRANK_BUILD_PROFILE");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Single-task sync coordinator and observer hub
    pub coordinator: SyncCoordinator,
    /// Cache-or-fetch playlist analysis
    pub analyzer: Arc<PlaylistAnalyzer>,
    /// Template for background sync tasks
    pub worker: SyncWorker,
    /// Silence window after which SSE observers get a heartbeat
    pub heartbeat_interval: Duration,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        coordinator: SyncCoordinator,
        analyzer: PlaylistAnalyzer,
        worker: SyncWorker,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            db,
            coordinator,
            analyzer: Arc::new(analyzer),
            worker,
            heartbeat_interval,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::playlist_routes())
        .merge(api::sync_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
