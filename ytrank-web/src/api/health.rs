//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub uptime_seconds: u64,
    /// Whether a video source is configured for fresh analyses
    pub video_source: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "ytrank-web".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: crate::GIT_HASH.to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        video_source: state.analyzer.has_source(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
