//! Playlist analysis and listing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use ytrank_common::models::{PlaylistAnalysis, PlaylistWithVideos};

use crate::db::playlists;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Playlist URL or bare playlist id
    pub playlist: String,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub force_refresh: bool,
}

/// POST /analyze
pub async fn analyze_playlist(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<PlaylistAnalysis>> {
    tracing::debug!(playlist = %request.playlist, force_refresh = request.force_refresh, "Analyze request");
    let analysis = state
        .analyzer
        .get_or_analyze(&request.playlist, request.force_refresh)
        .await?;
    Ok(Json(analysis))
}

/// GET /playlists
pub async fn list_playlists(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PlaylistWithVideos>>> {
    Ok(Json(playlists::list_playlists(&state.db).await?))
}

/// GET /playlists/:id
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<Json<PlaylistAnalysis>> {
    let analysis = state
        .analyzer
        .get_or_analyze(&playlist_id, query.force_refresh)
        .await?;
    Ok(Json(analysis))
}

/// DELETE /playlists/:id
pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<StatusCode> {
    playlists::delete_playlist(&state.db, &playlist_id).await?;
    tracing::info!(playlist_id = %playlist_id, "Playlist deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze_playlist))
        .route("/playlists", get(list_playlists))
        .route("/playlists/:id", get(get_playlist).delete(delete_playlist))
}
