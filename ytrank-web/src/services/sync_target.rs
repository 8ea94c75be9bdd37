//! Remote sync endpoint client

use async_trait::async_trait;
use std::time::Duration;
use ytrank_common::models::PlaylistWithVideos;
use ytrank_common::{Error, Result};

const USER_AGENT: &str = concat!("ytrank/", env!("CARGO_PKG_VERSION"));

/// Destination that receives one playlist record per call
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Push one playlist with its videos
    ///
    /// Any failure is reported as `Error::Network`.
    async fn send_playlist(&self, playlist: &PlaylistWithVideos) -> Result<()>;
}

/// `SyncTarget` that POSTs each playlist as JSON to a fixed URL
pub struct HttpSyncTarget {
    http_client: reqwest::Client,
    url: String,
}

impl HttpSyncTarget {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SyncTarget for HttpSyncTarget {
    async fn send_playlist(&self, playlist: &PlaylistWithVideos) -> Result<()> {
        tracing::debug!(
            playlist_id = %playlist.playlist.id,
            videos = playlist.videos.len(),
            "Sending playlist to remote"
        );

        let response = self
            .http_client
            .post(&self.url)
            .json(playlist)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(())
    }
}
