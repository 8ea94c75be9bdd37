//! Video metadata source
//!
//! `VideoSource` is the seam the analysis service fetches through;
//! `YouTubeClient` implements it against the YouTube Data API v3 with an API key.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use ytrank_common::duration::parse_iso8601_minutes;
use ytrank_common::models::{PlaylistInfo, VideoDetails};
use ytrank_common::{Error, Result};

pub const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum ids or items per API request
pub const PAGE_SIZE: usize = 50;

const USER_AGENT: &str = concat!("ytrank/", env!("CARGO_PKG_VERSION"));

/// One page of playlist item ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistItemsPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Playlist metadata; `NotFound` for unknown playlists
    async fn playlist_info(&self, playlist_id: &str) -> Result<PlaylistInfo>;

    /// One page of video ids, starting at `page_token`
    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage>;

    /// Details for at most `PAGE_SIZE` videos
    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetails>>;
}

/// Every video id of a playlist in playlist order, following page tokens
///
/// Ids repeated in the playlist are kept once, at their first position.
pub async fn fetch_playlist_video_ids(
    source: &dyn VideoSource,
    playlist_id: &str,
) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = source
            .playlist_items_page(playlist_id, page_token.as_deref())
            .await?;
        for id in page.video_ids {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(ids)
}

/// Details for any number of videos, requested in chunks of `PAGE_SIZE`
pub async fn fetch_video_details(
    source: &dyn VideoSource,
    video_ids: &[String],
) -> Result<Vec<VideoDetails>> {
    let mut details = Vec::with_capacity(video_ids.len());
    for chunk in video_ids.chunks(PAGE_SIZE) {
        details.extend(source.video_details(chunk).await?);
    }
    Ok(details)
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    snippet: PlaylistSnippet,
    content_details: PlaylistContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    title: String,
    #[serde(default)]
    channel_title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    #[serde(default)]
    item_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    snippet: VideoSnippet,
    content_details: VideoContentDetails,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: String,
}

/// Counts arrive as decimal strings; absent counts are 0
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

fn parse_count(value: &Option<String>) -> i64 {
    value
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

impl TryFrom<VideoResource> for VideoDetails {
    type Error = Error;

    fn try_from(resource: VideoResource) -> Result<Self> {
        Ok(VideoDetails {
            duration_minutes: parse_iso8601_minutes(&resource.content_details.duration)?,
            views: parse_count(&resource.statistics.view_count),
            likes: parse_count(&resource.statistics.like_count),
            id: resource.id,
            title: resource.snippet.title,
        })
    }
}

/// YouTube Data API v3 client
pub struct YouTubeClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, YOUTUBE_API_BASE_URL, timeout)
    }

    /// Client against a different API root
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn get<T>(&self, resource: &str, params: &[(&str, &str)]) -> Result<ListResponse<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, resource);
        tracing::debug!(resource, "Querying YouTube Data API");

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::Network(format!("YouTube request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Network(format!(
                "YouTube API returned {} for {}: {}",
                status, resource, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| {
                Error::Network(format!("Invalid YouTube response for {}: {}", resource, e))
            })
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn playlist_info(&self, playlist_id: &str) -> Result<PlaylistInfo> {
        let response: ListResponse<PlaylistResource> = self
            .get(
                "playlists",
                &[("part", "snippet,contentDetails"), ("id", playlist_id)],
            )
            .await?;

        let playlist = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("Playlist with ID {} not found", playlist_id)))?;

        Ok(PlaylistInfo {
            id: playlist_id.to_string(),
            title: playlist.snippet.title,
            channel_name: playlist.snippet.channel_title,
            video_count: playlist.content_details.item_count,
        })
    }

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        let max_results = PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "contentDetails"),
            ("maxResults", max_results.as_str()),
            ("playlistId", playlist_id),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response: ListResponse<PlaylistItemResource> =
            self.get("playlistItems", &params).await?;

        Ok(PlaylistItemsPage {
            video_ids: response
                .items
                .into_iter()
                .map(|item| item.content_details.video_id)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetails>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = video_ids.join(",");
        let response: ListResponse<VideoResource> = self
            .get(
                "videos",
                &[("part", "snippet,contentDetails,statistics"), ("id", ids.as_str())],
            )
            .await?;

        response.items.into_iter().map(VideoDetails::try_from).collect()
    }
}
