//! YouTube identifier helpers

use crate::{Error, Result};
use url::Url;

pub const PLAYLIST_URL_BASE: &str = "https://www.youtube.com/playlist?list=";
pub const VIDEO_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Resolve a playlist URL or bare playlist ID to the playlist ID
///
/// Inputs starting with `http` must carry a `list=` query parameter;
/// anything else is taken as an ID already.
pub fn extract_playlist_id(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("Playlist URL or ID is required".to_string()));
    }

    if !input.starts_with("http") {
        return Ok(input.to_string());
    }

    let not_found = || Error::InvalidInput("Could not extract playlist ID from URL".to_string());
    let url = Url::parse(input).map_err(|_| not_found())?;
    let list = url
        .query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(not_found)?;

    let id: String = list
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if id.is_empty() {
        return Err(not_found());
    }
    Ok(id)
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!("{}{}", PLAYLIST_URL_BASE, playlist_id)
}

pub fn video_url(video_id: &str) -> String {
    format!("{}{}", VIDEO_URL_BASE, video_id)
}
