//! Service modules: video source, remote sync target, playlist analysis

pub mod analysis;
pub mod sync_target;
pub mod video_source;

pub use analysis::PlaylistAnalyzer;
pub use sync_target::{HttpSyncTarget, SyncTarget};
pub use video_source::{PlaylistItemsPage, VideoSource, YouTubeClient};
