//! # ytrank Common Library
//!
//! Shared code for the ytrank service crates:
//! - Error type and result alias
//! - Domain models (playlists, videos, sync tasks)
//! - Sync progress events
//! - Ranking engine for top-video selection
//! - Configuration loading
//! - YouTube identifier and duration helpers

pub mod config;
pub mod duration;
pub mod error;
pub mod events;
pub mod models;
pub mod ranking;
pub mod youtube;

pub use error::{Error, Result};
pub use events::SyncEvent;
