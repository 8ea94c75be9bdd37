//! HTTP API handlers for ytrank-web (JSON + SSE)

pub mod health;
pub mod playlists;
pub mod sse;
pub mod sync;

pub use health::health_routes;
pub use playlists::playlist_routes;
pub use sse::sync_event_stream;
pub use sync::sync_routes;
