//! Server-Sent Events for sync progress
//!
//! Each connection registers its own observer with the sync coordinator.
//! When nothing arrives within the heartbeat window the stream emits a
//! `heartbeat` event with an empty payload.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::{debug, info};
use ytrank_common::SyncEvent;

use crate::AppState;

/// GET /sync/events
pub async fn sync_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.coordinator.subscribe();
    info!(observer = %subscription.id(), "SSE client connected to sync events");

    let stream = subscription
        .into_stream(state.heartbeat_interval)
        .map(|event| Ok::<_, Infallible>(to_sse_event(&event)));

    Sse::new(stream)
}

/// `event: <kind>` with the JSON payload as data
pub fn to_sse_event(event: &SyncEvent) -> Event {
    let kind = event.event_type();
    debug!(event = kind, "SSE: sending sync event");
    Event::default().event(kind).data(event.data().to_string())
}
