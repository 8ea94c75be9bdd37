//! Sync progress events
//!
//! Events are produced by the sync worker, fanned out by the sync coordinator
//! and serialized for SSE transmission as `{"event": <kind>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sync progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum SyncEvent {
    /// Worker picked up the task
    InProgress {
        task_id: i64,
        total: i64,
        processed: i64,
    },

    /// One playlist pushed successfully
    Progress {
        task_id: i64,
        total: i64,
        processed: i64,
        current_playlist: String,
    },

    /// Every playlist pushed
    Completed {
        task_id: i64,
        total: i64,
        processed: i64,
    },

    /// Task stopped on an error; remaining playlists were not attempted
    Failed {
        task_id: i64,
        error: String,
        processed: i64,
    },

    /// Task stopped at a cancellation check
    Aborted { task_id: i64, processed: i64 },

    /// Keep-alive produced by an idle observer stream
    Heartbeat {},
}

impl SyncEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::InProgress { .. } => "inprogress",
            SyncEvent::Progress { .. } => "progress",
            SyncEvent::Completed { .. } => "completed",
            SyncEvent::Failed { .. } => "failed",
            SyncEvent::Aborted { .. } => "aborted",
            SyncEvent::Heartbeat {} => "heartbeat",
        }
    }

    /// Event payload without the kind tag
    pub fn data(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map
                .remove("data")
                .unwrap_or_else(|| Value::Object(Default::default())),
            _ => Value::Object(Default::default()),
        }
    }

    /// True for events after which the task produces nothing more
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncEvent::Completed { .. } | SyncEvent::Failed { .. } | SyncEvent::Aborted { .. }
        )
    }
}
