use serde::{Deserialize, Serialize};

use crate::ids::FileId;

/// A single coalesced change record carried inside a `bulk_process` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: Option<FileId>,
    pub path: String,
    pub action: ChangeAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Modified,
    Deleted,
}

/// Broadcast unit sent to SSE subscribers (spec.md §3, SSEEvent). Every
/// variant's payload carries `pending_count`, sampled from the Event Bus
/// length at flush time, so a client can always tell how much backlog
/// remains without polling a second endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum SseEvent {
    Connected {
        client_id: String,
        pending_count: usize,
    },
    Ping {
        pending_count: usize,
    },
    BulkProcess {
        changes: Vec<ChangeRecord>,
        pending_count: usize,
    },
    Refresh {
        pending_count: usize,
    },
    Reindex {
        pending_count: usize,
    },
    Error {
        message: String,
        pending_count: usize,
    },
}

impl SseEvent {
    /// The SSE `event:` line name, independent of the JSON payload shape.
    pub fn event_name(&self) -> &'static str {
        match self {
            SseEvent::Connected { .. } => "connected",
            SseEvent::Ping { .. } => "ping",
            SseEvent::BulkProcess { .. } => "bulk_process",
            SseEvent::Refresh { .. } => "refresh",
            SseEvent::Reindex { .. } => "reindex",
            SseEvent::Error { .. } => "error",
        }
    }

    pub fn pending_count(&self) -> usize {
        match self {
            SseEvent::Connected { pending_count, .. }
            | SseEvent::Ping { pending_count }
            | SseEvent::BulkProcess { pending_count, .. }
            | SseEvent::Refresh { pending_count }
            | SseEvent::Reindex { pending_count }
            | SseEvent::Error { pending_count, .. } => *pending_count,
        }
    }
}
