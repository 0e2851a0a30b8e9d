use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vault_contracts::{BroadcastSink, BroadcastSource, EventStream};
use vault_model::{ChangeRecord, ClientId, SseEvent, VaultId};

/// Per-client queue plus send handle, modeled on
/// `ferrex-server::infra::websocket::connection::Connection` (an `mpsc`
/// sender plus state guarded behind locks) crossed with
/// `ferrex-server::infra::scan::media_event_bus::MediaEventBus`'s bounded
/// history buffer — here the buffer holds unflushed change records instead
/// of a broadcast history (spec.md §4.7). A plain `std::sync::Mutex` is
/// enough since the guard never crosses an `.await`.
struct ClientHandle {
    tx: mpsc::Sender<SseEvent>,
    buffer: Mutex<VecDeque<ChangeRecord>>,
    buffer_capacity: usize,
}

impl ClientHandle {
    fn push(&self, record: ChangeRecord) {
        let mut buffer = self.buffer.lock().unwrap();
        if buffer.len() >= self.buffer_capacity {
            buffer.pop_front();
        }
        buffer.push_back(record);
    }

    fn drain(&self) -> Vec<ChangeRecord> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.drain(..).collect()
    }
}

/// `ChangeBroadcaster` implementation for one vault: a `DashMap` of
/// per-client handles plus a periodic flush loop (spec.md §4.7). Modeled on
/// `ferrex-server::infra::websocket::manager::ConnectionManager`'s
/// `DashMap<Uuid, Arc<Connection>>`, generalized from WebSocket rooms to
/// the SSE coalescing flush this pipeline needs.
pub struct SseBroadcaster {
    vault_id: VaultId,
    clients: DashMap<ClientId, Arc<ClientHandle>>,
    client_buffer_capacity: usize,
    pending_count: Box<dyn Fn() -> usize + Send + Sync>,
}

impl SseBroadcaster {
    pub fn new(vault_id: VaultId, client_buffer_capacity: usize, pending_count: impl Fn() -> usize + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            vault_id,
            clients: DashMap::new(),
            client_buffer_capacity,
            pending_count: Box::new(pending_count),
        })
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Current length of the event bus this broadcaster flushes from,
    /// exposed for the stats route.
    pub fn pending_count(&self) -> usize {
        (self.pending_count)()
    }

    /// Runs the flush loop until `token` is cancelled. One task per vault,
    /// spawned once by the Vault Supervisor.
    pub async fn run_flush_loop(self: Arc<Self>, period: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.flush_once().await,
            }
        }
    }

    async fn flush_once(&self) {
        let pending = (self.pending_count)();
        let mut dead = Vec::new();

        for entry in self.clients.iter() {
            let (client_id, handle) = (*entry.key(), entry.value().clone());
            let changes = handle.drain();

            let event = if changes.is_empty() {
                SseEvent::Ping { pending_count: pending }
            } else {
                SseEvent::BulkProcess {
                    changes,
                    pending_count: pending,
                }
            };

            if handle.tx.try_send(event).is_err() {
                dead.push(client_id);
            }
        }

        for client_id in dead {
            debug!(vault = %self.vault_id, %client_id, "dropping client with closed sse stream");
            self.clients.remove(&client_id);
        }
    }
}

impl BroadcastSink for SseBroadcaster {
    fn enqueue(&self, vault_id: &VaultId, record: ChangeRecord) {
        debug_assert_eq!(vault_id, &self.vault_id);
        for entry in self.clients.iter() {
            entry.value().push(record.clone());
        }
    }

    fn broadcast_refresh(&self, vault_id: &VaultId) {
        debug_assert_eq!(vault_id, &self.vault_id);
        let pending = (self.pending_count)();
        self.send_to_all(SseEvent::Refresh { pending_count: pending });
    }

    fn broadcast_reindex(&self, vault_id: &VaultId) {
        debug_assert_eq!(vault_id, &self.vault_id);
        let pending = (self.pending_count)();
        self.send_to_all(SseEvent::Reindex { pending_count: pending });
    }

    fn broadcast_error(&self, vault_id: &VaultId, message: String) {
        debug_assert_eq!(vault_id, &self.vault_id);
        let pending = (self.pending_count)();
        self.send_to_all(SseEvent::Error { message, pending_count: pending });
    }
}

impl SseBroadcaster {
    fn send_to_all(&self, event: SseEvent) {
        for entry in self.clients.iter() {
            if entry.value().tx.try_send(event.clone()).is_err() {
                warn!(vault = %self.vault_id, "control event dropped for a client with a full or closed buffer");
            }
        }
    }
}

impl BroadcastSource for SseBroadcaster {
    fn subscribe(&self, vault_id: &VaultId) -> (ClientId, EventStream) {
        debug_assert_eq!(vault_id, &self.vault_id);
        let client_id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.client_buffer_capacity);

        let pending = (self.pending_count)();
        let _ = tx.try_send(SseEvent::Connected {
            client_id: client_id.to_string(),
            pending_count: pending,
        });

        self.clients.insert(
            client_id,
            Arc::new(ClientHandle {
                tx,
                buffer: Mutex::new(VecDeque::new()),
                buffer_capacity: self.client_buffer_capacity,
            }),
        );

        (client_id, rx)
    }

    fn unsubscribe(&self, client_id: ClientId) {
        self.clients.remove(&client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_emits_connected_immediately() {
        let broadcaster = SseBroadcaster::new(VaultId::new("v1"), 16, || 0);
        let (_, mut rx) = broadcaster.subscribe(&VaultId::new("v1"));
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SseEvent::Connected { .. }));
    }

    #[tokio::test]
    async fn flush_coalesces_buffered_changes_into_one_event() {
        let broadcaster = SseBroadcaster::new(VaultId::new("v1"), 16, || 5);
        let (_, mut rx) = broadcaster.subscribe(&VaultId::new("v1"));
        rx.recv().await.unwrap(); // connected

        for i in 0..3 {
            broadcaster.enqueue(
                &VaultId::new("v1"),
                ChangeRecord {
                    id: None,
                    path: format!("notes/{i}.md"),
                    action: vault_model::ChangeAction::Created,
                },
            );
        }

        broadcaster.flush_once().await;
        let event = rx.recv().await.unwrap();
        match event {
            SseEvent::BulkProcess { changes, pending_count } => {
                assert_eq!(changes.len(), 3);
                assert_eq!(pending_count, 5);
            }
            other => panic!("expected bulk_process, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_flush_sends_ping() {
        let broadcaster = SseBroadcaster::new(VaultId::new("v1"), 16, || 0);
        let (_, mut rx) = broadcaster.subscribe(&VaultId::new("v1"));
        rx.recv().await.unwrap();

        broadcaster.flush_once().await;
        assert!(matches!(rx.recv().await.unwrap(), SseEvent::Ping { .. }));
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_stream() {
        let broadcaster = SseBroadcaster::new(VaultId::new("v1"), 16, || 0);
        let (client_id, mut rx) = broadcaster.subscribe(&VaultId::new("v1"));
        rx.recv().await.unwrap();
        broadcaster.unsubscribe(client_id);
        assert!(rx.recv().await.is_none());
    }
}
