use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use vault_contracts::EventSink;
use vault_model::FileChangeEvent;

/// Bounded channel from the Watcher to the Workers (spec.md §4.2). `mpsc`
/// gives no O(1) length for a bounded channel, so a side counter tracks
/// `pending_count` the same way `MediaEventBus` tracks its own sequence
/// number alongside the `broadcast::Sender` it wraps.
pub struct EventBus {
    tx: mpsc::Sender<FileChangeEvent>,
    len: Arc<AtomicUsize>,
}

/// Consumer side, handed to the Event Bus's shard-and-dispatch task.
pub struct EventBusReceiver {
    rx: mpsc::Receiver<FileChangeEvent>,
    len: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, EventBusReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let len = Arc::new(AtomicUsize::new(0));
        (
            EventBus {
                tx,
                len: len.clone(),
            },
            EventBusReceiver { rx, len },
        )
    }

    /// Non-blocking try-send used by the Reconciler's retry ticker
    /// (spec.md §4.2, `inject`). Returns `false` if the bus is full.
    pub fn inject(&self, event: FileChangeEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.len.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventSink for EventBus {
    async fn send(&self, event: FileChangeEvent) {
        // Blocking send: backpressure from downstream must propagate all
        // the way to the watcher's OS event source (spec.md §4.1).
        if self.tx.send(event).await.is_ok() {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn pending_count(&self) -> usize {
        self.pending_count()
    }
}

impl EventBusReceiver {
    pub async fn recv(&mut self) -> Option<FileChangeEvent> {
        let event = self.rx.recv().await;
        if event.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use vault_model::{ChangeKind, VaultId};

    fn event() -> FileChangeEvent {
        FileChangeEvent {
            vault_id: VaultId::new("v1"),
            path: PathBuf::from("/vault/note.md"),
            kind: ChangeKind::Created,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn inject_returns_false_when_full() {
        let (bus, mut rx) = EventBus::new(1);
        assert!(bus.inject(event()));
        assert!(!bus.inject(event()));
        assert_eq!(bus.pending_count(), 1);
        rx.recv().await.unwrap();
        assert_eq!(bus.pending_count(), 0);
    }

    #[tokio::test]
    async fn send_blocks_until_capacity_frees() {
        let (bus, mut rx) = EventBus::new(1);
        bus.inject(event());
        let bus2 = Arc::new(bus);
        let sender = bus2.clone();
        let handle = tokio::spawn(async move {
            EventSink::send(sender.as_ref(), event()).await;
        });
        tokio::task::yield_now().await;
        assert_eq!(bus2.pending_count(), 1);
        rx.recv().await.unwrap();
        handle.await.unwrap();
        assert_eq!(bus2.pending_count(), 1);
    }
}
