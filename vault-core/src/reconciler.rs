use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vault_contracts::{BroadcastSink, Catalog, ExplorerCache, SearchIndex, Watcher};
use vault_model::{FileChangeEvent, Result, VaultError, VaultId, VaultState};

use crate::event_bus::EventBus;

/// Point-in-time counters for the dead-letter queue (spec.md §4.8).
#[derive(Debug, Clone, Copy, Default)]
pub struct DlqMetrics {
    pub depth: u64,
    pub lifetime_enqueued: u64,
    pub retried: u64,
    pub dropped: u64,
}

/// Handle workers push failed events onto, shared via `Arc` so every lane
/// can report into the same counters without holding the `Reconciler`
/// itself. Non-blocking: a full DLQ increments `dropped` and the event is
/// permanently lost (spec.md §4.8, `send(event)`).
#[derive(Clone)]
pub struct DlqHandle {
    tx: mpsc::Sender<FileChangeEvent>,
    depth: Arc<AtomicU64>,
    lifetime_enqueued: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl DlqHandle {
    pub async fn send(&self, event: FileChangeEvent) {
        self.lifetime_enqueued.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(event) {
            Ok(()) => {
                self.depth.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Dead-letter queue plus full re-index orchestration for one vault,
/// modeled on `ferrex-core::scan::orchestration`'s retry-ticker-over-a-queue
/// shape (`QueueConfig`/`LeaseConfig` tunables), generalized here to a flat
/// bounded channel since the spec calls for a plain 5s ticker rather than
/// per-item backoff.
pub struct Reconciler {
    vault_id: VaultId,
    dlq_tx: mpsc::Sender<FileChangeEvent>,
    dlq_rx: RwLock<mpsc::Receiver<FileChangeEvent>>,
    depth: Arc<AtomicU64>,
    lifetime_enqueued: Arc<AtomicU64>,
    retried: AtomicU64,
    dropped: Arc<AtomicU64>,
}

impl Reconciler {
    pub fn new(vault_id: VaultId, capacity: usize) -> Arc<Self> {
        let (dlq_tx, dlq_rx) = mpsc::channel(capacity);
        Arc::new(Self {
            vault_id,
            dlq_tx,
            dlq_rx: RwLock::new(dlq_rx),
            depth: Arc::new(AtomicU64::new(0)),
            lifetime_enqueued: Arc::new(AtomicU64::new(0)),
            retried: AtomicU64::new(0),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Handle workers push failed events onto.
    pub fn handle(&self) -> DlqHandle {
        DlqHandle {
            tx: self.dlq_tx.clone(),
            depth: self.depth.clone(),
            lifetime_enqueued: self.lifetime_enqueued.clone(),
            dropped: self.dropped.clone(),
        }
    }

    pub fn metrics(&self) -> DlqMetrics {
        DlqMetrics {
            depth: self.depth.load(Ordering::Relaxed),
            lifetime_enqueued: self.lifetime_enqueued.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Drains all currently pending DLQ entries, re-injecting each into the
    /// Event Bus. Entries rejected by a full bus are requeued onto the DLQ
    /// for the next tick (best-effort; a DLQ full at that moment drops them).
    async fn retry_once(&self, bus: &EventBus) {
        let mut rx = self.dlq_rx.write().await;
        let mut pending = Vec::new();
        while let Ok(event) = rx.try_recv() {
            pending.push(event);
        }
        drop(rx);

        if pending.is_empty() {
            return;
        }

        self.depth.fetch_sub(pending.len() as u64, Ordering::Relaxed);
        let mut requeued = 0u64;
        for event in pending {
            if bus.inject(event.clone()) {
                self.retried.fetch_add(1, Ordering::Relaxed);
            } else if self.dlq_tx.try_send(event).is_ok() {
                self.depth.fetch_add(1, Ordering::Relaxed);
                requeued += 1;
            } else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        if requeued > 0 {
            warn!(vault = %self.vault_id, requeued, "event bus full, dlq entries held for next tick");
        }
    }

    /// Runs the retry ticker until `token` is cancelled. One task per vault.
    pub async fn run_retry_loop(self: Arc<Self>, bus: Arc<EventBus>, period: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.retry_once(&bus).await,
            }
        }
    }
}

/// Runs the full re-index orchestration described in spec.md §4.8, steps
/// 1-6. `state` is the Vault Supervisor's shared state cell; this function
/// flips it to `Reindexing` and back to `Active` around the walk.
pub async fn trigger_reindex<C, E, S, B, W>(
    vault_id: &VaultId,
    state: &RwLock<VaultState>,
    catalog: &C,
    explorer: &E,
    search: &S,
    broadcaster: &B,
    watcher: &W,
    bus: &EventBus,
    drain_poll: Duration,
    drain_timeout: Duration,
) -> Result<()>
where
    C: Catalog,
    E: ExplorerCache,
    S: SearchIndex,
    B: BroadcastSink,
    W: Watcher,
{
    {
        let mut state = state.write().await;
        *state = VaultState::Reindexing;
    }
    broadcaster.broadcast_reindex(vault_id);
    info!(vault = %vault_id, "reindex started");

    catalog.disable_all().await?;
    explorer.clear().await;
    search.clear().await?;

    watcher.reindex().await?;

    let deadline = tokio::time::Instant::now() + drain_timeout;
    loop {
        if bus.pending_count() == 0 {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            let mut state = state.write().await;
            *state = VaultState::Error;
            return Err(VaultError::Timeout(format!(
                "vault {vault_id} reindex drain exceeded {:?}",
                drain_timeout
            )));
        }
        tokio::time::sleep(drain_poll).await;
    }

    {
        let mut state = state.write().await;
        *state = VaultState::Active;
    }
    broadcaster.broadcast_refresh(vault_id);
    info!(vault = %vault_id, "reindex complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_model::{ChangeKind, FileChangeEvent};

    #[tokio::test]
    async fn dropped_when_dlq_full() {
        let reconciler = Reconciler::new(VaultId::new("v1"), 1);
        let handle = reconciler.handle();
        let event = FileChangeEvent::new(VaultId::new("v1"), "/vault/a.md".into(), ChangeKind::Created);

        handle.send(event.clone()).await;
        handle.send(event).await;

        let metrics = reconciler.metrics();
        assert_eq!(metrics.lifetime_enqueued, 2);
        assert_eq!(metrics.dropped, 1);
        assert_eq!(metrics.depth, 1);
    }

    #[tokio::test]
    async fn retry_reinjects_pending_entries() {
        let reconciler = Reconciler::new(VaultId::new("v1"), 10);
        let (bus, mut rx) = EventBus::new(10);
        let event = FileChangeEvent::new(VaultId::new("v1"), "/vault/a.md".into(), ChangeKind::Created);
        reconciler.handle().send(event.clone()).await;

        reconciler.retry_once(&bus).await;
        let forwarded = rx.recv().await.unwrap();
        assert_eq!(forwarded.path, event.path);
        assert_eq!(reconciler.metrics().retried, 1);
    }
}
