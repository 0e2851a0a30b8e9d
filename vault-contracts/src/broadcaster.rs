use tokio::sync::mpsc;
use vault_model::{ChangeRecord, ClientId, SseEvent, VaultId};

/// Stream of framed SSE events delivered to one subscriber.
pub type EventStream = mpsc::Receiver<SseEvent>;

/// The narrow capability Workers and the Reconciler depend on: queueing a
/// change record or a control event for later coalesced delivery. Neither
/// caller needs to know about client registration (spec.md §9, "consumers
/// depend on the narrowest [capability] they use").
pub trait BroadcastSink: Send + Sync {
    fn enqueue(&self, vault_id: &VaultId, record: ChangeRecord);
    fn broadcast_refresh(&self, vault_id: &VaultId);
    fn broadcast_reindex(&self, vault_id: &VaultId);
    fn broadcast_error(&self, vault_id: &VaultId, message: String);
}

/// The capability the HTTP SSE handler depends on: registering and
/// deregistering subscribers.
pub trait BroadcastSource: Send + Sync {
    fn subscribe(&self, vault_id: &VaultId) -> (ClientId, EventStream);
    fn unsubscribe(&self, client_id: ClientId);
}

/// Full broadcaster capability, implemented by the one concrete service that
/// owns per-client queues and the periodic flush loop (spec.md §4.7).
pub trait ChangeBroadcaster: BroadcastSink + BroadcastSource {}

impl<T: BroadcastSink + BroadcastSource> ChangeBroadcaster for T {}
