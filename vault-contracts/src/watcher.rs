use async_trait::async_trait;
use vault_model::{FileChangeEvent, Result};

/// The sink a `Watcher` pushes discovered events into. Implemented by the
/// Event Bus; kept separate from the bus's own inherent API so the watcher
/// doesn't need to know about worker sharding, DLQ re-injection, or anything
/// else downstream of the bus.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Blocking send — backpressure from downstream must propagate all the
    /// way back to the OS event source (spec.md §4.1). Never drops an event.
    async fn send(&self, event: FileChangeEvent);

    /// Current queue depth, sampled for `pending_count` fields.
    fn pending_count(&self) -> usize;
}

/// A filesystem watcher for one vault root. The backend (local fs, future
/// S3/MinIO collaborators) is a tagged choice made at construction, not an
/// inheritance hierarchy (spec.md §9).
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Begin monitoring the vault root and every non-hidden subdirectory.
    async fn start(&self) -> Result<()>;

    /// Stop monitoring and release any OS-level watch handles.
    async fn stop(&self);

    /// Walk the vault root and emit a `Created` event for every non-hidden
    /// file found, used by full re-index (spec.md §4.8).
    async fn reindex(&self) -> Result<()>;
}
