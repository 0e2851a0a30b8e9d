use async_trait::async_trait;
use vault_model::{FileEntry, FileId, FileStatus, Result};

/// Persistent mapping `file_id -> FileEntry` plus a secondary `path ->
/// file_id` index (spec.md §4.3). Implementations must be safe under
/// concurrent readers and a single writer; a single call sees a consistent
/// snapshot, but there is no multi-call transaction guarantee.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Insert a new entry. Fails if `path` already names a non-deleted entry.
    async fn create(&self, entry: FileEntry) -> Result<FileEntry>;

    /// Insert-or-update by path: if an entry already exists at `entry.path`
    /// (regardless of status) its id is reused and its fields are updated in
    /// place, otherwise a new entry is created. Used by Workers on `Created`
    /// and by the Reconciler when re-index observes a previously DISABLED
    /// path (spec.md §4.8, "upsert-on-id semantics").
    async fn upsert_by_path(&self, entry: FileEntry) -> Result<FileEntry>;

    async fn get_by_id(&self, id: FileId) -> Result<Option<FileEntry>>;

    async fn get_by_path(&self, path: &str) -> Result<Option<FileEntry>>;

    async fn list_children(&self, parent_id: Option<FileId>) -> Result<Vec<FileEntry>>;

    async fn set_status(&self, id: FileId, status: FileStatus) -> Result<()>;

    /// Flip every ACTIVE entry to DISABLED in one logical step. Called at the
    /// start of a full re-index.
    async fn disable_all(&self) -> Result<()>;
}
