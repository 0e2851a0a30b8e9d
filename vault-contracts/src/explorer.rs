use async_trait::async_trait;
use vault_model::{FileChangeEvent, NodeMetadata, Result, TreeNode};

/// Lazy directory-tree cache with path -> node lookup (spec.md §4.4).
/// Every public operation validates its path argument first and rejects
/// traversal attempts without touching cache state.
#[async_trait]
pub trait ExplorerCache: Send + Sync {
    /// Tree rooted at `path`, one level materialized (`loaded = true`).
    async fn get_tree(&self, path: &str) -> Result<TreeNode>;

    /// One-level children of `path`.
    async fn get_children(&self, path: &str) -> Result<Vec<TreeNode>>;

    /// Metadata only, no children materialized.
    async fn get_metadata(&self, path: &str) -> Result<Option<NodeMetadata>>;

    /// Invalidate and re-read `path`.
    async fn refresh(&self, path: &str) -> Result<()>;

    /// Drop every cached entry (called during re-index).
    async fn clear(&self);

    /// Apply the event-driven update policy for a single filesystem change
    /// (spec.md §4.4): Created/Deleted refresh the parent's child listing in
    /// place, Modified invalidates only the changed path.
    async fn update_index(&self, event: &FileChangeEvent);
}
