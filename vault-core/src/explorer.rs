use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use vault_contracts::{validate_path, Catalog, ExplorerCache};
use vault_model::{ChangeKind, FileChangeEvent, FileEntry, FileStatus, NodeMetadata, NodeType, Result, TreeNode};

/// Lazy directory-tree cache, keyed by normalized relative path, backed by
/// `DashMap` the way `ferrex-server`'s `ConnectionManager`/`MediaEventBus`
/// use `DashMap` for their own concurrent maps (spec.md §4.4).
pub struct DashMapExplorer<C: Catalog> {
    root: PathBuf,
    catalog: Arc<C>,
    entries: DashMap<String, TreeNode>,
    capacity: usize,
    ttl: ChronoDuration,
    update_tx: mpsc::Sender<FileChangeEvent>,
    update_rx: Mutex<Option<mpsc::Receiver<FileChangeEvent>>>,
}

impl<C: Catalog + 'static> DashMapExplorer<C> {
    pub fn new(
        root: PathBuf,
        catalog: Arc<C>,
        capacity: usize,
        ttl_secs: u64,
        event_buffer: usize,
    ) -> Arc<Self> {
        let (update_tx, update_rx) = mpsc::channel(event_buffer.max(1));
        Arc::new(Self {
            root,
            catalog,
            entries: DashMap::new(),
            capacity,
            ttl: ChronoDuration::seconds(ttl_secs as i64),
            update_tx,
            update_rx: Mutex::new(Some(update_rx)),
        })
    }

    /// Vault root this explorer resolves relative paths against. Used by
    /// the HTTP surface to read raw file content and to place newly
    /// created files before the watcher observes them.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Queue handle consumers (the Workers) use to notify the explorer of a
    /// filesystem change. Non-blocking: a full buffer is dropped with a
    /// warning, per spec.md §4.4's closing paragraph — state reconciles
    /// from the catalog on the next explicit read.
    pub fn update_sender(&self) -> mpsc::Sender<FileChangeEvent> {
        self.update_tx.clone()
    }

    /// Runs the single-consumer update task. Spawned once by the Vault
    /// Supervisor; takes ownership of the receiver the first (and only)
    /// time it's called.
    pub async fn run(self: Arc<Self>) {
        let mut rx = match self.update_rx.lock().await.take() {
            Some(rx) => rx,
            None => return,
        };
        while let Some(event) = rx.recv().await {
            self.apply_update(&event).await;
        }
    }

    async fn load_children(&self, parent_id: Option<vault_model::FileId>) -> Result<Vec<TreeNode>> {
        let children = self.catalog.list_children(parent_id).await?;
        Ok(children
            .into_iter()
            .filter(|e| e.status == FileStatus::Active && !e.is_hidden())
            .map(|e| TreeNode::leaf(metadata_of(&e)))
            .collect())
    }

    async fn load_node(&self, path: &str) -> Result<Option<TreeNode>> {
        let entry = match self.catalog.get_by_path(path).await? {
            Some(e) if e.status == FileStatus::Active => e,
            _ => return Ok(None),
        };

        let children = if entry.is_dir {
            Some(self.load_children(Some(entry.id)).await?)
        } else {
            None
        };

        let mut metadata = metadata_of(&entry);
        metadata.has_children = children.as_ref().map(|c| !c.is_empty()).unwrap_or(false);
        metadata.child_count = children.as_ref().map(|c| c.len()).unwrap_or(0);

        Ok(Some(match children {
            Some(children) => TreeNode::with_children(metadata, children),
            None => TreeNode::leaf(metadata),
        }))
    }

    fn insert(&self, path: String, node: TreeNode) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&path) {
            self.evict_oldest();
        }
        self.entries.insert(path, node);
    }

    fn evict_oldest(&self) {
        let evict_count = (self.capacity / 10).max(1);
        let mut by_age: Vec<(String, chrono::DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().metadata.cached_at))
            .collect();
        by_age.sort_by_key(|(_, cached_at)| *cached_at);
        for (path, _) in by_age.into_iter().take(evict_count) {
            self.entries.remove(&path);
        }
    }

    async fn refresh_path(&self, path: &str) -> Result<()> {
        match self.load_node(path).await? {
            Some(node) => self.insert(path.to_string(), node),
            None => {
                self.entries.remove(path);
            }
        }
        Ok(())
    }

    async fn apply_update(&self, event: &FileChangeEvent) {
        let Ok(relative) = self.relative_path(event) else {
            return;
        };

        let result = match event.kind {
            ChangeKind::Created => {
                let parent = dirname(&relative);
                self.refresh_path(&parent).await
            }
            ChangeKind::Deleted => {
                self.entries.remove(&relative);
                let parent = dirname(&relative);
                self.refresh_path(&parent).await
            }
            ChangeKind::Modified => {
                self.entries.remove(&relative);
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("explorer update for {relative} failed: {e}");
        }
    }

    fn relative_path(&self, event: &FileChangeEvent) -> Result<String> {
        let relative = event.path.strip_prefix(&self.root).unwrap_or(&event.path);
        validate_path(&relative.to_string_lossy())
    }
}

fn dirname(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

fn metadata_of(entry: &FileEntry) -> NodeMetadata {
    let now = Utc::now();
    NodeMetadata {
        id: entry.id,
        path: entry.path.clone(),
        name: entry.name.clone(),
        node_type: if entry.is_dir { NodeType::Directory } else { NodeType::File },
        size: entry.size,
        mtime: entry.modified,
        is_markdown: entry.is_markdown(),
        has_children: false,
        child_count: 0,
        cached_at: now,
    }
}

#[async_trait]
impl<C: Catalog + 'static> ExplorerCache for DashMapExplorer<C> {
    async fn get_tree(&self, path: &str) -> Result<TreeNode> {
        let path = validate_path(path)?;
        if let Some(node) = self.entries.get(&path) {
            if !node.is_stale(self.ttl, Utc::now()) {
                return Ok(node.clone());
            }
        }

        let node = self
            .load_node(&path)
            .await?
            .unwrap_or_else(|| TreeNode::with_children(empty_root_metadata(Path::new(&path)), Vec::new()));
        self.insert(path, node.clone());
        Ok(node)
    }

    async fn get_children(&self, path: &str) -> Result<Vec<TreeNode>> {
        let node = self.get_tree(path).await?;
        Ok(node.children.unwrap_or_default())
    }

    async fn get_metadata(&self, path: &str) -> Result<Option<NodeMetadata>> {
        let path = validate_path(path)?;
        if let Some(node) = self.entries.get(&path) {
            return Ok(Some(node.metadata.clone()));
        }
        Ok(self.load_node(&path).await?.map(|n| n.metadata))
    }

    async fn refresh(&self, path: &str) -> Result<()> {
        let path = validate_path(path)?;
        self.refresh_path(&path).await
    }

    async fn clear(&self) {
        self.entries.clear();
    }

    async fn update_index(&self, event: &FileChangeEvent) {
        self.apply_update(event).await;
    }
}

fn empty_root_metadata(path: &Path) -> NodeMetadata {
    let now = Utc::now();
    NodeMetadata {
        id: vault_model::FileId::new(),
        path: path.to_string_lossy().to_string(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        node_type: NodeType::Directory,
        size: 0,
        mtime: now,
        is_markdown: false,
        has_children: false,
        child_count: 0,
        cached_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalog;
    use chrono::Utc;
    use vault_model::{FileId, VaultId};

    async fn catalog_with_one_file() -> Arc<SqliteCatalog> {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::open(VaultId::new("v1"), &dir.path().join("c.db"))
            .await
            .unwrap();
        let now = Utc::now();
        catalog
            .create(FileEntry {
                id: FileId::new(),
                path: "notes".to_string(),
                name: "notes".to_string(),
                parent_id: None,
                is_dir: true,
                size: 0,
                created: now,
                modified: now,
                status: FileStatus::Active,
            })
            .await
            .unwrap();
        Arc::new(catalog)
    }

    #[tokio::test]
    async fn get_tree_filters_hidden_and_inactive() {
        let catalog = catalog_with_one_file().await;
        let explorer = DashMapExplorer::new(PathBuf::from("/vault"), catalog, 1000, 300, 100);
        let tree = explorer.get_tree("").await.unwrap();
        assert!(tree.children.is_some());
    }

    #[tokio::test]
    async fn path_traversal_is_rejected_before_cache_touch() {
        let catalog = catalog_with_one_file().await;
        let explorer = DashMapExplorer::new(PathBuf::from("/vault"), catalog, 1000, 300, 100);
        assert!(explorer.get_tree("../etc/passwd").await.is_err());
        assert!(explorer.entries.is_empty());
    }
}
