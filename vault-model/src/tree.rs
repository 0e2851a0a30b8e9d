use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    File,
    Directory,
}

/// Metadata carried by every `TreeNode`, independent of whether children
/// have been materialized (spec.md §3, NodeMetadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub id: FileId,
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub is_markdown: bool,
    pub has_children: bool,
    pub child_count: usize,
    pub cached_at: DateTime<Utc>,
}

/// Explorer cache value, keyed by relative path (spec.md §3, TreeNode).
///
/// `loaded = false` means only `metadata` is populated (e.g. a placeholder
/// returned by `get_metadata`); `loaded = true` means `children` reflects a
/// materialized one-level listing with hidden and non-ACTIVE entries already
/// filtered out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub metadata: NodeMetadata,
    pub children: Option<Vec<TreeNode>>,
    pub loaded: bool,
}

impl TreeNode {
    pub fn leaf(metadata: NodeMetadata) -> Self {
        Self {
            metadata,
            children: None,
            loaded: false,
        }
    }

    pub fn with_children(metadata: NodeMetadata, children: Vec<TreeNode>) -> Self {
        Self {
            metadata,
            children: Some(children),
            loaded: true,
        }
    }

    pub fn is_stale(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.metadata.cached_at > ttl
    }
}
