use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::FileId;

/// Lifecycle status of a catalog entry (spec.md §3, FileStatus lifecycle).
///
/// Only `Active` entries are visible to the explorer and search read sides.
/// `Disabled` exists purely to support re-index: every active entry flips to
/// `Disabled` at the start of a re-index and back to `Active` as it is
/// re-observed, so ids survive the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Active,
    Deleted,
    Disabled,
}

impl FileStatus {
    pub fn is_visible(self) -> bool {
        matches!(self, FileStatus::Active)
    }
}

/// A single catalog row (spec.md §3, FileEntry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: FileId,
    /// Relative to the vault root, forward-slash separated, never empty
    /// except for the implicit root entry.
    pub path: String,
    pub name: String,
    /// `None` means this entry is the vault root.
    pub parent_id: Option<FileId>,
    pub is_dir: bool,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub status: FileStatus,
}

impl FileEntry {
    pub fn is_markdown(&self) -> bool {
        !self.is_dir
            && self
                .path
                .rsplit('.')
                .next()
                .map(|ext| ext.eq_ignore_ascii_case("md"))
                .unwrap_or(false)
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}
