use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::VaultId;

/// The kind of filesystem change a `FileChangeEvent` carries. Renames are
/// encoded as `Deleted` of the old path; the new path arrives separately as
/// `Created` (spec.md §3/§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A single filesystem change, as produced by the Watcher and consumed by
/// the Workers (spec.md §3, FileChangeEvent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChangeEvent {
    pub vault_id: VaultId,
    /// Absolute path on disk.
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl FileChangeEvent {
    pub fn new(vault_id: VaultId, path: PathBuf, kind: ChangeKind) -> Self {
        Self {
            vault_id,
            path,
            kind,
            timestamp: Utc::now(),
        }
    }
}
