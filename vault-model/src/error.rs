use std::path::PathBuf;

use crate::ids::VaultId;

/// Errors produced anywhere in the vault pipeline. Variants correspond to the
/// error-kind table in spec.md §7; each carries the context its call site
/// needs to log and react without string-matching the message.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("io error for vault {vault}: {source}")]
    Io {
        vault: VaultId,
        #[source]
        source: std::io::Error,
    },

    #[error("path escapes vault root: {path}")]
    InvalidPath { path: String },

    #[error("event bus for vault {vault} is full")]
    BusFull { vault: VaultId },

    #[error("sse client write failed: {0}")]
    ClientWriteFailed(String),

    #[error("watcher backend failed for vault {vault}: {message}")]
    WatcherBackend { vault: VaultId, message: String },

    #[error("vault not found: {0}")]
    VaultNotFound(VaultId),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("search index error: {0}")]
    Search(String),

    #[error("operation timed out: {0}")]
    Timeout(String),
}

impl VaultError {
    pub fn io(vault: &VaultId, source: std::io::Error) -> Self {
        Self::Io {
            vault: vault.clone(),
            source,
        }
    }

    pub fn invalid_path(path: impl Into<PathBuf>) -> Self {
        Self::InvalidPath {
            path: path.into().display().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
