//! Shared data models for the vault pipeline.
//!
//! Plain types only: no I/O, no async. Every type that crosses the HTTP/SSE
//! boundary or the catalog's storage boundary derives `serde`.

pub mod error;
pub mod events;
pub mod files;
pub mod ids;
pub mod sse;
pub mod state;
pub mod tree;

pub use error::{Result, VaultError};
pub use events::{ChangeKind, FileChangeEvent};
pub use files::{FileEntry, FileStatus};
pub use ids::{ClientId, FileId, VaultId};
pub use sse::{ChangeAction, ChangeRecord, SseEvent};
pub use state::{SearchState, VaultState};
pub use tree::{NodeMetadata, NodeType, TreeNode};
