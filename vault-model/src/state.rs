use serde::{Deserialize, Serialize};

/// Vault Supervisor lifecycle state (spec.md §3/§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultState {
    Initializing,
    Active,
    Reindexing,
    Stopped,
    Error,
}

impl VaultState {
    pub fn is_ready(self) -> bool {
        matches!(self, VaultState::Active)
    }
}

/// Search service's own, smaller state machine (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Initializing,
    Ready,
    Stopped,
    Error,
}
