use std::sync::Arc;

use dashmap::DashMap;
use vault_core::VaultSupervisor;
use vault_model::VaultId;

use crate::errors::AppError;

/// One running pipeline per configured vault, looked up by the `{vault}`
/// path segment on every route (spec.md §6).
#[derive(Clone)]
pub struct AppState {
    vaults: Arc<DashMap<VaultId, Arc<VaultSupervisor>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            vaults: Arc::new(DashMap::new()),
        }
    }

    pub fn insert(&self, supervisor: Arc<VaultSupervisor>) {
        self.vaults.insert(supervisor.vault_id().clone(), supervisor);
    }

    pub fn get(&self, vault_id: &VaultId) -> Result<Arc<VaultSupervisor>, AppError> {
        self.vaults
            .get(vault_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("vault not found: {vault_id}")))
    }

    pub fn vault_ids(&self) -> Vec<VaultId> {
        self.vaults.iter().map(|entry| entry.key().clone()).collect()
    }

    pub async fn stop_all(&self) {
        for entry in self.vaults.iter() {
            entry.value().stop().await;
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
