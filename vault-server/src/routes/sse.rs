use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Serialize;
use vault_contracts::BroadcastSource;
use vault_model::VaultId;

use crate::errors::AppResult;
use crate::state::AppState;

/// `GET /api/v1/sse/{vault}`
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Path(vault): Path<String>,
) -> AppResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let vault = state.get(&VaultId::new(vault))?;
    let (_client_id, mut receiver) = vault.broadcaster().subscribe(vault.vault_id());

    let stream = async_stream::stream! {
        while let Some(event) = receiver.recv().await {
            let name = event.event_name();
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok::<Event, Infallible>(Event::default().event(name).data(data)),
                Err(e) => tracing::warn!("failed to encode sse event: {e}"),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(default_keep_alive()))
}

fn default_keep_alive() -> KeepAlive {
    KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive")
}

#[derive(Debug, Serialize)]
pub struct SseStats {
    pub vaults: Vec<VaultSseStats>,
}

#[derive(Debug, Serialize)]
pub struct VaultSseStats {
    pub vault_id: String,
    pub clients: usize,
    pub pending_count: usize,
}

/// `GET /api/v1/sse/stats`
pub async fn stats_handler(State(state): State<AppState>) -> AppResult<Json<SseStats>> {
    let mut vaults = Vec::new();
    for vault_id in state.vault_ids() {
        if let Ok(vault) = state.get(&vault_id) {
            vaults.push(VaultSseStats {
                vault_id: vault_id.as_str().to_string(),
                clients: vault.broadcaster().client_count(),
                pending_count: vault.broadcaster().pending_count(),
            });
        }
    }
    Ok(Json(SseStats { vaults }))
}
