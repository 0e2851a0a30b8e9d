use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vault_config::VaultConfig;
use vault_contracts::Watcher;
use vault_model::{Result, VaultError, VaultId, VaultState};

use crate::broadcaster::SseBroadcaster;
use crate::catalog::SqliteCatalog;
use crate::event_bus::EventBus;
use crate::explorer::DashMapExplorer;
use crate::reconciler::{self, DlqMetrics, Reconciler};
use crate::search::TantivySearchIndex;
use crate::watcher::LocalWatcher;
use crate::workers::{WorkerContext, WorkerPool};

/// Owns every long-running task for one vault and the explicit lifecycle
/// state machine described in spec.md §4.9: `Initializing -> Active ->
/// Reindexing -> Active`, with `stop()` reachable from `Active` or
/// `Reindexing`, and `start()` failures routing to the terminal `Error`
/// state. Generalizes the teacher's per-library supervisor (a
/// `tokio::sync::watch`/cancellation-flag pair guarding a handful of scan
/// tasks) to a `CancellationToken` guarding the pipeline's six task kinds
/// (spec.md §5).
pub struct VaultSupervisor {
    vault_id: VaultId,
    root: std::path::PathBuf,
    config: VaultConfig,
    state: RwLock<VaultState>,
    token: CancellationToken,
    catalog: Arc<SqliteCatalog>,
    explorer: Arc<DashMapExplorer<SqliteCatalog>>,
    search: Arc<TantivySearchIndex>,
    broadcaster: Arc<SseBroadcaster>,
    reconciler: Arc<Reconciler>,
    bus: Arc<EventBus>,
    watcher: Arc<LocalWatcher<EventBus>>,
    pending_receiver: tokio::sync::Mutex<Option<crate::event_bus::EventBusReceiver>>,
}

impl VaultSupervisor {
    /// Builds every collaborator but does not start any task yet. Matches
    /// `new()` in the spec.md §4.9 diagram: state begins `Initializing`.
    pub async fn new(config: VaultConfig) -> Result<Arc<Self>> {
        let vault_id = VaultId::new(config.id.clone());
        let root = config
            .storage
            .local_path()
            .cloned()
            .ok_or_else(|| VaultError::ConfigInvalid(format!("vault {vault_id}: storage.local.path is required")))?;

        let catalog = Arc::new(SqliteCatalog::open(vault_id.clone(), &config.db_path).await?);
        let explorer = DashMapExplorer::new(
            root.clone(),
            catalog.clone(),
            config.pipeline.explorer_cache_capacity,
            config.pipeline.explorer_cache_ttl_secs,
            config.pipeline.explorer_event_buffer,
        );
        let search = TantivySearchIndex::open_or_create(&config.index_path)?;
        let reconciler = Reconciler::new(vault_id.clone(), config.pipeline.dlq_capacity);

        let (bus, bus_rx) = EventBus::new(config.pipeline.event_bus_capacity);
        let bus = Arc::new(bus);

        let broadcaster = {
            let bus = bus.clone();
            SseBroadcaster::new(vault_id.clone(), config.pipeline.broadcaster_client_buffer, move || bus.pending_count())
        };

        let watcher = Arc::new(LocalWatcher::new(vault_id.clone(), root.clone(), bus.clone()));

        let supervisor = Arc::new(Self {
            vault_id: vault_id.clone(),
            root,
            config,
            state: RwLock::new(VaultState::Initializing),
            token: CancellationToken::new(),
            catalog,
            explorer,
            search,
            broadcaster,
            reconciler,
            bus,
            watcher,
            pending_receiver: tokio::sync::Mutex::new(Some(bus_rx)),
        });

        Ok(supervisor)
    }

    pub fn vault_id(&self) -> &VaultId {
        &self.vault_id
    }

    pub async fn state(&self) -> VaultState {
        *self.state.read().await
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await.is_ready()
    }

    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_ready().await {
                return Ok(());
            }
            if matches!(self.state().await, VaultState::Error) {
                return Err(VaultError::ConfigInvalid(format!("vault {} failed to start", self.vault_id)));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(VaultError::Timeout(format!("vault {} not ready after {:?}", self.vault_id, timeout)));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Spawns every long-running task for this vault (spec.md §5):
    /// one Watcher, `W` Workers, one Explorer consumer, one Broadcaster
    /// flush loop, one Reconciler retry loop. Transitions `Initializing ->
    /// Active` on success, `Initializing -> Error` on failure.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let bus_rx = self
            .pending_receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| VaultError::ConfigInvalid(format!("vault {} already started", self.vault_id)))?;

        if let Err(e) = self.watcher.start().await {
            error!(vault = %self.vault_id, "watcher failed to start: {e}");
            *self.state.write().await = VaultState::Error;
            return Err(e);
        }

        let context = WorkerContext {
            vault_id: self.vault_id.clone(),
            root: self.root.clone(),
            catalog: self.catalog.clone(),
            search: self.search.clone(),
            broadcaster: self.broadcaster.clone(),
            explorer_tx: self.explorer.update_sender(),
            dlq: self.reconciler.handle(),
        };
        WorkerPool::spawn(bus_rx, self.config.pipeline.worker_count, context, self.token.clone());

        tokio::spawn(self.explorer.clone().run());
        tokio::spawn(
            self.broadcaster
                .clone()
                .run_flush_loop(Duration::from_secs(self.config.pipeline.broadcaster_flush_interval_secs), self.token.clone()),
        );
        tokio::spawn(self.reconciler.clone().run_retry_loop(
            self.bus.clone(),
            Duration::from_secs(self.config.pipeline.dlq_retry_interval_secs),
            self.token.clone(),
        ));

        *self.state.write().await = VaultState::Active;
        info!(vault = %self.vault_id, "vault supervisor active");
        Ok(())
    }

    /// Cancels the root token, stops the watcher, waits briefly for tasks
    /// to observe cancellation. Idempotent.
    pub async fn stop(&self) {
        info!(vault = %self.vault_id, "stopping vault supervisor");
        self.token.cancel();
        self.watcher.stop().await;
        *self.state.write().await = VaultState::Stopped;
    }

    pub fn dlq_metrics(&self) -> DlqMetrics {
        self.reconciler.metrics()
    }

    pub fn catalog(&self) -> &Arc<SqliteCatalog> {
        &self.catalog
    }

    pub fn explorer(&self) -> &Arc<DashMapExplorer<SqliteCatalog>> {
        &self.explorer
    }

    pub fn search(&self) -> &Arc<TantivySearchIndex> {
        &self.search
    }

    pub fn broadcaster(&self) -> &Arc<SseBroadcaster> {
        &self.broadcaster
    }

    /// Runs the spec.md §4.8 re-index orchestration end to end.
    pub async fn trigger_reindex(&self) -> Result<()> {
        let pipeline = &self.config.pipeline;
        reconciler::trigger_reindex(
            &self.vault_id,
            &self.state,
            self.catalog.as_ref(),
            self.explorer.as_ref(),
            self.search.as_ref(),
            self.broadcaster.as_ref(),
            self.watcher.as_ref(),
            &self.bus,
            Duration::from_secs(pipeline.reindex_drain_poll_secs),
            Duration::from_secs(pipeline.reindex_drain_timeout_secs),
        )
        .await
    }
}
