use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `storage.type` discriminator (spec.md §6). Only `Local` is functional in
/// the core; `S3`/`Minio` are declared collaborators for the out-of-scope
/// alternative storage backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        path: PathBuf,
    },
    S3 {
        bucket: String,
        region: String,
    },
    Minio {
        endpoint: String,
        bucket: String,
    },
}

impl StorageConfig {
    pub fn local_path(&self) -> Option<&PathBuf> {
        match self {
            StorageConfig::Local { path } => Some(path),
            _ => None,
        }
    }
}

/// Tunables for the pipeline's concurrency and buffering knobs. Every field
/// has a default matching the "design default" called out next to its
/// component in spec.md §4, in the style of
/// `ferrex-core::scan::orchestration::config::QueueConfig`: a small `Copy`
/// struct with a `Default` impl and doc-commented fields so overriding one
/// knob doesn't require specifying the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Event Bus bounded channel capacity (spec.md §4.2).
    pub event_bus_capacity: usize,
    /// Worker pool size, sharded by `hash(path) mod worker_count`
    /// (spec.md §4.6/§5).
    pub worker_count: usize,
    /// Explorer cache max entry count before 10%-oldest eviction kicks in
    /// (spec.md §4.4).
    pub explorer_cache_capacity: usize,
    /// Explorer cache TTL in seconds.
    pub explorer_cache_ttl_secs: u64,
    /// Explorer's serialized-update channel depth; overflow is dropped with
    /// a warning and reconciled from the catalog on next read (spec.md
    /// §4.4 closing paragraph).
    pub explorer_event_buffer: usize,
    /// SSE coalescing flush period in seconds (spec.md §4.7, "F").
    pub broadcaster_flush_interval_secs: u64,
    /// Per-client SSE buffer depth before the oldest record is dropped.
    pub broadcaster_client_buffer: usize,
    /// Dead-letter queue capacity (spec.md §4.8).
    pub dlq_capacity: usize,
    /// DLQ retry ticker interval in seconds.
    pub dlq_retry_interval_secs: u64,
    /// Poll interval while waiting for the Event Bus to drain during
    /// re-index (spec.md §4.8 step 5).
    pub reindex_drain_poll_secs: u64,
    /// Safety timeout for the re-index drain wait.
    pub reindex_drain_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: 10_000,
            worker_count: 4,
            explorer_cache_capacity: 1_000,
            explorer_cache_ttl_secs: 300,
            explorer_event_buffer: 100,
            broadcaster_flush_interval_secs: 2,
            broadcaster_client_buffer: 256,
            dlq_capacity: 1_000,
            dlq_retry_interval_secs: 5,
            reindex_drain_poll_secs: 1,
            reindex_drain_timeout_secs: 300,
        }
    }
}

/// Configuration for a single vault (spec.md §6, "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub storage: StorageConfig,
    pub index_path: PathBuf,
    pub db_path: PathBuf,
    pub pipeline: PipelineConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            enabled: true,
            storage: StorageConfig::Local {
                path: PathBuf::new(),
            },
            index_path: PathBuf::from("index"),
            db_path: PathBuf::from("catalog.db"),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Fails fast on anything `new_vault` cannot recover from at startup
    /// (spec.md §7, "Configuration invalid").
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.id.trim().is_empty() {
            anyhow::bail!("vault config missing required `id`");
        }
        match &self.storage {
            StorageConfig::Local { path } => {
                if path.as_os_str().is_empty() {
                    anyhow::bail!("vault `{}`: storage.local.path is required", self.id);
                }
                if !path.exists() {
                    anyhow::bail!(
                        "vault `{}`: storage.local.path {} does not exist",
                        self.id,
                        path.display()
                    );
                }
            }
            StorageConfig::S3 { .. } | StorageConfig::Minio { .. } => {
                anyhow::bail!(
                    "vault `{}`: only storage.type = \"local\" is functional in this build",
                    self.id
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7420,
        }
    }
}

/// Top-level file: the server's bind address plus every vault it should
/// manage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub server: ServerConfig,
    pub vaults: Vec<VaultConfig>,
}
