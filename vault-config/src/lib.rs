//! Configuration loading for vaultd: per-vault settings plus the pipeline
//! tunables named in spec.md §4 and §6, loaded the way
//! `ferrex-config::models::scanner::ScannerConfig` resolves its own source
//! (env var path, inline env var, default file candidates, compiled-in
//! default), in that order of precedence.

mod loader;
mod models;

pub use loader::{load_from_env, load_from_file, validate, ConfigSource, ENV_CONFIG_INLINE, ENV_CONFIG_PATH};
pub use models::{EngineConfig, PipelineConfig, ServerConfig, StorageConfig, VaultConfig};
