use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::EngineConfig;

/// Environment variable holding a path to a config file.
pub const ENV_CONFIG_PATH: &str = "VAULTD_CONFIG_PATH";
/// Environment variable holding an inline JSON config document.
pub const ENV_CONFIG_INLINE: &str = "VAULTD_CONFIG_JSON";

/// Default file candidates checked, in order, when neither environment
/// variable is set. Mirrors `ScannerConfig`'s fallback-candidate list: try
/// the working directory first, then an `/etc`-style system location.
const DEFAULT_CANDIDATES: &[&str] = &["vaultd.toml", "config/vaultd.toml", "/etc/vaultd/config.toml"];

/// Where a loaded `EngineConfig` came from, kept around for startup logging.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// No file or env var found; compiled-in defaults only.
    Default,
    /// Loaded from the path named by `VAULTD_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// Parsed from the inline JSON document in `VAULTD_CONFIG_JSON`.
    EnvInline,
    /// Loaded from one of the default candidate paths.
    File(PathBuf),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "built-in defaults"),
            ConfigSource::EnvPath(p) => write!(f, "{} (from {ENV_CONFIG_PATH})", p.display()),
            ConfigSource::EnvInline => write!(f, "inline ${ENV_CONFIG_INLINE}"),
            ConfigSource::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Resolves an `EngineConfig` the same way `ScannerConfig::load_from_env`
/// does: an explicit path env var wins, then an inline JSON env var, then
/// the first default candidate that exists on disk, and finally
/// `Default::default()` if nothing is found.
pub fn load_from_env() -> Result<(EngineConfig, ConfigSource)> {
    if let Ok(path) = env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(path);
        let cfg = load_from_file(&path)
            .with_context(|| format!("loading config from {ENV_CONFIG_PATH}={}", path.display()))?;
        return Ok((cfg, ConfigSource::EnvPath(path)));
    }

    if let Ok(inline) = env::var(ENV_CONFIG_INLINE) {
        let cfg = parse_str(&inline, Format::Json)
            .with_context(|| format!("parsing inline config from {ENV_CONFIG_INLINE}"))?;
        return Ok((cfg, ConfigSource::EnvInline));
    }

    for candidate in DEFAULT_CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            let cfg = load_from_file(path)
                .with_context(|| format!("loading config from default candidate {candidate}"))?;
            return Ok((cfg, ConfigSource::File(path.to_path_buf())));
        }
    }

    Ok((EngineConfig::default(), ConfigSource::Default))
}

/// Loads and parses a config file, dispatching on extension (`.json` parses
/// as JSON, anything else as TOML).
pub fn load_from_file(path: &Path) -> Result<EngineConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let format = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        Format::Json
    } else {
        Format::Toml
    };
    parse_str(&raw, format)
}

enum Format {
    Toml,
    Json,
}

fn parse_str(raw: &str, format: Format) -> Result<EngineConfig> {
    match format {
        Format::Toml => toml::from_str(raw).context("parsing TOML config"),
        Format::Json => serde_json::from_str(raw).context("parsing JSON config"),
    }
}

/// Validates every enabled vault in the config, failing on the first
/// invalid one (spec.md §7, "Configuration invalid" -> `new_vault` fails
/// fast, no tasks spawned).
pub fn validate(config: &EngineConfig) -> Result<()> {
    let mut seen_ids = std::collections::HashSet::new();
    for vault in &config.vaults {
        if !vault.enabled {
            continue;
        }
        vault.validate()?;
        if !seen_ids.insert(vault.id.clone()) {
            anyhow::bail!("duplicate vault id `{}`", vault.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StorageConfig, VaultConfig};

    #[test]
    fn default_when_nothing_configured() {
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_CONFIG_INLINE);
        let (cfg, source) = load_from_env().unwrap();
        assert!(cfg.vaults.is_empty());
        assert!(matches!(source, ConfigSource::Default) || matches!(source, ConfigSource::File(_)));
    }

    #[test]
    fn inline_json_round_trips() {
        let json = r#"{"server":{"host":"0.0.0.0","port":9000},"vaults":[]}"#;
        let cfg = parse_str(json, Format::Json).unwrap();
        assert_eq!(cfg.server.port, 9000);
    }

    #[test]
    fn validate_rejects_missing_storage_path() {
        let mut cfg = EngineConfig::default();
        cfg.vaults.push(VaultConfig {
            id: "notes".into(),
            storage: StorageConfig::Local { path: PathBuf::new() },
            ..Default::default()
        });
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn validate_accepts_existing_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = EngineConfig::default();
        cfg.vaults.push(VaultConfig {
            id: "notes".into(),
            storage: StorageConfig::Local {
                path: dir.path().to_path_buf(),
            },
            ..Default::default()
        });
        assert!(validate(&cfg).is_ok());
    }
}
