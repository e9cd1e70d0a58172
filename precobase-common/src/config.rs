//! Configuration loading and data directory resolution
//!
//! Every Precobase module resolves its data directory with the same
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-module TOML configuration file contents
///
/// Lives at `~/.config/precobase/<module>.toml` (platform-dependent).
/// All fields are optional; absent fields fall back to defaults or to
/// the next resolution tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data directory override (tier 3 of data-dir resolution)
    pub data_dir: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// API key for the external completion service
    pub completion_api_key: Option<String>,

    /// Base URL of the completion service endpoint
    pub completion_base_url: Option<String>,

    /// Model identifier requested from the completion service
    pub completion_model: Option<String>,
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "precobase_in=debug")
    pub level: Option<String>,
}

/// Path of the per-module configuration file for this platform
pub fn config_file_path(module: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("precobase").join(format!("{}.toml", module)))
}

/// Load the per-module TOML config, falling back to defaults
///
/// A missing or unreadable file is not an error: modules must start
/// with zero configuration.
pub fn load_toml_config(module: &str) -> TomlConfig {
    let Some(path) = config_file_path(module) else {
        return TomlConfig::default();
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded TOML config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed TOML config");
                TomlConfig::default()
            }
        },
        Err(_) => TomlConfig::default(),
    }
}

/// Write the TOML config back to disk (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;

    Ok(())
}

/// Resolve the data directory for a module
///
/// Priority: CLI argument, then `env_var_name`, then the TOML config,
/// then the platform default.
pub fn resolve_data_dir(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_dir {
        return PathBuf::from(path);
    }

    default_data_dir()
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/precobase (or /var/lib/precobase system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("precobase"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/precobase"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("precobase"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/precobase"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("precobase"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\precobase"))
    } else {
        PathBuf::from("./precobase_data")
    }
}

/// Create the data directory if it does not exist
pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)?;
        tracing::info!(path = %data_dir.display(), "Created data directory");
    }
    Ok(())
}

/// Database file path inside the data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("precobase.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_takes_priority() {
        let config = TomlConfig {
            data_dir: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_data_dir(Some("/from/cli"), "PRECOBASE_TEST_UNSET", &config);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn toml_used_when_cli_and_env_absent() {
        let config = TomlConfig {
            data_dir: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_data_dir(None, "PRECOBASE_TEST_UNSET", &config);
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }

    #[test]
    fn default_when_nothing_configured() {
        let resolved = resolve_data_dir(None, "PRECOBASE_TEST_UNSET", &TomlConfig::default());
        assert!(resolved.to_string_lossy().contains("precobase"));
    }

    #[test]
    fn write_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precobase-in.toml");

        let config = TomlConfig {
            completion_api_key: Some("test-key".to_string()),
            completion_model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };
        write_toml_config(&config, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let reloaded: TomlConfig = toml::from_str(&content).unwrap();
        assert_eq!(reloaded.completion_api_key.as_deref(), Some("test-key"));
        assert_eq!(reloaded.completion_model.as_deref(), Some("gpt-4o-mini"));
    }
}
