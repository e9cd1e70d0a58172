//! Configuration resolution for precobase-in
//!
//! Completion-service settings resolve with Database -> ENV -> TOML
//! priority: the settings table is authoritative so operators can rotate
//! credentials without touching the deployment, environment variables
//! cover deployments, and the TOML file is the local-development
//! fallback. Rotated credentials are picked up at the next startup.

use std::collections::HashMap;
use std::path::Path;

use precobase_common::config::TomlConfig;
use precobase_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

use crate::classifier::completion::{CompletionConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::db;

pub const ENV_API_KEY: &str = "PRECOBASE_COMPLETION_API_KEY";
pub const ENV_BASE_URL: &str = "PRECOBASE_COMPLETION_BASE_URL";
pub const ENV_MODEL: &str = "PRECOBASE_COMPLETION_MODEL";

/// Resolve completion API key from 3-tier configuration
///
/// **Priority:** Database -> ENV -> TOML
pub async fn resolve_completion_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = db::settings::get_completion_api_key(db).await?;
    if let Some(key) = &db_key {
        if is_valid_key(key) {
            sources.push("database");
        }
    }

    // Tier 2: Environment variable
    let env_key = std::env::var(ENV_API_KEY).ok();
    if let Some(key) = &env_key {
        if is_valid_key(key) {
            sources.push("environment");
        }
    }

    // Tier 3: TOML config
    let toml_key = toml_config.completion_api_key.as_ref();
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            sources.push("TOML");
        }
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Completion API key found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    // Resolution priority
    if let Some(key) = db_key {
        if is_valid_key(&key) {
            info!("Completion API key loaded from database");
            return Ok(key);
        }
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("Completion API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("Completion API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    // No valid key found
    Err(Error::Config(
        "Completion API key not configured. Please configure using one of:\n\
         1. Settings table: INSERT INTO settings (key, value) VALUES ('completion_api_key', 'sk-...')\n\
         2. Environment: PRECOBASE_COMPLETION_API_KEY=sk-...\n\
         3. TOML config: ~/.config/precobase/precobase-in.toml (completion_api_key = \"sk-...\")"
            .to_string(),
    ))
}

/// Assemble the full completion-service configuration. Base URL and
/// model resolve through the same tiers as the key but fall back to
/// built-in defaults instead of erroring.
pub async fn resolve_completion_config(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<CompletionConfig> {
    let api_key = resolve_completion_api_key(db, toml_config).await?;

    let base_url = first_valid([
        db::settings::get_completion_base_url(db).await?,
        std::env::var(ENV_BASE_URL).ok(),
        toml_config.completion_base_url.clone(),
    ])
    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let model = first_valid([
        db::settings::get_completion_model(db).await?,
        std::env::var(ENV_MODEL).ok(),
        toml_config.completion_model.clone(),
    ])
    .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    info!(base_url = %base_url, model = %model, "Completion service configured");
    Ok(CompletionConfig { base_url, api_key, model, ..CompletionConfig::default() })
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn first_valid(tiers: [Option<String>; 3]) -> Option<String> {
    tiers.into_iter().flatten().find(|value| is_valid_key(value))
}

/// Sync settings from database to TOML file
///
/// HashMap keys: "completion_api_key", "completion_base_url",
/// "completion_model". Unknown keys are ignored.
pub async fn sync_settings_to_toml(
    settings: HashMap<String, String>,
    toml_path: &Path,
) -> Result<()> {
    // Read existing TOML (or use defaults)
    let mut config = if toml_path.exists() {
        let content = std::fs::read_to_string(toml_path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str::<TomlConfig>(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?
    } else {
        TomlConfig::default()
    };

    // Update fields from HashMap
    if let Some(key) = settings.get("completion_api_key") {
        config.completion_api_key = Some(key.clone());
    }
    if let Some(url) = settings.get("completion_base_url") {
        config.completion_base_url = Some(url.clone());
    }
    if let Some(model) = settings.get("completion_model") {
        config.completion_model = Some(model.clone());
    }

    // Write atomically (best-effort)
    match precobase_common::config::write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Settings synced to TOML: {}", toml_path.display());
            Ok(())
        }
        Err(e) => {
            warn!("TOML write failed (database write succeeded): {}", e);
            Ok(()) // Graceful degradation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(ENV_API_KEY);
        std::env::remove_var(ENV_BASE_URL);
        std::env::remove_var(ENV_MODEL);
    }

    #[tokio::test]
    #[serial]
    async fn database_key_wins_over_environment() {
        clear_env();
        let pool = test_pool().await;
        db::settings::set_completion_api_key(&pool, "sk-from-db".to_string()).await.unwrap();
        std::env::set_var(ENV_API_KEY, "sk-from-env");

        let key = resolve_completion_api_key(&pool, &TomlConfig::default()).await.unwrap();
        assert_eq!(key, "sk-from-db");
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn environment_key_used_when_database_empty() {
        clear_env();
        let pool = test_pool().await;
        std::env::set_var(ENV_API_KEY, "sk-from-env");

        let key = resolve_completion_api_key(&pool, &TomlConfig::default()).await.unwrap();
        assert_eq!(key, "sk-from-env");
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn toml_key_is_last_resort_and_blank_keys_are_skipped() {
        clear_env();
        let pool = test_pool().await;
        // Whitespace-only database key does not count
        db::settings::set_completion_api_key(&pool, "   ".to_string()).await.unwrap();

        let mut toml_config = TomlConfig::default();
        toml_config.completion_api_key = Some("sk-from-toml".to_string());

        let key = resolve_completion_api_key(&pool, &toml_config).await.unwrap();
        assert_eq!(key, "sk-from-toml");
    }

    #[tokio::test]
    #[serial]
    async fn missing_key_is_a_config_error() {
        clear_env();
        let pool = test_pool().await;
        let result = resolve_completion_api_key(&pool, &TomlConfig::default()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn sync_merges_keys_into_existing_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precobase-in.toml");

        let mut first = HashMap::new();
        first.insert("completion_api_key".to_string(), "sk-new".to_string());
        sync_settings_to_toml(first, &path).await.unwrap();

        // A second sync for a different key keeps the first one
        let mut second = HashMap::new();
        second.insert("completion_model".to_string(), "gpt-4o".to_string());
        sync_settings_to_toml(second, &path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let reloaded: TomlConfig = toml::from_str(&content).unwrap();
        assert_eq!(reloaded.completion_api_key.as_deref(), Some("sk-new"));
        assert_eq!(reloaded.completion_model.as_deref(), Some("gpt-4o"));
    }

    #[tokio::test]
    #[serial]
    async fn base_url_and_model_fall_back_to_defaults() {
        clear_env();
        let pool = test_pool().await;
        db::settings::set_completion_api_key(&pool, "sk-test".to_string()).await.unwrap();

        let config = resolve_completion_config(&pool, &TomlConfig::default()).await.unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key, "sk-test");
    }
}
