//! Configuration management.
//!
//! Settings come from four layers, highest priority first:
//!
//! 1. CLI flags
//! 2. Environment variables (`SFS_*`, `OLLAMA_*`, `HF_*`)
//! 3. `~/.storefront-search/config.json`
//! 4. Built-in defaults
//!
//! The database lives at `~/.storefront-search/data/catalog.db` unless
//! `--db` or `SFS_DB` says otherwise.

use crate::embeddings::EmbeddingSettings;
use crate::error::{Error, Result};
use crate::search::SearchOptions;
use crate::store::DistanceMetric;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default embedding timeout in milliseconds.
pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 30_000;

/// Default store timeout in milliseconds.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 10_000;

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<EmbeddingSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSettings>,
}

/// Search settings stored in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<DistanceMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_timeout_ms: Option<u64>,
}

/// Get the global storefront-search directory (`~/.storefront-search/`).
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".storefront-search"))
}

/// Get the config file path.
///
/// # Errors
///
/// Returns `Config` if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    global_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the configuration; a missing file yields the defaults.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load the configuration from an explicit path.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the configuration.
///
/// # Errors
///
/// Returns `Config` if the file cannot be written.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(&config_path()?, config)
}

/// Save the configuration to an explicit path, creating parent directories.
///
/// # Errors
///
/// Returns `Config` if the file cannot be written.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
}

/// Read a non-empty environment variable.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `SFS_DB` environment variable
/// 3. Global location: `~/.storefront-search/data/catalog.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(db_path) = env_var("SFS_DB") {
        return Some(PathBuf::from(db_path));
    }

    global_dir().map(|dir| dir.join("data").join("catalog.db"))
}

/// Resolve the distance metric: flag > `SFS_METRIC` > config > Euclidean.
///
/// # Errors
///
/// Returns `Config` if `SFS_METRIC` names an unknown metric.
pub fn resolve_metric(explicit: Option<DistanceMetric>, config: &AppConfig) -> Result<DistanceMetric> {
    if let Some(metric) = explicit {
        return Ok(metric);
    }

    if let Some(raw) = env_var("SFS_METRIC") {
        return raw.parse().map_err(|e| Error::Config(format!("SFS_METRIC: {e}")));
    }

    Ok(config
        .search
        .as_ref()
        .and_then(|s| s.metric)
        .unwrap_or_default())
}

fn resolve_timeout_ms(env: &str, configured: Option<u64>, default: u64) -> Result<u64> {
    if let Some(raw) = env_var(env) {
        return raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{env} must be a whole number of milliseconds, got '{raw}'")));
    }
    Ok(configured.unwrap_or(default))
}

/// Resolve search timeouts: env > config > defaults (30 s embed, 10 s store).
///
/// # Errors
///
/// Returns `Config` if a timeout variable is not a number.
pub fn resolve_search_options(config: &AppConfig) -> Result<SearchOptions> {
    let search = config.search.clone().unwrap_or_default();
    let embed_ms = resolve_timeout_ms(
        "SFS_EMBED_TIMEOUT_MS",
        search.embed_timeout_ms,
        DEFAULT_EMBED_TIMEOUT_MS,
    )?;
    let store_ms = resolve_timeout_ms(
        "SFS_STORE_TIMEOUT_MS",
        search.store_timeout_ms,
        DEFAULT_STORE_TIMEOUT_MS,
    )?;

    Ok(SearchOptions {
        embed_timeout: Duration::from_millis(embed_ms),
        store_timeout: Duration::from_millis(store_ms),
    })
}
