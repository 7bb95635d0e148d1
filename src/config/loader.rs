//! Load config from a TOML file, then apply `.env` and environment overrides.

use crate::config::types::{AppConfig, DatabaseConfig, DEFAULT_GROUP};
use crate::config::validate;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Config file used when `APP_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Parse a TOML document. Missing keys take their defaults.
pub fn parse(content: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Read `path` if it exists; a missing file yields the default config.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse(&content)
}

/// Full startup load: `.env`, config file (`APP_CONFIG` or the default path), env overrides, validation.
pub fn load() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let path = std::env::var("APP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = load_from_path(&path)?;
    apply_env(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Apply overrides from a variable lookup (injected so tests need not touch the process env).
pub fn apply_env<F>(config: &mut AppConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
        let group = config
            .database
            .entry(DEFAULT_GROUP.to_string())
            .or_insert_with(DatabaseConfig::default);
        if let Some(driver) = crate::db::driver_from_link(&url) {
            group.driver = driver;
        }
        group.link = url;
    }
    if let Some(addr) = var("SERVER_ADDRESS").filter(|s| !s.trim().is_empty()) {
        config.server.address = addr;
    }
    if let Some(flag) = var("DB_CACHE_ENABLE") {
        config.cache.enable = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
    if let Some(level) = var("LOG_LEVEL").filter(|s| !s.trim().is_empty()) {
        config.logger.level = level;
    }
    if config.database.is_empty() {
        config
            .database
            .insert(DEFAULT_GROUP.to_string(), DatabaseConfig::default());
    }
}
