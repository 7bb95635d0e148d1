//! Config validation: required groups and value ranges.

use crate::config::{AppConfig, DEFAULT_GROUP};
use crate::error::ConfigError;
use crate::file::KNOWN_MODES;

const MAX_NODE_ID: u16 = 1023;

pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if !config.database.contains_key(DEFAULT_GROUP) {
        return Err(ConfigError::Invalid(format!(
            "database group '{}' is required",
            DEFAULT_GROUP
        )));
    }
    for (name, db) in &config.database {
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid(format!(
                "database.{}.max_connections must be at least 1",
                name
            )));
        }
    }
    if config.core.node_id > MAX_NODE_ID {
        return Err(ConfigError::Invalid(format!(
            "core.node_id must be at most {}",
            MAX_NODE_ID
        )));
    }
    if !KNOWN_MODES.contains(&config.core.file.mode.as_str()) {
        return Err(ConfigError::UnknownFileMode(config.core.file.mode.clone()));
    }
    if config.cache.enable && config.cache.expire_ms == 0 {
        return Err(ConfigError::Invalid("cache.expire_ms must be positive".into()));
    }
    Ok(())
}
