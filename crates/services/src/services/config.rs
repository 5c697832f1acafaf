use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CURRENT_CONFIG_VERSION: &str = "v1";

const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;
const DEFAULT_MAX_UPLOAD_SIZE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub config_version: String,
    pub session_ttl_hours: i64,
    pub max_upload_size_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_BYTES,
        }
    }
}

impl Config {
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Invalid config file, falling back to defaults: {}", err);
                Config::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();
        if self.session_ttl_hours < 1 {
            self.session_ttl_hours = DEFAULT_SESSION_TTL_HOURS;
        }
        if self.max_upload_size_bytes == 0 {
            self.max_upload_size_bytes = DEFAULT_MAX_UPLOAD_SIZE_BYTES;
        }
        self
    }
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &PathBuf) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found, creating one");
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &PathBuf) -> Result<(), ConfigError> {
    let normalized = config.clone().normalized();
    let raw_config = serde_json::to_string_pretty(&normalized)?;
    std::fs::write(config_path, raw_config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_raw_config_falls_back_to_defaults() {
        let config = Config::from_raw("not json at all");
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
    }

    #[test]
    fn normalized_repairs_out_of_range_values() {
        let config = Config {
            config_version: "v0".to_string(),
            session_ttl_hours: 0,
            max_upload_size_bytes: 0,
        }
        .normalized();

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(config.max_upload_size_bytes, DEFAULT_MAX_UPLOAD_SIZE_BYTES);
    }
}
