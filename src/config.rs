//! Application configuration for the command-line front end
//!
//! Stored as JSON next to the settings file. Everything has a default, so
//! an empty object (or a missing file) is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::validation::{MAX_WATCH_INTERVAL_MS, MIN_WATCH_INTERVAL_MS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Settings file to use instead of the default location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,

    /// How often `watch` re-reads the settings file
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_watch_interval_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            settings_path: None,
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load from `path`, writing out a default config if none exists
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found, creating default config at {:?}", path);
            let config = AppConfig::default();
            config.save(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let mut config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
        config.validate_and_clamp();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;

        info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate_and_clamp(&mut self) {
        if self.watch_interval_ms < MIN_WATCH_INTERVAL_MS {
            warn!(
                watch_interval_ms = self.watch_interval_ms,
                min = MIN_WATCH_INTERVAL_MS,
                "watch_interval_ms below minimum, clamping"
            );
            self.watch_interval_ms = MIN_WATCH_INTERVAL_MS;
        } else if self.watch_interval_ms > MAX_WATCH_INTERVAL_MS {
            warn!(
                watch_interval_ms = self.watch_interval_ms,
                max = MAX_WATCH_INTERVAL_MS,
                "watch_interval_ms exceeds maximum, clamping"
            );
            self.watch_interval_ms = MAX_WATCH_INTERVAL_MS;
        }
    }

    /// Settings file location, honouring the override
    pub fn settings_path(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(crate::provider::JsonFileSettings::default_path)
    }
}
