//! Configuration management for voice-memo.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{
        AudioConfig, DEFAULT_CATALOG_FILE, LOGS_DIR_NAME, LoggingConfig, RECORDINGS_DIR_NAME,
        StorageConfig, default_log_filter,
    },
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::Path,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Recording and catalog locations.
    pub storage: StorageConfig,
    /// Recording format.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl Config {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        let recordings_dir = data_dir.join(RECORDINGS_DIR_NAME);
        Config {
            storage: StorageConfig {
                catalog_file: recordings_dir.join(DEFAULT_CATALOG_FILE),
                recordings_dir,
            },
            audio: AudioConfig::default(),
            logging: LoggingConfig {
                filter: default_log_filter(),
                log_dir: data_dir.join(LOGS_DIR_NAME),
            },
        }
    }

    /// Load configuration from the platform config directory, creating a
    /// default if none exists.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let dirs = Self::project_dirs()?;
        Self::load_from(&dirs.config_dir().join("config.toml"), dirs.data_dir())
    }

    /// Load configuration from `config_path`. A missing file is replaced by
    /// defaults rooted at `data_dir`, which are written back.
    #[track_caller]
    #[instrument]
    pub fn load_from(config_path: &Path, data_dir: &Path) -> AppResult<Self> {
        if !config_path.exists() {
            info!("No config found, creating default");
            let config = Self::with_data_dir(data_dir);
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.validate()?;

        info!(config_path = ?config_path, "Configuration loaded");

        Ok(config)
    }

    /// Reject values that cannot work at runtime.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        if self.storage.recordings_dir.as_os_str().is_empty() {
            return Err(AppError::ConfigError {
                reason: "storage.recordings_dir must not be empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.storage.catalog_file.file_name().is_none() {
            return Err(AppError::ConfigError {
                reason: format!(
                    "storage.catalog_file must name a file: {:?}",
                    self.storage.catalog_file
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    /// Save configuration to `config_path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                debug!(config_dir = ?config_dir, "Created config directory");
            }
        }

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "voice-memo", "Voice-Memo").ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
