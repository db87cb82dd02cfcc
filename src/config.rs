//! Cleanup configuration file
//!
//! A JSON file selecting the cleanup phases and tuning the engine. Every
//! field is optional; unknown fields are rejected.
//!
//! ```json
//! {
//!   "options": { "merge_segments": false },
//!   "dry_run": true,
//!   "block_size": 512,
//!   "threads": 4,
//!   "logging": { "level": "debug" }
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::cleanup::{CleanupOptions, WorkerPool, DEFAULT_BLOCK_SIZE};
use crate::error::{CleanupError, ConfigError};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored)
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Phases to run
    #[serde(default)]
    pub options: CleanupOptions,

    /// Report without modifying the board
    #[serde(default)]
    pub dry_run: bool,

    /// Segments per merge search task
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Dedicated worker threads; Rayon's global pool when absent
    #[serde(default)]
    pub threads: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            options: CleanupOptions::default(),
            dry_run: false,
            block_size: DEFAULT_BLOCK_SIZE,
            threads: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, malformed or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "block_size must be at least 1".to_string(),
            });
        }

        if self.threads == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "threads must be at least 1 when set".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }

    /// Worker pool described by `block_size` and `threads`
    pub fn worker_pool(&self) -> Result<WorkerPool, CleanupError> {
        self.validate()?;
        match self.threads {
            Some(threads) => WorkerPool::with_threads(self.block_size, threads),
            None => Ok(WorkerPool::new(self.block_size)),
        }
    }
}
