//! Error types for the cleanup engine and its configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while running a cleanup.
#[derive(Error, Debug)]
pub enum CleanupError {
    /// A fixpoint loop hit its round cap without settling.
    ///
    /// Records produced before the cap was hit stay in the output list.
    #[error("{phase} did not settle after {rounds} rounds")]
    FixpointNotReached {
        /// Phase that was iterating.
        phase: &'static str,
        /// Rounds run before giving up.
        rounds: usize,
    },

    /// The dedicated worker pool could not be started.
    #[error("failed to start cleanup worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Engine settings were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}
