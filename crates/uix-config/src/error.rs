//! Config store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from config store operations.
///
/// Structural defects in a document are never errors: the normalizer repairs
/// them. What remains are rejected requests, missing backups and I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The request was rejected before any state changed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The plugin directory could not resolve the plugin.
    #[error("plugin {plugin} could not be resolved: {message}")]
    PluginNotFound {
        /// Plugin package name that was looked up.
        plugin: String,
        /// Why resolution failed.
        message: String,
    },

    /// The requested backup does not exist.
    #[error("backup {0} not found")]
    BackupNotFound(String),

    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A file was read but is not valid JSON.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        /// Path that failed.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The config document could not be written.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A value could not be encoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    /// Whether the error was caused by the caller's request rather than the
    /// host. Transports answer these with a rejected-request status.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::BadRequest(_) | Self::PluginNotFound { .. })
    }

    /// Whether the error reports a missing backup.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BackupNotFound(_))
    }
}

/// Result type for config store operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
