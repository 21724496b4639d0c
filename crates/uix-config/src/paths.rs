//! Storage directory layout.
//!
//! ```text
//! ~/.homebridge/                  (storage path, or $UIX_STORAGE_PATH)
//! ├── config.json                 (live document, or $UIX_CONFIG_PATH)
//! ├── config.json.<millis>        (legacy backups, migrated at startup)
//! └── backups/
//!     └── config-backups/
//!         └── config.json.<millis>
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the storage directory.
pub const STORAGE_PATH_ENV: &str = "UIX_STORAGE_PATH";
/// Environment variable overriding the config document path.
pub const CONFIG_PATH_ENV: &str = "UIX_CONFIG_PATH";

/// File name of the live config document.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Where the config document and its backups live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    storage_path: PathBuf,
    config_path: PathBuf,
    backup_path: PathBuf,
}

impl StoragePaths {
    /// Resolve the layout from the environment.
    ///
    /// Checks `$UIX_STORAGE_PATH` first, then falls back to
    /// `$HOME/.homebridge`. `$UIX_CONFIG_PATH` overrides only the document
    /// path.
    ///
    /// # Errors
    ///
    /// Returns an error if `$UIX_STORAGE_PATH` is relative, or if it is unset
    /// and no home directory can be determined.
    pub fn resolve() -> io::Result<Self> {
        let storage_path = if let Ok(custom) = std::env::var(STORAGE_PATH_ENV) {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "UIX_STORAGE_PATH must be an absolute path",
                ));
            }
            p
        } else {
            let dirs = directories::BaseDirs::new().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "neither UIX_STORAGE_PATH nor a home directory is available",
                )
            })?;
            dirs.home_dir().join(".homebridge")
        };

        let mut paths = Self::from_storage(storage_path);
        if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
            paths.config_path = PathBuf::from(config_path);
        }
        Ok(paths)
    }

    /// Build the default layout under an explicit storage directory.
    #[must_use]
    pub fn from_storage(storage_path: impl Into<PathBuf>) -> Self {
        let storage_path = storage_path.into();
        Self {
            config_path: storage_path.join(CONFIG_FILE_NAME),
            backup_path: storage_path.join("backups").join("config-backups"),
            storage_path,
        }
    }

    /// Replace the config document path.
    #[must_use]
    pub fn with_config_path(mut self, config_path: impl Into<PathBuf>) -> Self {
        self.config_path = config_path.into();
        self
    }

    /// Replace the managed backup directory.
    #[must_use]
    pub fn with_backup_path(mut self, backup_path: impl Into<PathBuf>) -> Self {
        self.backup_path = backup_path.into();
        self
    }

    /// Primary storage directory.
    #[must_use]
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// The live config document.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Managed backup directory (before any runtime degradation).
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}
