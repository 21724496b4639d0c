//! Read, normalize and save the live config document.
//!
//! # Save sequence
//!
//! 1. Normalize the incoming document, reusing the previously persisted
//!    username and pin where the new ones are malformed.
//! 2. Move the current file into the backup directory.
//! 3. Write the normalized document with 4-space indentation.
//! 4. Re-parse what was written and publish it to the [`ConfigContext`].
//!
//! There is no file lock. The store assumes it is the only writer, and
//! callers that can issue concurrent saves must serialize them. A crash
//! between steps 2 and 3 leaves no live document and one extra backup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::backup::BackupStore;
use crate::context::{ConfigContext, ConfigSnapshot};
use crate::error::{ConfigError, ConfigResult};
use crate::normalize::normalize;
use crate::paths::StoragePaths;
use crate::types::{ConfigDocument, RawConfig, StoreSettings};

/// Indentation of the persisted document.
const INDENT: &[u8] = b"    ";

/// The authoritative owner of the live config document.
#[derive(Debug)]
pub struct ConfigStore {
    config_path: PathBuf,
    settings: StoreSettings,
    backups: Arc<BackupStore>,
    context: ConfigContext,
}

impl ConfigStore {
    /// Open the store and seed the runtime context from the file on disk.
    ///
    /// A missing or unreadable document gives an empty snapshot rather than
    /// an error; the first save creates the file.
    pub async fn open(
        paths: &StoragePaths,
        settings: StoreSettings,
        backups: Arc<BackupStore>,
    ) -> Self {
        let config_path = paths.config_path().to_path_buf();
        let snapshot = match read_json(&config_path).await {
            Ok(value) => ConfigSnapshot::parse(value, &settings.ui_platform),
            Err(e) => {
                debug!(error = %e, "Starting without a persisted config snapshot");
                ConfigSnapshot::empty()
            },
        };

        Self {
            config_path,
            settings,
            backups,
            context: ConfigContext::new(snapshot),
        }
    }

    /// Path of the live document.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Process-wide store settings.
    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// The backup store saves go through.
    #[must_use]
    pub fn backups(&self) -> &Arc<BackupStore> {
        &self.backups
    }

    /// Runtime view of the last saved document.
    #[must_use]
    pub fn context(&self) -> &ConfigContext {
        &self.context
    }

    /// Read the live document.
    ///
    /// Only shape is repaired (`bridge` object, block arrays); identifiers are
    /// returned exactly as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not JSON.
    pub async fn read(&self) -> ConfigResult<RawConfig> {
        let mut config = RawConfig::from_value(read_json(&self.config_path).await?);
        config.ensure_structure();
        Ok(config)
    }

    /// Normalize and save `config`, keeping the previous file as a backup.
    ///
    /// Returns the document as written.
    ///
    /// # Errors
    ///
    /// Returns an error only if the new document cannot be serialized or
    /// written. Backup failures are logged and do not stop the save.
    pub async fn write(&self, config: impl Into<RawConfig>) -> ConfigResult<ConfigDocument> {
        let previous = self.context.current();
        let doc = {
            let mut rng = rand::thread_rng();
            normalize(config.into(), &previous.prior(), &mut rng)
        };
        let bytes = to_json_pretty(&doc)?;

        if let Some(backup) = self.backups.snapshot(&self.config_path, Utc::now()).await {
            debug!(path = %backup.display(), "Backed up previous config.json");
        }

        tokio::fs::write(&self.config_path, &bytes)
            .await
            .map_err(|source| ConfigError::WriteError {
                path: self.config_path.clone(),
                source,
            })?;

        info!(path = %self.config_path.display(), "Changes to config.json saved");

        let copy = serde_json::from_slice(&bytes)?;
        self.context
            .publish(ConfigSnapshot::parse(copy, &self.settings.ui_platform));

        Ok(doc)
    }
}

/// Serialize `value` the way the live document is stored: 4-space indent,
/// trailing newline.
///
/// # Errors
///
/// Returns an error if `value` cannot be represented as JSON.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

async fn read_json(path: &Path) -> ConfigResult<serde_json::Value> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}
