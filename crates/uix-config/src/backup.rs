//! Timestamped snapshots of the config document.
//!
//! Every save renames the outgoing document into the backup directory as
//! `config.json.<epoch-millis>`. There is no index file; the directory
//! listing is the index, and the timestamp embedded in the file name is the
//! identity of a backup.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{CONFIG_FILE_NAME, StoragePaths};

static BACKUP_FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^config\.json\.(\d{1,15})$").expect("invalid regex"));

/// One backup file in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    /// The epoch-millis part of the file name, as written.
    pub id: String,
    /// When the backup was taken.
    pub timestamp: DateTime<Utc>,
    /// File name inside the backup directory.
    pub filename: String,
}

impl BackupRecord {
    /// Parse a backup file name. Returns `None` for anything that is not
    /// `config.json.<millis>` with a representable timestamp.
    #[must_use]
    pub fn parse(filename: &str) -> Option<Self> {
        let id = BACKUP_FILE_PATTERN.captures(filename)?.get(1)?.as_str();
        let millis = id.parse::<i64>().ok()?;
        let timestamp = DateTime::from_timestamp_millis(millis)?;
        Some(Self {
            id: id.to_owned(),
            timestamp,
            filename: filename.to_owned(),
        })
    }
}

/// File name for a backup taken at `timestamp`.
#[must_use]
pub fn backup_file_name(timestamp: DateTime<Utc>) -> String {
    format!("{CONFIG_FILE_NAME}.{}", timestamp.timestamp_millis())
}

/// Path in `dir` for a backup taken at `timestamp`. A name that is already
/// taken moves to the next free millisecond, so saves within the same
/// millisecond keep every backup.
async fn free_backup_target(dir: &Path, timestamp: DateTime<Utc>) -> PathBuf {
    let mut millis = timestamp.timestamp_millis();
    loop {
        let target = dir.join(format!("{CONFIG_FILE_NAME}.{millis}"));
        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return target;
        }
        match millis.checked_add(1) {
            Some(next) => millis = next,
            None => return target,
        }
    }
}

/// Owns the backup directory.
///
/// The directory may be swapped for the storage directory at runtime if it
/// cannot be created, hence the lock around it.
#[derive(Debug)]
pub struct BackupStore {
    storage_path: PathBuf,
    backup_path: RwLock<PathBuf>,
}

impl BackupStore {
    /// Create a store for the backup directory of `paths`. Nothing is
    /// touched on disk until [`ensure_backup_path`](Self::ensure_backup_path).
    #[must_use]
    pub fn new(paths: &StoragePaths) -> Self {
        Self {
            storage_path: paths.storage_path().to_path_buf(),
            backup_path: RwLock::new(paths.backup_path().to_path_buf()),
        }
    }

    /// The primary storage directory.
    #[must_use]
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// The directory backups are currently written to.
    pub async fn backup_path(&self) -> PathBuf {
        self.backup_path.read().await.clone()
    }

    /// Whether backups go to a directory of their own.
    pub async fn has_dedicated_path(&self) -> bool {
        *self.backup_path.read().await != self.storage_path
    }

    /// Create the backup directory.
    ///
    /// On failure backups fall back to the storage directory for the rest of
    /// the process. Never fails.
    pub async fn ensure_backup_path(&self) {
        let mut backup_path = self.backup_path.write().await;
        if let Err(e) = tokio::fs::create_dir_all(&*backup_path).await {
            error!(
                path = %backup_path.display(),
                error = %e,
                "Could not create directory for config backups"
            );
            error!(
                path = %self.storage_path.display(),
                "Config backups will continue to use the storage directory"
            );
            backup_path.clone_from(&self.storage_path);
        }
    }

    /// All backups, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be listed.
    pub async fn list_backups(&self) -> ConfigResult<Vec<BackupRecord>> {
        let dir = self.backup_path().await;
        scan_backup_files(&dir)
            .await
            .map_err(|source| ConfigError::ReadError { path: dir, source })
    }

    /// Raw contents of the backup with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BackupNotFound`] if no such backup exists or the
    /// id is not a timestamp, and a read error for other IO failures.
    pub async fn get_backup(&self, id: &str) -> ConfigResult<Vec<u8>> {
        let filename = format!("{CONFIG_FILE_NAME}.{id}");
        if BackupRecord::parse(&filename).is_none() {
            return Err(ConfigError::BackupNotFound(id.to_owned()));
        }

        let path = self.backup_path().await.join(filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ConfigError::BackupNotFound(id.to_owned()))
            },
            Err(source) => Err(ConfigError::ReadError { path, source }),
        }
    }

    /// Delete every backup. A file that cannot be removed is logged and
    /// skipped. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backup directory cannot be listed.
    pub async fn delete_all_backups(&self) -> ConfigResult<usize> {
        let dir = self.backup_path().await;
        let backups = self.list_backups().await?;

        let mut removed = 0usize;
        for backup in &backups {
            let path = dir.join(&backup.filename);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed = removed.saturating_add(1),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete config backup");
                },
            }
        }

        info!(removed, total = backups.len(), "Deleted config backups");
        Ok(removed)
    }

    /// Remove backups at least `days` calendar days old, judged in local
    /// time. Never fails; problems are logged. Returns how many were removed.
    pub async fn prune_older_than(&self, days: u32) -> usize {
        self.prune_older_than_at(days, Local::now()).await
    }

    /// [`prune_older_than`](Self::prune_older_than) against an explicit
    /// clock. The calendar of `now`'s time zone decides the day boundaries.
    pub async fn prune_older_than_at<Tz: TimeZone>(&self, days: u32, now: DateTime<Tz>) -> usize {
        let dir = self.backup_path().await;
        let backups = match scan_backup_files(&dir).await {
            Ok(backups) => backups,
            Err(e) => {
                warn!(
                    path = %dir.display(),
                    error = %e,
                    "Failed to cleanup old config.json backup files"
                );
                return 0;
            },
        };

        let today = now.date_naive();
        let mut removed = 0usize;
        for backup in backups {
            let taken = backup.timestamp.with_timezone(&now.timezone()).date_naive();
            let age = today.signed_duration_since(taken).num_days();
            if age < i64::from(days) {
                continue;
            }

            let path = dir.join(&backup.filename);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to cleanup old config.json backup files"
                );
                return removed;
            }
            debug!(path = %path.display(), age_days = age, "Removed expired config backup");
            removed = removed.saturating_add(1);
        }

        if removed > 0 {
            info!(removed, days, "Pruned old config backups");
        }
        removed
    }

    /// Move the live document at `config_path` into the backup directory.
    ///
    /// Returns the backup's path, or `None` if no backup was made. A missing
    /// document (first run) only ensures the backup directory exists; any
    /// other failure is logged and swallowed, since losing a backup must not
    /// block a save.
    pub async fn snapshot(&self, config_path: &Path, now: DateTime<Utc>) -> Option<PathBuf> {
        let target = free_backup_target(&self.backup_path().await, now).await;

        match tokio::fs::rename(config_path, &target).await {
            Ok(()) => return Some(target),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Either the document or the backup directory is missing.
                self.ensure_backup_path().await;
            },
            Err(e) => {
                warn!(
                    path = %target.display(),
                    error = %e,
                    "Could not create a backup of the config.json file"
                );
                return None;
            },
        }

        if !tokio::fs::try_exists(config_path).await.unwrap_or(false) {
            return None;
        }

        let target = free_backup_target(&self.backup_path().await, now).await;
        match tokio::fs::rename(config_path, &target).await {
            Ok(()) => Some(target),
            Err(e) => {
                warn!(
                    path = %target.display(),
                    error = %e,
                    "Could not create a backup of the config.json file"
                );
                None
            },
        }
    }
}

/// List backup-shaped files directly inside `dir`, newest first.
///
/// Ordering is by the parsed timestamp, so names of different widths still
/// sort chronologically.
pub(crate) async fn scan_backup_files(dir: &Path) -> io::Result<Vec<BackupRecord>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut backups = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Some(record) = entry.file_name().to_str().and_then(BackupRecord::parse) {
            backups.push(record);
        }
    }
    backups.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.filename.cmp(&a.filename))
    });
    Ok(backups)
}
