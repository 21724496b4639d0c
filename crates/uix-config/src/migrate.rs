//! One-time move of legacy backups into the backup directory.
//!
//! Older releases wrote `config.json.<millis>` next to the live document.
//! At startup the newest of those are moved into the managed backup
//! directory and the rest are deleted. Later runs find nothing to do.

use std::io;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::backup::{BackupStore, scan_backup_files};

/// What a migration pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Backups moved into the backup directory.
    pub moved: usize,
    /// Backups beyond the cap that were deleted.
    pub removed: usize,
}

/// Move the newest `cap` legacy backups from the storage directory into the
/// backup directory and delete the rest.
///
/// Skipped when backups already live in the storage directory. Never fails;
/// problems are logged and the pass continues with the next file.
pub async fn migrate_legacy_backups(backups: &BackupStore, cap: usize) -> MigrationReport {
    let mut report = MigrationReport::default();
    if !backups.has_dedicated_path().await {
        debug!("Backups use the storage directory; skipping legacy backup migration");
        return report;
    }

    let storage = backups.storage_path();
    let target = backups.backup_path().await;
    let legacy = match scan_backup_files(storage).await {
        Ok(legacy) => legacy,
        Err(e) => {
            error!(
                path = %storage.display(),
                error = %e,
                "Failed to migrate config.json backups to new location"
            );
            return report;
        },
    };

    for (index, record) in legacy.iter().enumerate() {
        let source = storage.join(&record.filename);
        if index < cap {
            let dest = target.join(&record.filename);
            match move_file(&source, &dest).await {
                Ok(()) => report.moved = report.moved.saturating_add(1),
                Err(e) => {
                    warn!(
                        path = %source.display(),
                        error = %e,
                        "Failed to move legacy config backup"
                    );
                },
            }
        } else {
            match tokio::fs::remove_file(&source).await {
                Ok(()) => report.removed = report.removed.saturating_add(1),
                Err(e) => {
                    warn!(
                        path = %source.display(),
                        error = %e,
                        "Failed to remove legacy config backup"
                    );
                },
            }
        }
    }

    if report != MigrationReport::default() {
        info!(
            moved = report.moved,
            removed = report.removed,
            path = %target.display(),
            "Migrated legacy config backups"
        );
    }
    report
}

/// Rename `source` onto `dest`, replacing it. Falls back to copy and delete
/// when the two are on different file systems.
async fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
    if tokio::fs::rename(source, dest).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(source, dest).await?;
    tokio::fs::remove_file(source).await
}
