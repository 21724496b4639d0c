//! The config store as one service.
//!
//! [`ConfigService`] wires the backup store, the document store, the plugin
//! block editor and the retention job together, and is the surface the
//! transport layer talks to.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::backup::{BackupRecord, BackupStore};
use crate::context::ConfigContext;
use crate::directory::PluginDirectory;
use crate::editor::PluginBlockEditor;
use crate::error::ConfigResult;
use crate::migrate::migrate_legacy_backups;
use crate::paths::StoragePaths;
use crate::scheduler::{RetentionScheduler, RetentionTask};
use crate::store::ConfigStore;
use crate::types::{ConfigBlock, ConfigDocument, RawConfig, StoreSettings};

/// Config store, backups and plugin editing behind one handle.
#[derive(Debug)]
pub struct ConfigService {
    store: Arc<ConfigStore>,
    editor: PluginBlockEditor,
    backups: Arc<BackupStore>,
    retention: Option<RetentionTask>,
}

impl ConfigService {
    /// Prepare the backup directory, migrate legacy backups and open the
    /// store. No background job is started.
    pub async fn open(
        paths: &StoragePaths,
        settings: StoreSettings,
        directory: Arc<dyn PluginDirectory>,
    ) -> Self {
        let backups = Arc::new(BackupStore::new(paths));
        backups.ensure_backup_path().await;
        migrate_legacy_backups(&backups, settings.migration_cap).await;

        let store = Arc::new(ConfigStore::open(paths, settings, Arc::clone(&backups)).await);
        let editor = PluginBlockEditor::new(Arc::clone(&store), directory);

        Self {
            store,
            editor,
            backups,
            retention: None,
        }
    }

    /// [`open`](Self::open), then start the daily retention job. The job
    /// runs until the service is dropped.
    pub async fn start(
        paths: &StoragePaths,
        settings: StoreSettings,
        directory: Arc<dyn PluginDirectory>,
    ) -> Self {
        let mut service = Self::open(paths, settings, directory).await;
        let scheduler = RetentionScheduler::new(
            Arc::clone(&service.backups),
            service.store.settings().retention_days,
        );
        info!(
            second = scheduler.second(),
            retention_days = service.store.settings().retention_days,
            "Config backup cleanup scheduled"
        );
        service.retention = Some(scheduler.spawn());
        service
    }

    /// The underlying document store.
    #[must_use]
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// The backup store.
    #[must_use]
    pub fn backups(&self) -> &Arc<BackupStore> {
        &self.backups
    }

    /// Runtime view of the last saved document.
    #[must_use]
    pub fn context(&self) -> &ConfigContext {
        self.store.context()
    }

    /// Whether the retention job is running.
    #[must_use]
    pub fn is_retention_running(&self) -> bool {
        self.retention.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Read the live document.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::read`].
    pub async fn read_config(&self) -> ConfigResult<RawConfig> {
        self.store.read().await
    }

    /// Normalize and save a document.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::write`].
    pub async fn write_config(&self, config: impl Into<RawConfig>) -> ConfigResult<ConfigDocument> {
        self.store.write(config).await
    }

    /// See [`PluginBlockEditor::get_blocks_for_plugin`].
    ///
    /// # Errors
    ///
    /// Fails for unresolvable plugins and unreadable documents.
    pub async fn get_blocks_for_plugin(&self, plugin_name: &str) -> ConfigResult<Vec<ConfigBlock>> {
        self.editor.get_blocks_for_plugin(plugin_name).await
    }

    /// See [`PluginBlockEditor::replace_blocks_for_plugin`].
    ///
    /// # Errors
    ///
    /// Fails for unresolvable plugins, malformed blocks and IO errors.
    pub async fn replace_blocks_for_plugin(
        &self,
        plugin_name: &str,
        blocks: Value,
    ) -> ConfigResult<Vec<ConfigBlock>> {
        self.editor.replace_blocks_for_plugin(plugin_name, blocks).await
    }

    /// See [`PluginBlockEditor::set_ui_property`].
    ///
    /// # Errors
    ///
    /// Fails for the `platform` property, a missing console block and IO
    /// errors.
    pub async fn set_ui_property(&self, property: &str, value: Value) -> ConfigResult<()> {
        self.editor.set_ui_property(property, value).await
    }

    /// See [`PluginBlockEditor::set_plugin_disabled`].
    ///
    /// # Errors
    ///
    /// Fails when disabling the console's own plugin, and on IO errors.
    pub async fn set_plugin_disabled(
        &self,
        plugin_name: &str,
        disabled: bool,
    ) -> ConfigResult<Vec<String>> {
        self.editor.set_plugin_disabled(plugin_name, disabled).await
    }

    /// See [`PluginBlockEditor::disable_plugin`].
    ///
    /// # Errors
    ///
    /// Fails for the console's own plugin and IO errors.
    pub async fn disable_plugin(&self, plugin_name: &str) -> ConfigResult<Vec<String>> {
        self.editor.disable_plugin(plugin_name).await
    }

    /// See [`PluginBlockEditor::enable_plugin`].
    ///
    /// # Errors
    ///
    /// Fails on IO errors.
    pub async fn enable_plugin(&self, plugin_name: &str) -> ConfigResult<Vec<String>> {
        self.editor.enable_plugin(plugin_name).await
    }

    /// All backups, newest first.
    ///
    /// # Errors
    ///
    /// Fails if the backup directory cannot be listed.
    pub async fn list_backups(&self) -> ConfigResult<Vec<BackupRecord>> {
        self.backups.list_backups().await
    }

    /// Raw contents of one backup.
    ///
    /// # Errors
    ///
    /// See [`BackupStore::get_backup`].
    pub async fn get_backup(&self, id: &str) -> ConfigResult<Vec<u8>> {
        self.backups.get_backup(id).await
    }

    /// Delete every backup. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Fails if the backup directory cannot be listed.
    pub async fn delete_all_backups(&self) -> ConfigResult<usize> {
        self.backups.delete_all_backups().await
    }
}
