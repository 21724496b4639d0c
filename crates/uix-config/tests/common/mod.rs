//! Shared fixtures for config store integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use uix_config::{
    BlockKind, ConfigService, PluginAlias, StaticPluginDirectory, StoragePaths, StoreSettings,
};

pub const USERNAME: &str = "0E:AA:BB:CC:DD:EE";
pub const PIN: &str = "031-45-154";

/// A storage directory with a running service over it.
pub struct Fixture {
    pub tmp: TempDir,
    pub paths: StoragePaths,
    pub service: ConfigService,
}

impl Fixture {
    pub fn config_path(&self) -> PathBuf {
        self.paths.config_path().to_path_buf()
    }

    pub async fn file_bytes(&self) -> Vec<u8> {
        tokio::fs::read(self.paths.config_path()).await.unwrap()
    }

    pub async fn file_json(&self) -> Value {
        serde_json::from_slice(&self.file_bytes().await).unwrap()
    }

    pub async fn backup_count(&self) -> usize {
        self.service.list_backups().await.unwrap().len()
    }
}

/// Plugins known to every fixture.
pub fn directory() -> StaticPluginDirectory {
    let mut directory = StaticPluginDirectory::new()
        .with_plugin("homebridge-hue", "Hue", BlockKind::Platform)
        .with_plugin("homebridge-lamp", "Lamp", BlockKind::Accessory)
        .with_plugin("homebridge-new", "New", BlockKind::Platform)
        .with_plugin("homebridge-config-ui-x", "config", BlockKind::Platform);
    directory.insert(
        "homebridge-noalias",
        PluginAlias {
            plugin_alias: None,
            plugin_type: BlockKind::Platform,
        },
    );
    directory
}

/// A valid document with a console block and some plugin blocks.
pub fn seed_document() -> Value {
    json!({
        "bridge": {
            "name": "Homebridge DDEE",
            "username": USERNAME,
            "port": 51826,
            "pin": PIN
        },
        "accessories": [
            {"accessory": "Lamp", "name": "L1"}
        ],
        "platforms": [
            {"platform": "config", "name": "Config", "port": 8581},
            {"platform": "Hue", "name": "A"},
            {"platform": "Other", "name": "O"},
            {"platform": "homebridge-hue.Hue", "name": "B"}
        ],
        "disabledPlugins": ["homebridge-old"]
    })
}

/// Open a service over a fresh directory, optionally seeding `config.json`.
pub async fn fixture(seed: Option<Value>) -> Fixture {
    fixture_with(seed, StoreSettings::default()).await
}

/// [`fixture`] with explicit settings.
pub async fn fixture_with(seed: Option<Value>, settings: StoreSettings) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let paths = StoragePaths::from_storage(tmp.path());
    if let Some(doc) = seed {
        let text = serde_json::to_vec_pretty(&doc).unwrap();
        tokio::fs::write(paths.config_path(), text).await.unwrap();
    }
    let service = ConfigService::open(&paths, settings, Arc::new(directory())).await;
    Fixture {
        tmp,
        paths,
        service,
    }
}
