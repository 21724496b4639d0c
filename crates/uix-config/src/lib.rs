#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::arithmetic_side_effects))]
//! Config file store for the uix bridge console.
//!
//! This crate owns the bridge's single JSON config document: it repairs
//! every document before it is saved, keeps a timestamped backup of each
//! previous version, prunes old backups daily, and edits the config blocks
//! that belong to one plugin.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uix_config::{ConfigService, SchemaPluginDirectory, StoragePaths, StoreSettings};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = StoragePaths::resolve()?;
//! let directory = Arc::new(SchemaPluginDirectory::new(vec![
//!     "/usr/local/lib/node_modules".into(),
//! ]));
//! let service = ConfigService::start(&paths, StoreSettings::default(), directory).await;
//!
//! let mut config = service.read_config().await?;
//! config.as_map_mut().insert("mdns".into(), serde_json::json!({"interface": "eth0"}));
//! let saved = service.write_config(config).await?;
//! println!("bridge {} on port {}", saved.bridge.name, saved.bridge.port);
//! # Ok(())
//! # }
//! ```
//!
//! # Layout
//!
//! - [`normalize`] turns any JSON value into a valid [`ConfigDocument`].
//! - [`BackupStore`] lists, reads, prunes and takes backups.
//! - [`ConfigStore`] reads and saves the live document.
//! - [`PluginBlockEditor`] edits one plugin's blocks and the plugin lists.
//! - [`RetentionScheduler`] and [`migrate_legacy_backups`] run in the
//!   background and at startup.
//! - [`ConfigService`] ties them together.

/// Timestamped backups of the config document.
pub mod backup;
/// Cleanup of child bridge settings on plugin blocks.
pub mod child_bridge;
/// Runtime snapshot of the last saved document.
pub mod context;
/// Plugin alias resolution.
pub mod directory;
/// Plugin-scoped document edits.
pub mod editor;
/// Config store error types.
pub mod error;
/// Legacy backup migration.
pub mod migrate;
/// Document repair rules.
pub mod normalize;
/// Storage directory layout.
pub mod paths;
/// Daily backup retention.
pub mod scheduler;
/// The assembled config service.
pub mod service;
/// Reading and saving the live document.
pub mod store;
/// Document and settings types.
pub mod types;

// Re-export primary types at the crate root.
pub use backup::{BackupRecord, BackupStore};
pub use context::{ConfigContext, ConfigSnapshot};
pub use directory::{PluginAlias, PluginDirectory, SchemaPluginDirectory, StaticPluginDirectory};
pub use editor::PluginBlockEditor;
pub use error::{ConfigError, ConfigResult};
pub use migrate::{MigrationReport, migrate_legacy_backups};
pub use normalize::{Prior, normalize};
pub use paths::StoragePaths;
pub use scheduler::{RetentionScheduler, RetentionTask};
pub use service::ConfigService;
pub use store::ConfigStore;
pub use types::*;
