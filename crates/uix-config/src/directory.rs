//! Plugin alias resolution.
//!
//! The block editor needs to know, for a plugin package, which alias its
//! blocks carry and whether they are accessories or platforms. That
//! knowledge belongs to whatever manages installed plugins, so it sits
//! behind the [`PluginDirectory`] trait. [`SchemaPluginDirectory`] reads it
//! from the plugin's `config.schema.json`; [`StaticPluginDirectory`] holds it
//! in memory.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::BlockKind;

/// Schema file a plugin ships to describe its config blocks.
pub const SCHEMA_FILE_NAME: &str = "config.schema.json";

/// How a plugin's blocks are identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginAlias {
    /// The alias written into each block's discriminator field. `None` when
    /// the plugin does not declare one.
    pub plugin_alias: Option<String>,
    /// Which array the blocks live in.
    pub plugin_type: BlockKind,
}

/// Resolves plugin package names to their block alias.
#[async_trait]
pub trait PluginDirectory: Send + Sync {
    /// Resolve `plugin_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PluginNotFound`] when the plugin is unknown.
    async fn resolve_alias(&self, plugin_name: &str) -> ConfigResult<PluginAlias>;
}

// ---------------------------------------------------------------------------
// StaticPluginDirectory
// ---------------------------------------------------------------------------

/// In-memory directory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPluginDirectory {
    plugins: HashMap<String, PluginAlias>,
}

impl StaticPluginDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin with an alias.
    #[must_use]
    pub fn with_plugin(
        mut self,
        plugin_name: impl Into<String>,
        alias: impl Into<String>,
        kind: BlockKind,
    ) -> Self {
        self.plugins.insert(
            plugin_name.into(),
            PluginAlias {
                plugin_alias: Some(alias.into()),
                plugin_type: kind,
            },
        );
        self
    }

    /// Register a plugin exactly as given, including one without an alias.
    pub fn insert(&mut self, plugin_name: impl Into<String>, alias: PluginAlias) {
        self.plugins.insert(plugin_name.into(), alias);
    }
}

#[async_trait]
impl PluginDirectory for StaticPluginDirectory {
    async fn resolve_alias(&self, plugin_name: &str) -> ConfigResult<PluginAlias> {
        self.plugins
            .get(plugin_name)
            .cloned()
            .ok_or_else(|| ConfigError::PluginNotFound {
                plugin: plugin_name.to_owned(),
                message: "not installed".to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// SchemaPluginDirectory
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaHeader {
    plugin_alias: Option<String>,
    plugin_type: Option<String>,
}

/// Reads `<search path>/<plugin>/config.schema.json`.
///
/// Search paths are tried in order; the first one holding the plugin wins.
#[derive(Debug, Clone, Default)]
pub struct SchemaPluginDirectory {
    search_paths: Vec<PathBuf>,
}

impl SchemaPluginDirectory {
    /// Create a directory over the given plugin install roots (typically
    /// `node_modules` directories).
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// The configured install roots.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

/// Plugin names are package names, optionally scoped (`@scope/name`). Anything
/// that could escape the search path is refused.
fn is_safe_plugin_name(plugin_name: &str) -> bool {
    !plugin_name.is_empty()
        && Path::new(plugin_name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl PluginDirectory for SchemaPluginDirectory {
    async fn resolve_alias(&self, plugin_name: &str) -> ConfigResult<PluginAlias> {
        let not_found = |message: String| ConfigError::PluginNotFound {
            plugin: plugin_name.to_owned(),
            message,
        };

        if !is_safe_plugin_name(plugin_name) {
            return Err(not_found("invalid plugin name".to_owned()));
        }

        for root in &self.search_paths {
            let path = root.join(plugin_name).join(SCHEMA_FILE_NAME);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(not_found(format!("{}: {e}", path.display()))),
            };

            let header: SchemaHeader = serde_json::from_slice(&bytes)
                .map_err(|e| not_found(format!("{}: {e}", path.display())))?;

            let plugin_type = match header.plugin_type.as_deref() {
                Some("accessory") => BlockKind::Accessory,
                _ => BlockKind::Platform,
            };
            debug!(
                plugin = plugin_name,
                path = %path.display(),
                %plugin_type,
                "Resolved plugin alias"
            );
            return Ok(PluginAlias {
                plugin_alias: header.plugin_alias,
                plugin_type,
            });
        }

        Err(not_found(format!("no {SCHEMA_FILE_NAME} in any plugin path")))
    }
}
