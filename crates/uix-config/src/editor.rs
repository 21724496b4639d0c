//! Plugin-scoped edits of the config document.
//!
//! A plugin's blocks are the entries of `accessories` or `platforms` whose
//! discriminator field equals the plugin's alias, either bare (`Hue`) or
//! qualified with the package name (`homebridge-hue.Hue`). Every edit reads
//! the live document, validates the request before touching it, and saves
//! through [`ConfigStore::write`].

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::child_bridge::{env_supported, sanitize_block};
use crate::directory::PluginDirectory;
use crate::error::{ConfigError, ConfigResult};
use crate::store::ConfigStore;
use crate::types::{BlockKind, ConfigBlock};

/// Edits the blocks and plugin lists of the live document.
pub struct PluginBlockEditor {
    store: Arc<ConfigStore>,
    directory: Arc<dyn PluginDirectory>,
}

impl std::fmt::Debug for PluginBlockEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginBlockEditor")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// A plugin's resolved block identity.
struct PluginBlocks<'a> {
    plugin_name: &'a str,
    alias: String,
    kind: BlockKind,
}

impl PluginBlocks<'_> {
    fn matches(&self, block: &Value) -> bool {
        let Some(id) = block.get(self.kind.field()).and_then(Value::as_str) else {
            return false;
        };
        id == self.alias
            || id
                .strip_prefix(self.plugin_name)
                .and_then(|rest| rest.strip_prefix('.'))
                == Some(self.alias.as_str())
    }
}

impl PluginBlockEditor {
    /// Create an editor over `store`, resolving aliases through `directory`.
    #[must_use]
    pub fn new(store: Arc<ConfigStore>, directory: Arc<dyn PluginDirectory>) -> Self {
        Self { store, directory }
    }

    async fn resolve<'a>(&self, plugin_name: &'a str) -> ConfigResult<PluginBlocks<'a>> {
        let resolved = self.directory.resolve_alias(plugin_name).await?;
        let alias = resolved
            .plugin_alias
            .filter(|alias| !alias.is_empty())
            .ok_or_else(|| {
                ConfigError::BadRequest("Plugin alias could not be determined.".to_owned())
            })?;
        Ok(PluginBlocks {
            plugin_name,
            alias,
            kind: resolved.plugin_type,
        })
    }

    /// The blocks belonging to `plugin_name`, in document order.
    ///
    /// # Errors
    ///
    /// Fails with a client error if the plugin or its alias cannot be
    /// resolved, or with an IO error if the document cannot be read.
    pub async fn get_blocks_for_plugin(&self, plugin_name: &str) -> ConfigResult<Vec<ConfigBlock>> {
        let plugin = self.resolve(plugin_name).await?;
        let config = self.store.read().await?;

        Ok(config
            .blocks(plugin.kind)
            .iter()
            .filter(|block| plugin.matches(block))
            .filter_map(|block| block.as_object().cloned())
            .collect())
    }

    /// Replace all of `plugin_name`'s blocks with `blocks`.
    ///
    /// `blocks` must be a JSON array of objects. Each one is stamped with the
    /// plugin's alias and has its `_bridge` settings cleaned. They are put
    /// back where the first old block was, or appended if the plugin had
    /// none. Returns the blocks as inserted.
    ///
    /// # Errors
    ///
    /// Fails with a client error for an unresolvable plugin or malformed
    /// `blocks`; nothing is written in that case.
    pub async fn replace_blocks_for_plugin(
        &self,
        plugin_name: &str,
        blocks: Value,
    ) -> ConfigResult<Vec<ConfigBlock>> {
        let plugin = self.resolve(plugin_name).await?;
        let mut config = self.store.read().await?;

        let Value::Array(items) = blocks else {
            return Err(ConfigError::BadRequest(
                "Plugin Config must be an array.".to_owned(),
            ));
        };

        let env_allowed = env_supported(&self.store.settings().host_version);
        let mut new_blocks = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(mut block) = item else {
                return Err(ConfigError::BadRequest(
                    "Plugin config must be an array of objects.".to_owned(),
                ));
            };
            block.insert(plugin.kind.field().to_owned(), Value::String(plugin.alias.clone()));
            sanitize_block(&mut block, env_allowed);
            new_blocks.push(block);
        }

        config.update_blocks(plugin.kind, |existing| {
            let position = existing.iter().position(|block| plugin.matches(block));
            existing.retain(|block| !plugin.matches(block));

            let tail = position.map_or_else(Vec::new, |index| existing.split_off(index));
            existing.extend(new_blocks.iter().cloned().map(Value::Object));
            existing.extend(tail);
        });

        self.store.write(config).await?;

        info!(
            plugin = plugin_name,
            blocks = new_blocks.len(),
            "Updated plugin config blocks"
        );
        Ok(new_blocks)
    }

    /// Set one property on the console's own platform block. A `null` or
    /// empty-string `value` removes the property.
    ///
    /// # Errors
    ///
    /// Fails with a client error for the `platform` property itself, or if
    /// the document has no console platform block.
    pub async fn set_ui_property(&self, property: &str, value: Value) -> ConfigResult<()> {
        let platform_field = BlockKind::Platform.field();
        if property == platform_field {
            return Err(ConfigError::BadRequest(
                "Cannot update the platform property.".to_owned(),
            ));
        }

        let ui_platform = self.store.settings().ui_platform.as_str();
        let mut config = self.store.read().await?;
        let remove = value.is_null() || value.as_str() == Some("");
        let found = config.update_blocks(BlockKind::Platform, |blocks| {
            let Some(block) = blocks
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .find(|block| {
                    block.get(platform_field).and_then(Value::as_str) == Some(ui_platform)
                })
            else {
                return false;
            };
            if remove {
                block.retain(|key, _| key != property);
            } else {
                block.insert(property.to_owned(), value);
            }
            true
        });
        if !found {
            return Err(ConfigError::BadRequest(format!(
                "No \"{ui_platform}\" platform block in config.json."
            )));
        }

        self.store.write(config).await?;
        Ok(())
    }

    /// Add `plugin_name` to, or remove it from, `disabledPlugins`. Returns
    /// the resulting list.
    ///
    /// # Errors
    ///
    /// Fails with a client error when disabling the console's own plugin.
    pub async fn set_plugin_disabled(
        &self,
        plugin_name: &str,
        disabled: bool,
    ) -> ConfigResult<Vec<String>> {
        if disabled {
            self.disable_plugin(plugin_name).await
        } else {
            self.enable_plugin(plugin_name).await
        }
    }

    /// Mark `plugin_name` as disabled.
    ///
    /// # Errors
    ///
    /// Fails with a client error for the console's own plugin.
    pub async fn disable_plugin(&self, plugin_name: &str) -> ConfigResult<Vec<String>> {
        if plugin_name == self.store.settings().ui_plugin_name {
            return Err(ConfigError::BadRequest(
                "Disabling this plugin is not allowed.".to_owned(),
            ));
        }

        let mut config = self.store.read().await?;
        config.update_disabled_plugins(|list| list.push(Value::String(plugin_name.to_owned())));
        let disabled = config.disabled_plugins();

        self.store.write(config).await?;
        info!(plugin = plugin_name, "Plugin disabled");
        Ok(disabled)
    }

    /// Remove `plugin_name` from `disabledPlugins`. A plugin that is not
    /// listed leaves the document unwritten.
    ///
    /// # Errors
    ///
    /// Fails only if the document cannot be read or written.
    pub async fn enable_plugin(&self, plugin_name: &str) -> ConfigResult<Vec<String>> {
        let mut config = self.store.read().await?;
        let removed = config.update_disabled_plugins(|list| {
            list.iter()
                .position(|p| p.as_str() == Some(plugin_name))
                .map(|index| list.remove(index))
                .is_some()
        });
        if !removed {
            return Ok(config.disabled_plugins());
        }
        let disabled = config.disabled_plugins();

        self.store.write(config).await?;
        info!(plugin = plugin_name, "Plugin enabled");
        Ok(disabled)
    }
}
