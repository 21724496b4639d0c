//! In-process view of the persisted configuration.
//!
//! Components that act on configuration at runtime hold a [`ConfigContext`]
//! and read the latest [`ConfigSnapshot`] from it, or subscribe to be told
//! when a save swaps in a new one. Snapshots are immutable; a save publishes
//! a fresh snapshot built from a deep copy of the document it wrote.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::normalize::Prior;
use crate::types::{BlockKind, string_entries};

/// Immutable view of one persisted version of the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    document: Value,
    username: Option<String>,
    pin: Option<String>,
    ui: Option<Map<String, Value>>,
    disabled_plugins: Vec<String>,
}

impl ConfigSnapshot {
    /// Snapshot of a document that does not exist yet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extract the runtime view from a parsed document. `ui_platform` is the
    /// platform alias of the console's own block.
    ///
    /// Nothing is validated; identity values are kept exactly as persisted.
    #[must_use]
    pub fn parse(document: Value, ui_platform: &str) -> Self {
        let bridge = document.get("bridge").and_then(Value::as_object);
        let bridge_str = |key: &str| {
            bridge
                .and_then(|b| b.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        let platform_field = BlockKind::Platform.field();
        let ui = document
            .get(BlockKind::Platform.array_key())
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks.iter().filter_map(Value::as_object).find(|block| {
                    block.get(platform_field).and_then(Value::as_str) == Some(ui_platform)
                })
            })
            .cloned();

        Self {
            username: bridge_str("username"),
            pin: bridge_str("pin"),
            ui,
            disabled_plugins: string_entries(document.get("disabledPlugins")),
            document,
        }
    }

    /// The whole document as persisted.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// `bridge.username` as persisted.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// `bridge.pin` as persisted.
    #[must_use]
    pub fn pin(&self) -> Option<&str> {
        self.pin.as_deref()
    }

    /// Identity values for the normalizer's reuse policy.
    #[must_use]
    pub fn prior(&self) -> Prior<'_> {
        Prior {
            username: self.username(),
            pin: self.pin(),
        }
    }

    /// The console's own platform block, if present.
    #[must_use]
    pub fn ui_settings(&self) -> Option<&Map<String, Value>> {
        self.ui.as_ref()
    }

    /// Plugins listed in `disabledPlugins`.
    #[must_use]
    pub fn disabled_plugins(&self) -> &[String] {
        &self.disabled_plugins
    }

    /// Whether `plugin` is listed in `disabledPlugins`.
    #[must_use]
    pub fn is_plugin_disabled(&self, plugin: &str) -> bool {
        self.disabled_plugins.iter().any(|p| p == plugin)
    }
}

/// Shared handle to the current [`ConfigSnapshot`].
///
/// Clones share the same channel. Publishing never blocks readers; a reader
/// holding an old `Arc` keeps seeing the version it took.
#[derive(Debug, Clone)]
pub struct ConfigContext {
    tx: Arc<watch::Sender<Arc<ConfigSnapshot>>>,
}

impl ConfigContext {
    /// Create a context starting at `snapshot`.
    #[must_use]
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        Self { tx: Arc::new(tx) }
    }

    /// The latest snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver that observes every subsequent publish.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.tx.subscribe()
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn publish(&self, snapshot: ConfigSnapshot) -> Arc<ConfigSnapshot> {
        self.tx.send_replace(Arc::new(snapshot))
    }
}

impl Default for ConfigContext {
    fn default() -> Self {
        Self::new(ConfigSnapshot::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_extracts_runtime_view() {
        let snapshot = ConfigSnapshot::parse(
            json!({
                "bridge": {"username": "bad", "pin": "031-45-154"},
                "platforms": [
                    {"platform": "Hue"},
                    {"platform": "config", "port": 8581, "theme": "dark"}
                ],
                "disabledPlugins": ["homebridge-hue", 3]
            }),
            "config",
        );

        assert_eq!(snapshot.username(), Some("bad"));
        assert_eq!(snapshot.pin(), Some("031-45-154"));
        assert_eq!(snapshot.ui_settings().unwrap()["port"], json!(8581));
        assert_eq!(snapshot.disabled_plugins(), ["homebridge-hue".to_owned()]);
        assert!(snapshot.is_plugin_disabled("homebridge-hue"));
    }

    #[test]
    fn test_parse_tolerates_garbage() {
        let snapshot = ConfigSnapshot::parse(json!([1, 2]), "config");
        assert!(snapshot.username().is_none());
        assert!(snapshot.ui_settings().is_none());
        assert!(snapshot.disabled_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_publish_swaps_and_notifies() {
        let context = ConfigContext::default();
        let held = context.current();
        let mut rx = context.subscribe();

        let previous = context.publish(ConfigSnapshot::parse(
            json!({"bridge": {"username": "0E:11:22:33:44:55"}}),
            "config",
        ));

        assert!(previous.username().is_none());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().username(), Some("0E:11:22:33:44:55"));
        assert_eq!(context.current().username(), Some("0E:11:22:33:44:55"));
        // Earlier readers keep their version.
        assert!(held.username().is_none());
    }
}
