//! Document and settings types for the config store.
//!
//! Two shapes of the same document live here. [`RawConfig`] is the loosely
//! typed JSON object exactly as a caller or the disk hands it over;
//! [`ConfigDocument`] is the strictly typed record the normalizer produces
//! and the store persists. Unknown keys survive in both through a flattened
//! `extra` map so that settings this crate does not model are never lost.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the `accessories` or `platforms` array.
///
/// Block contents are defined by the plugin that owns the block, so they stay
/// an untyped JSON object.
pub type ConfigBlock = Map<String, Value>;

// ---------------------------------------------------------------------------
// ConfigDocument
// ---------------------------------------------------------------------------

/// The persisted bridge configuration after normalization.
///
/// Serialization writes the typed fields first, in declaration order, then
/// the unmodelled keys in their original order. Key order inside blocks is
/// kept as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Bridge identity and network settings.
    pub bridge: BridgeSettings,
    /// Accessory blocks, in file order.
    #[serde(default)]
    pub accessories: Vec<ConfigBlock>,
    /// Platform blocks, in file order.
    #[serde(default)]
    pub platforms: Vec<ConfigBlock>,
    /// Plugins allowed to load. Omitted entirely rather than written empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,
    /// Plugins that are installed but must not load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_plugins: Option<Vec<String>>,
    /// mDNS advertiser settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdns: Option<Map<String, Value>>,
    /// Top-level keys this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Blocks of the given kind.
    #[must_use]
    pub fn blocks(&self, kind: BlockKind) -> &[ConfigBlock] {
        match kind {
            BlockKind::Accessory => &self.accessories,
            BlockKind::Platform => &self.platforms,
        }
    }
}

/// The `bridge` section of the document. The four identity fields are
/// written first; other keys such as `bind` follow them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Display name advertised to controllers.
    pub name: String,
    /// MAC-address shaped bridge identifier (`XX:XX:XX:XX:XX:XX`).
    pub username: String,
    /// TCP port the bridge listens on, within `1025..=65533`.
    pub port: u16,
    /// Setup code (`###-##-###`).
    pub pin: String,
    /// Bridge keys this crate does not model (`bind`, `advertiser`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// BlockKind
// ---------------------------------------------------------------------------

/// Whether a plugin contributes accessory or platform blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Blocks live in `accessories` and are keyed by `accessory`.
    Accessory,
    /// Blocks live in `platforms` and are keyed by `platform`.
    Platform,
}

impl BlockKind {
    /// Name of the discriminator field inside a block.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Accessory => "accessory",
            Self::Platform => "platform",
        }
    }

    /// Name of the top-level array holding blocks of this kind.
    #[must_use]
    pub const fn array_key(self) -> &'static str {
        match self {
            Self::Accessory => "accessories",
            Self::Platform => "platforms",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

// ---------------------------------------------------------------------------
// RawConfig
// ---------------------------------------------------------------------------

/// A config document as plain JSON, before full normalization.
///
/// Anything that is not a JSON object becomes an empty object, which the
/// normalizer then fills in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawConfig(Map<String, Value>);

impl RawConfig {
    /// Wrap a parsed JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Apply the read-path coercions: `bridge` is an object, `accessories`
    /// and `platforms` are arrays. Identifiers are left untouched.
    pub fn ensure_structure(&mut self) {
        if !self.0.get("bridge").is_some_and(Value::is_object) {
            self.0.insert("bridge".to_owned(), Value::Object(Map::new()));
        }
        for key in [BlockKind::Accessory.array_key(), BlockKind::Platform.array_key()] {
            if !self.0.get(key).is_some_and(Value::is_array) {
                self.0.insert(key.to_owned(), Value::Array(Vec::new()));
            }
        }
    }

    /// Blocks of the given kind. Empty when the array is absent or malformed.
    #[must_use]
    pub fn blocks(&self, kind: BlockKind) -> &[Value] {
        self.0
            .get(kind.array_key())
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Edit the blocks of the given kind in place, coercing the array into
    /// existence. Returns whatever `f` returns.
    pub fn update_blocks<R>(
        &mut self,
        kind: BlockKind,
        f: impl FnOnce(&mut Vec<Value>) -> R,
    ) -> R {
        update_array(&mut self.0, kind.array_key(), f)
    }

    /// Edit the `disabledPlugins` array in place, creating it if absent or
    /// malformed.
    pub fn update_disabled_plugins<R>(&mut self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        update_array(&mut self.0, "disabledPlugins", f)
    }

    /// The string entries of `disabledPlugins`.
    #[must_use]
    pub fn disabled_plugins(&self) -> Vec<String> {
        string_entries(self.0.get("disabledPlugins"))
    }

    /// Borrow the underlying object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the underlying object.
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Unwrap into the underlying object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Value> for RawConfig {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Map<String, Value>> for RawConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<ConfigDocument> for RawConfig {
    fn from(doc: ConfigDocument) -> Self {
        serde_json::to_value(doc).map_or_else(|_| Self::default(), Self::from_value)
    }
}

/// The array is taken out of its slot and put back, so the key keeps its
/// position in the map.
fn update_array<R>(
    map: &mut Map<String, Value>,
    key: &str,
    f: impl FnOnce(&mut Vec<Value>) -> R,
) -> R {
    let slot = map.entry(key.to_owned()).or_insert(Value::Null);
    let mut items = match slot.take() {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    let result = f(&mut items);
    *slot = Value::Array(items);
    result
}

/// Collect the string items of a JSON array, ignoring anything else.
pub(crate) fn string_entries(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// StoreSettings
// ---------------------------------------------------------------------------

/// Knobs of the config store that are fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Package name of the console's own plugin. It can never be disabled.
    pub ui_plugin_name: String,
    /// Platform alias of the console's own block in `platforms`.
    pub ui_platform: String,
    /// Version of the host bridge application. Child bridge `env` maps are
    /// kept only from 1.8.0 on.
    pub host_version: semver::Version,
    /// Backups at least this many calendar days old are pruned.
    pub retention_days: u32,
    /// Newest legacy backups kept by the one-time migration.
    pub migration_cap: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            ui_plugin_name: "homebridge-config-ui-x".to_owned(),
            ui_platform: "config".to_owned(),
            host_version: semver::Version::new(1, 8, 0),
            retention_days: 60,
            migration_cap: 100,
        }
    }
}
