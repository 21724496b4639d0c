//! Write-path normalization of the config document.
//!
//! [`normalize`] is a total function from a loosely typed [`RawConfig`] to a
//! strictly typed [`ConfigDocument`]. It never rejects input; every defect
//! has a repair rule. The rules run in this order, and later rules rely on
//! earlier repairs:
//!
//! 1. `bridge` becomes an object if it is missing or not one.
//! 2. A numeric string `bridge.port` is parsed to an integer.
//! 3. A missing or out-of-range port is replaced by a random port in
//!    `51000..=52000`.
//! 4. `bridge.username` is generated when absent; when malformed the
//!    previously persisted username is reused if valid, else generated.
//! 5. `bridge.pin` follows the same reuse-or-generate policy.
//! 6. `bridge.name` is derived from the username when not a non-empty string.
//! 7. `accessories` and `platforms` become arrays of objects.
//! 8. `plugins` is dropped unless it is a non-empty array.
//! 9. `mdns` is dropped unless it is an object.
//! 10. `disabledPlugins` is dropped unless it is an array.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{BridgeSettings, ConfigBlock, ConfigDocument, RawConfig};

#[cfg(test)]
mod tests;

/// Lowest port the bridge may listen on.
pub const PORT_MIN: u16 = 1025;
/// Highest port the bridge may listen on.
pub const PORT_MAX: u16 = 65533;
/// Lowest port handed out when the configured one is unusable.
pub const FALLBACK_PORT_MIN: u16 = 51000;
/// Highest port handed out when the configured one is unusable.
pub const FALLBACK_PORT_MAX: u16 = 52000;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([0-9A-F]{2}:){5}[0-9A-F]{2}$").expect("invalid regex"));
static PIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}-\d{2}-\d{3}$").expect("invalid regex"));

/// Identity values from the previously persisted document.
///
/// Consulted when the incoming document carries a malformed username or pin,
/// so that edits keep the bridge identity stable instead of minting a new
/// one. The values are taken as persisted and may themselves be invalid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prior<'a> {
    /// Previously persisted `bridge.username`.
    pub username: Option<&'a str>,
    /// Previously persisted `bridge.pin`.
    pub pin: Option<&'a str>,
}

/// Repair `raw` into a valid [`ConfigDocument`].
pub fn normalize<R: Rng + ?Sized>(
    raw: RawConfig,
    prior: &Prior<'_>,
    rng: &mut R,
) -> ConfigDocument {
    let mut map = raw.into_map();

    let mut bridge = take_bridge(&mut map);
    let port = ensure_port(coerce_port(bridge.get("port")), rng);
    let username = ensure_username(bridge.get("username"), prior.username, rng);
    let pin = ensure_pin(bridge.get("pin"), prior.pin, rng);
    let name = ensure_name(bridge.get("name"), &username);
    bridge.retain(|key, _| !matches!(key.as_str(), "name" | "username" | "port" | "pin"));

    let mut doc = ConfigDocument {
        bridge: BridgeSettings {
            name,
            username,
            port,
            pin,
            extra: bridge,
        },
        accessories: Vec::new(),
        platforms: Vec::new(),
        plugins: None,
        disabled_plugins: None,
        mdns: None,
        extra: Map::new(),
    };

    for (key, value) in map {
        match key.as_str() {
            "bridge" => {},
            "accessories" => doc.accessories = block_array(value),
            "platforms" => doc.platforms = block_array(value),
            "plugins" => doc.plugins = plugin_list(value),
            "mdns" => doc.mdns = mdns_object(value),
            "disabledPlugins" => doc.disabled_plugins = disabled_plugin_list(value),
            _ => {
                doc.extra.insert(key, value);
            },
        }
    }

    doc
}

// ---------------------------------------------------------------------------
// Bridge rules (1-6)
// ---------------------------------------------------------------------------

/// Rule 1: take `bridge` out of the document as an object.
///
/// The slot is left as `null` so that key order of the remaining document is
/// undisturbed.
fn take_bridge(map: &mut Map<String, Value>) -> Map<String, Value> {
    match map.get_mut("bridge").map(Value::take) {
        Some(Value::Object(bridge)) => bridge,
        _ => Map::new(),
    }
}

/// Rule 2: read the port as an integer, parsing numeric strings. Integral
/// floats such as `51826.0` count as integers.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn coerce_port(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= f64::from(u16::MAX))
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Rule 3: keep an in-range port, otherwise draw a fallback port.
pub(crate) fn ensure_port<R: Rng + ?Sized>(port: Option<i64>, rng: &mut R) -> u16 {
    port.and_then(|p| u16::try_from(p).ok())
        .filter(|p| is_valid_port(*p))
        .unwrap_or_else(|| rng.gen_range(FALLBACK_PORT_MIN..=FALLBACK_PORT_MAX))
}

/// Rule 4: keep a valid username, else reuse the prior one, else generate.
pub(crate) fn ensure_username<R: Rng + ?Sized>(
    value: Option<&Value>,
    prior: Option<&str>,
    rng: &mut R,
) -> String {
    reuse_or_generate(
        value,
        prior,
        is_valid_username,
        || generate_username(rng),
        "username",
    )
}

/// Rule 5: keep a valid pin, else reuse the prior one, else generate.
pub(crate) fn ensure_pin<R: Rng + ?Sized>(
    value: Option<&Value>,
    prior: Option<&str>,
    rng: &mut R,
) -> String {
    reuse_or_generate(value, prior, is_valid_pin, || generate_pin(rng), "pin")
}

fn reuse_or_generate(
    value: Option<&Value>,
    prior: Option<&str>,
    is_valid: fn(&str) -> bool,
    generate: impl FnOnce() -> String,
    field: &'static str,
) -> String {
    let current = match value {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(other) => Some(other),
    };

    let Some(current) = current else {
        debug!(field, "bridge field absent; generating");
        return generate();
    };

    if let Some(s) = current.as_str().filter(|s| is_valid(s)) {
        return s.to_owned();
    }

    if let Some(previous) = prior.filter(|p| is_valid(p)) {
        debug!(field, "bridge field malformed; keeping previously saved value");
        return previous.to_owned();
    }

    debug!(field, "bridge field malformed and no valid previous value; generating");
    generate()
}

/// Rule 6: keep a non-empty name, else derive one from the username.
pub(crate) fn ensure_name(value: Option<&Value>, username: &str) -> String {
    match value.and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => default_bridge_name(username),
    }
}

/// `"Homebridge "` followed by the last five username characters without
/// colons, e.g. `0E:AA:BB:CC:12:34` gives `Homebridge 1234`.
#[must_use]
pub fn default_bridge_name(username: &str) -> String {
    let start = username.len().saturating_sub(5);
    let tail = username.get(start..).unwrap_or(username);
    format!("Homebridge {}", tail.replace(':', ""))
}

// ---------------------------------------------------------------------------
// Document rules (7-10)
// ---------------------------------------------------------------------------

/// Rule 7: an array of block objects. Non-object entries cannot be blocks
/// and are dropped.
pub(crate) fn block_array(value: Value) -> Vec<ConfigBlock> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(block) => Some(block),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Rule 8: a non-empty list of plugin names, or nothing.
pub(crate) fn plugin_list(value: Value) -> Option<Vec<String>> {
    string_array(value).filter(|plugins| !plugins.is_empty())
}

/// Rule 9: an mDNS settings object, or nothing.
pub(crate) fn mdns_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(mdns) => Some(mdns),
        _ => None,
    }
}

/// Rule 10: a (possibly empty) list of disabled plugin names, or nothing.
pub(crate) fn disabled_plugin_list(value: Value) -> Option<Vec<String>> {
    string_array(value)
}

fn string_array(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Patterns and generators
// ---------------------------------------------------------------------------

/// Whether `port` is a usable bridge port.
#[must_use]
pub fn is_valid_port(port: u16) -> bool {
    (PORT_MIN..=PORT_MAX).contains(&port)
}

/// Whether `username` is shaped like `XX:XX:XX:XX:XX:XX` (hex, any case).
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_PATTERN.is_match(username)
}

/// Whether `pin` is shaped like `###-##-###`.
#[must_use]
pub fn is_valid_pin(pin: &str) -> bool {
    PIN_PATTERN.is_match(pin)
}

/// Generate a locally administered MAC-style identifier, `0E:XX:XX:XX:XX:XX`.
pub fn generate_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut username = String::with_capacity(17);
    username.push_str("0E");
    for _ in 0..5 {
        username.push(':');
        for _ in 0..2 {
            let idx = rng.gen_range(0..HEX.len());
            username.push(char::from(HEX[idx]));
        }
    }
    username
}

/// Generate a setup code, `###-##-###`, from an eight digit number in
/// `10000000..=89999999`.
pub fn generate_pin<R: Rng + ?Sized>(rng: &mut R) -> String {
    let code: u32 = rng.gen_range(10_000_000..=89_999_999);
    let digits = format!("{code:08}");
    let (head, rest) = digits.split_at(3);
    let (middle, tail) = rest.split_at(2);
    format!("{head}-{middle}-{tail}")
}
