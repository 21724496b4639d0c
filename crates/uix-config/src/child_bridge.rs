//! Cleanup of a block's `_bridge` child-bridge settings.
//!
//! The console's forms submit every child-bridge field, filled in or not.
//! Blank values are stripped before saving so the host sees only what the
//! operator actually set.

use serde_json::Value;

use crate::types::ConfigBlock;

/// Host version from which child bridges accept an `env` map.
pub const ENV_MIN_HOST_VERSION: semver::Version = semver::Version::new(1, 8, 0);

/// Whether a host at `host_version` understands `_bridge.env`.
#[must_use]
pub fn env_supported(host_version: &semver::Version) -> bool {
    *host_version >= ENV_MIN_HOST_VERSION
}

/// Strip blank entries from `block._bridge`.
///
/// - `null` and blank-string fields are removed.
/// - With `env_allowed`, `env` keeps only non-blank string values and is
///   removed once empty; otherwise `env` is removed outright.
///
/// A `_bridge` that is not an object is left alone.
pub fn sanitize_block(block: &mut ConfigBlock, env_allowed: bool) {
    let Some(Value::Object(bridge)) = block.get_mut("_bridge") else {
        return;
    };

    bridge.retain(|key, value| {
        if key == "env" {
            return env_allowed && clean_env(value);
        }
        !is_blank(value)
    });
}

/// Drop unusable env entries. Returns whether anything is left.
fn clean_env(env: &mut Value) -> bool {
    let Value::Object(vars) = env else {
        return false;
    };
    vars.retain(|_, v| v.as_str().is_some_and(|s| !s.trim().is_empty()));
    !vars.is_empty()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
