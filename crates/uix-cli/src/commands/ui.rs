//! UI command - edit the console's own platform block.

use serde_json::Value;
use uix_config::ConfigService;

use crate::theme::Theme;

/// Set or remove one property on the console's block.
pub(crate) async fn set_property(
    service: &ConfigService,
    property: &str,
    value: &str,
) -> anyhow::Result<()> {
    let value = parse_value(value);
    let removed = value.is_null() || value.as_str() == Some("");
    service.set_ui_property(property, value).await?;

    let message = if removed {
        format!("Removed {property}")
    } else {
        format!("Updated {property}")
    };
    println!("{}", Theme::success(&message));
    Ok(())
}

/// Parse a command-line value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}
