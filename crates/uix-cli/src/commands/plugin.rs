//! Plugin command - edit one plugin's config blocks.

use uix_config::ConfigService;

use super::{print_json, read_json_input};
use crate::theme::Theme;

/// Print a plugin's blocks.
pub(crate) async fn show_blocks(service: &ConfigService, name: &str) -> anyhow::Result<()> {
    let blocks = service.get_blocks_for_plugin(name).await?;
    print_json(&blocks)
}

/// Replace a plugin's blocks with the JSON array read from `input`.
pub(crate) async fn set_blocks(
    service: &ConfigService,
    name: &str,
    input: &str,
) -> anyhow::Result<()> {
    let blocks = read_json_input(input).await?;
    let saved = service.replace_blocks_for_plugin(name, blocks).await?;
    println!(
        "{}",
        Theme::success(&format!(
            "Saved {} config blocks for {}",
            saved.len(),
            Theme::plugin(name)
        ))
    );
    Ok(())
}

/// Disable a plugin.
pub(crate) async fn disable_plugin(service: &ConfigService, name: &str) -> anyhow::Result<()> {
    let disabled = service.disable_plugin(name).await?;
    println!(
        "{}",
        Theme::success(&format!("Disabled {}", Theme::plugin(name)))
    );
    print_disabled(&disabled);
    Ok(())
}

/// Re-enable a plugin.
pub(crate) async fn enable_plugin(service: &ConfigService, name: &str) -> anyhow::Result<()> {
    let disabled = service.enable_plugin(name).await?;
    println!(
        "{}",
        Theme::success(&format!("Enabled {}", Theme::plugin(name)))
    );
    print_disabled(&disabled);
    Ok(())
}

fn print_disabled(disabled: &[String]) {
    if disabled.is_empty() {
        println!("{}", Theme::info("No plugins are disabled"));
        return;
    }
    println!("{}", Theme::header("Disabled plugins"));
    for name in disabled {
        println!("  {}", Theme::plugin(name));
    }
}
