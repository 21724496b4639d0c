//! Config command - show and save `config.json`.

use uix_config::ConfigService;

use super::{print_json, read_json_input};
use crate::theme::Theme;

/// Print the live document.
pub(crate) async fn show_config(service: &ConfigService) -> anyhow::Result<()> {
    let config = service.read_config().await?;
    print_json(&config)
}

/// Normalize and save the document read from `input`.
pub(crate) async fn write_config(service: &ConfigService, input: &str) -> anyhow::Result<()> {
    let doc = read_json_input(input).await?;
    let saved = service.write_config(doc).await?;

    println!("{}", Theme::success("Changes to config.json saved"));
    println!("  {}", Theme::kv("Name", &saved.bridge.name));
    println!("  {}", Theme::kv("Username", &saved.bridge.username));
    println!("  {}", Theme::kv("Port", &saved.bridge.port.to_string()));
    println!("  {}", Theme::kv("Pin", &saved.bridge.pin));
    Ok(())
}
