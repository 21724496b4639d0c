//! Serve command - keep the config store's background work running.

use std::sync::Arc;

use tracing::info;
use uix_config::{ConfigService, PluginDirectory, StoragePaths, StoreSettings};

use crate::theme::Theme;

/// Run startup and the retention job until Ctrl-C.
pub(crate) async fn run_serve(
    paths: &StoragePaths,
    settings: StoreSettings,
    directory: Arc<dyn PluginDirectory>,
) -> anyhow::Result<()> {
    let service = ConfigService::start(paths, settings, directory).await;

    println!("{}", Theme::header("uix config store"));
    println!(
        "  {}",
        Theme::kv("Config", &paths.config_path().display().to_string())
    );
    println!(
        "  {}",
        Theme::kv(
            "Backups",
            &service.backups().backup_path().await.display().to_string()
        )
    );
    if !service.backups().has_dedicated_path().await {
        println!(
            "{}",
            Theme::warning("Backups are being written to the storage directory")
        );
    }
    println!("{}", Theme::dimmed("Press Ctrl-C to stop."));

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    drop(service);
    Ok(())
}
