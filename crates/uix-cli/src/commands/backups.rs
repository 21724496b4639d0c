//! Backups command - list, read and delete `config.json` backups.

use colored::Colorize;
use uix_config::ConfigService;

use super::print_bytes;
use crate::theme::Theme;

/// ID and TAKEN columns plus a `config.json.<millis>` file name.
const TABLE_WIDTH: usize = 64;

/// List backups, newest first.
pub(crate) async fn list_backups(service: &ConfigService) -> anyhow::Result<()> {
    let backups = service.list_backups().await?;

    if backups.is_empty() {
        println!("{}", Theme::info("No backups found"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Config Backups"));
    println!("{}", format!("{:<15} {:<19} {}", "ID", "TAKEN", "FILE").dimmed());
    println!("{}", Theme::rule(TABLE_WIDTH));

    for backup in &backups {
        println!(
            "{:<15} {:<19} {}",
            backup.id,
            Theme::timestamp(&backup.timestamp),
            Theme::dimmed(&backup.filename)
        );
    }

    println!(
        "\n{}",
        Theme::dimmed(&format!(
            "{} backups in {}",
            backups.len(),
            service.backups().backup_path().await.display()
        ))
    );
    Ok(())
}

/// Print one backup's contents.
pub(crate) async fn get_backup(service: &ConfigService, id: &str) -> anyhow::Result<()> {
    let bytes = service.get_backup(id).await?;
    print_bytes(&bytes)
}

/// Delete every backup.
pub(crate) async fn delete_all_backups(service: &ConfigService) -> anyhow::Result<()> {
    let total = service.list_backups().await?.len();
    let removed = service.delete_all_backups().await?;

    if removed < total {
        println!(
            "{}",
            Theme::warning(&format!("Deleted {removed} of {total} backups"))
        );
    } else {
        println!("{}", Theme::success(&format!("Deleted {removed} backups")));
    }
    Ok(())
}

/// Delete backups at least `days` days old.
pub(crate) async fn prune_backups(
    service: &ConfigService,
    days: Option<u32>,
) -> anyhow::Result<()> {
    let days = days.unwrap_or(service.store().settings().retention_days);
    let removed = service.backups().prune_older_than(days).await;
    println!(
        "{}",
        Theme::success(&format!(
            "Removed {removed} backups older than {days} days"
        ))
    );
    Ok(())
}
