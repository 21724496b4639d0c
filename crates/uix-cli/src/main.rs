//! uix CLI - bridge config store
//!
//! Operator front end for the bridge's `config.json`: show and save the
//! document, inspect and prune backups, and edit individual plugins'
//! blocks. `uix serve` runs the store's startup work and the daily backup
//! retention job until interrupted.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use uix_config::{
    ConfigService, PluginDirectory, SchemaPluginDirectory, StoragePaths, StoreSettings,
};

mod commands;
mod theme;

use commands::{backups, config, plugin, serve, ui};

/// Plugin install roots searched when no `--plugin-path` is given.
const DEFAULT_PLUGIN_PATHS: &[&str] = &["/usr/local/lib/node_modules", "/usr/lib/node_modules"];

/// uix - bridge config store
#[derive(Parser)]
#[command(name = "uix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage directory (default: $UIX_STORAGE_PATH or ~/.homebridge)
    #[arg(long, global = true)]
    storage_path: Option<PathBuf>,

    /// Path of config.json (default: $UIX_CONFIG_PATH or <storage>/config.json)
    #[arg(long, global = true)]
    config_path: Option<PathBuf>,

    /// Directory holding installed plugins; may be repeated
    #[arg(long = "plugin-path", global = true, env = "UIX_PLUGIN_PATH", value_delimiter = ':')]
    plugin_paths: Vec<PathBuf>,

    /// Version of the host bridge application
    #[arg(long, global = true)]
    host_version: Option<semver::Version>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or save config.json
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage config.json backups
    Backups {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Edit one plugin's config blocks
    Plugin {
        #[command(subcommand)]
        command: PluginCommands,
    },

    /// Edit the console's own settings block
    Ui {
        #[command(subcommand)]
        command: UiCommands,
    },

    /// Run startup migration and the daily backup cleanup until Ctrl-C
    Serve,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the current document
    Show,
    /// Normalize and save a document
    Write {
        /// JSON file to save, or `-` for stdin
        input: String,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List backups, newest first
    List,
    /// Print the contents of one backup
    Get {
        /// Backup id (the epoch-millis suffix)
        id: String,
    },
    /// Delete every backup
    DeleteAll,
    /// Delete backups older than N days
    Prune {
        /// Age in days (default: the retention period)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// Print a plugin's config blocks
    Blocks {
        /// Plugin package name
        name: String,
    },
    /// Replace a plugin's config blocks
    SetBlocks {
        /// Plugin package name
        name: String,
        /// JSON array file, or `-` for stdin
        input: String,
    },
    /// Disable a plugin
    Disable {
        /// Plugin package name
        name: String,
    },
    /// Re-enable a disabled plugin
    Enable {
        /// Plugin package name
        name: String,
    },
}

#[derive(Subcommand)]
enum UiCommands {
    /// Set a property on the console's settings block
    Set {
        /// Property name
        property: String,
        /// JSON value; anything that is not JSON is taken as a string.
        /// `null` or an empty string removes the property.
        value: String,
    },
}

impl Cli {
    fn storage_paths(&self) -> Result<StoragePaths> {
        let paths = match &self.storage_path {
            Some(dir) => StoragePaths::from_storage(dir),
            None => StoragePaths::resolve()?,
        };
        Ok(match &self.config_path {
            Some(file) => paths.with_config_path(file),
            None => paths,
        })
    }

    fn store_settings(&self) -> StoreSettings {
        let mut settings = StoreSettings::default();
        if let Some(version) = &self.host_version {
            settings.host_version = version.clone();
        }
        settings
    }

    fn plugin_directory(&self) -> Arc<dyn PluginDirectory> {
        let paths = if self.plugin_paths.is_empty() {
            DEFAULT_PLUGIN_PATHS.iter().map(PathBuf::from).collect()
        } else {
            self.plugin_paths.clone()
        };
        Arc::new(SchemaPluginDirectory::new(paths))
    }
}

/// Install the global subscriber. Logs go to stderr so that command output
/// on stdout stays machine readable.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_filter = if verbose {
        "warn,uix_config=debug,uix=debug"
    } else {
        "warn,uix_config=info,uix=info"
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let paths = cli.storage_paths()?;
    let settings = cli.store_settings();
    let directory = cli.plugin_directory();

    if matches!(cli.command, Commands::Serve) {
        return serve::run_serve(&paths, settings, directory).await;
    }

    let service = ConfigService::open(&paths, settings, directory).await;
    match cli.command {
        Commands::Config { command } => handle_config(&service, command).await,
        Commands::Backups { command } => handle_backups(&service, command).await,
        Commands::Plugin { command } => handle_plugin(&service, command).await,
        Commands::Ui { command } => handle_ui(&service, command).await,
        Commands::Serve => Ok(()),
    }
}

async fn handle_config(service: &ConfigService, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => config::show_config(service).await,
        ConfigCommands::Write { input } => config::write_config(service, &input).await,
    }
}

async fn handle_backups(service: &ConfigService, command: BackupCommands) -> Result<()> {
    match command {
        BackupCommands::List => backups::list_backups(service).await,
        BackupCommands::Get { id } => backups::get_backup(service, &id).await,
        BackupCommands::DeleteAll => backups::delete_all_backups(service).await,
        BackupCommands::Prune { days } => backups::prune_backups(service, days).await,
    }
}

async fn handle_plugin(service: &ConfigService, command: PluginCommands) -> Result<()> {
    match command {
        PluginCommands::Blocks { name } => plugin::show_blocks(service, &name).await,
        PluginCommands::SetBlocks { name, input } => {
            plugin::set_blocks(service, &name, &input).await
        },
        PluginCommands::Disable { name } => plugin::disable_plugin(service, &name).await,
        PluginCommands::Enable { name } => plugin::enable_plugin(service, &name).await,
    }
}

async fn handle_ui(service: &ConfigService, command: UiCommands) -> Result<()> {
    match command {
        UiCommands::Set { property, value } => ui::set_property(service, &property, &value).await,
    }
}
