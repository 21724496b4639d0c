//! Command handlers.

pub(crate) mod backups;
pub(crate) mod config;
pub(crate) mod plugin;
pub(crate) mod serve;
pub(crate) mod ui;

use std::io::Write;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncReadExt;

/// Read a JSON document from `input`, a file path or `-` for stdin.
pub(crate) async fn read_json_input(input: &str) -> anyhow::Result<Value> {
    let bytes = if input == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdin")?;
        buf
    } else {
        tokio::fs::read(input)
            .await
            .with_context(|| format!("failed to read {input}"))?
    };
    serde_json::from_slice(&bytes).with_context(|| format!("{input} is not valid JSON"))
}

/// Print `value` to stdout the way `config.json` is formatted.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    print_bytes(&uix_config::store::to_json_pretty(value)?)
}

/// Write raw bytes to stdout.
pub(crate) fn print_bytes(bytes: &[u8]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}
