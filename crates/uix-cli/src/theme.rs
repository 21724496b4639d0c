//! Terminal styling for command output.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

/// Width of the label column in key-value listings.
const LABEL_WIDTH: usize = 9;

/// Styling helpers shared by the commands.
pub(crate) struct Theme;

impl Theme {
    /// A section title.
    pub(crate) fn header(text: &str) -> String {
        text.bold().cyan().to_string()
    }

    pub(crate) fn success(text: &str) -> String {
        format!("{} {text}", "✓".green())
    }

    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    pub(crate) fn info(text: &str) -> String {
        format!("{} {text}", "i".blue())
    }

    pub(crate) fn dimmed(text: &str) -> String {
        text.dimmed().to_string()
    }

    /// A horizontal rule `width` columns wide, drawn under table headings.
    pub(crate) fn rule(width: usize) -> String {
        "─".repeat(width).dimmed().to_string()
    }

    /// `key:` padded to a fixed column, then the value.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        let label = format!("{key}:");
        format!("{} {value}", format!("{label:<LABEL_WIDTH$}").bold())
    }

    /// A plugin package name.
    pub(crate) fn plugin(name: &str) -> String {
        name.cyan().to_string()
    }

    /// A backup timestamp, shown in local time to the second.
    pub(crate) fn timestamp(dt: &DateTime<Utc>) -> String {
        dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
