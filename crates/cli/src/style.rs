//! Shared styling utilities for the CLI.

use chrono::{DateTime, FixedOffset};
use console::Style;

use monosync_core::models::SyncDirection;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Short commit hash (cyan).
pub fn hash(hash: &str) -> String {
    let style = Style::new().cyan();
    style
        .apply_to(monosync_core::models::short_hash(hash))
        .to_string()
}

/// Direction label, `private → public` (blue) or `public → private` (magenta).
pub fn direction(direction: SyncDirection) -> String {
    let style = match direction {
        SyncDirection::PrivateToPublic => Style::new().blue().bold(),
        SyncDirection::PublicToPrivate => Style::new().magenta().bold(),
    };
    style
        .apply_to(format!(
            "{} → {}",
            direction.source_label(),
            direction.dest_label()
        ))
        .to_string()
}

/// Enabled/disabled marker.
pub fn enabled(on: bool) -> String {
    if on {
        Style::new().green().apply_to("enabled").to_string()
    } else {
        Style::new().red().apply_to("disabled").to_string()
    }
}

/// Commit timestamp in its own offset, minute precision.
pub fn timestamp(when: &DateTime<FixedOffset>) -> String {
    when.format("%Y-%m-%d %H:%M %z").to_string()
}
