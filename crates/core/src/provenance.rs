//! Provenance trailers.
//!
//! Every commit monosync writes into a destination repository ends with a
//! `synced_from: <40-hex>` trailer naming the source commit it was built
//! from. That trailer is the only persisted sync state: the resume point of a
//! direction is recovered by scanning destination history for the most
//! recent one.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, instrument};

use crate::errors::GitError;
use crate::git::GitRepo;
use crate::models::{CommitInfo, SyncDirection};

/// Key of the provenance trailer line.
pub const TRAILER_KEY: &str = "synced_from";

static TRAILER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"synced_from:\s*([0-9a-f]{40})").expect("valid trailer pattern"));

/// `synced_from: <hash>`
pub fn format_trailer(hash: &str) -> String {
    format!("{TRAILER_KEY}: {hash}")
}

/// Message for a replicated commit: prefixed original message plus trailer.
pub fn sync_commit_message(prefix: &str, message: &str, source_hash: &str) -> String {
    format!("{prefix} {}\n\n{}", message.trim(), format_trailer(source_hash))
}

/// Message for the single commit produced by a full sync.
pub fn full_sync_message(prefix: &str, direction: SyncDirection, source_head: &str) -> String {
    format!(
        "{prefix} Full sync from {} repo\n\n{}",
        direction.source_label(),
        format_trailer(source_head)
    )
}

/// Message for a squashed run: one bullet per source commit, trailer naming
/// the last one.
pub fn squash_message(prefix: &str, commits: &[CommitInfo]) -> Option<String> {
    let last = commits.last()?;
    let bullets: Vec<String> = commits
        .iter()
        .map(|c| format!("- {} {}", c.short_hash, c.summary()))
        .collect();
    Some(format!(
        "{prefix} Squash of {} commit(s)\n\n{}\n\n{}",
        commits.len(),
        bullets.join("\n"),
        format_trailer(&last.hash)
    ))
}

/// Extract the source hash from a message's provenance trailer.
pub fn parse_trailer(message: &str) -> Option<String> {
    TRAILER_PATTERN
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether a message was written by monosync: it carries the prefix and a
/// provenance trailer.
pub fn is_sync_commit(message: &str, prefix: &str) -> bool {
    message.contains(prefix) && parse_trailer(message).is_some()
}

/// Find the source hash the destination was last synced from.
///
/// Scans the newest `lookback` commits on the destination's current branch
/// (`0` scans the whole branch) and returns the trailer hash of the first
/// sync commit found. An empty or unborn branch has no resume point.
#[instrument(skip(repo))]
pub fn find_resume_point(
    repo: &dyn GitRepo,
    prefix: &str,
    lookback: usize,
) -> Result<Option<String>, GitError> {
    let limit = (lookback > 0).then_some(lookback);
    for (hash, message) in repo.recent_messages(limit)? {
        if !message.contains(prefix) {
            continue;
        }
        if let Some(source) = parse_trailer(&message) {
            debug!(dest = %hash, source = %source, "found provenance trailer");
            return Ok(Some(source));
        }
    }
    debug!("no provenance trailer found");
    Ok(None)
}
