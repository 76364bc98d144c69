//! Terminal progress for sync runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use monosync_core::models::{CommitInfo, CommitOutcome, SyncDirection, SyncResult};
use monosync_core::report::SyncReporter;

use crate::style;

/// Spinner plus one line per finished commit. A disabled reporter (JSON
/// output) prints nothing.
pub struct SpinnerReporter {
    spinner: Option<ProgressBar>,
}

impl SpinnerReporter {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { spinner: None };
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            spinner.set_style(
                template.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.set_message("Preparing repositories...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self {
            spinner: Some(spinner),
        }
    }

    pub fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }

    fn line(&self, msg: String) {
        if let Some(spinner) = &self.spinner {
            spinner.println(msg);
        }
    }

    fn status(&self, msg: String) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(msg);
        }
    }
}

impl SyncReporter for SpinnerReporter {
    fn run_started(&self, direction: SyncDirection, pending: usize) {
        self.line(format!(
            "{}  {} pending commit(s)",
            style::direction(direction),
            pending
        ));
    }

    fn commit_started(&self, index: usize, total: usize, commit: &CommitInfo) {
        self.status(format!(
            "[{index}/{total}] {} {}",
            commit.short_hash,
            commit.summary()
        ));
    }

    fn commit_finished(&self, commit: &CommitInfo, outcome: &CommitOutcome) {
        let line = match outcome {
            CommitOutcome::Replicated { hash, files } => style::success(&format!(
                "{} → {}  {} ({} file(s))",
                style::hash(&commit.hash),
                style::hash(hash),
                commit.summary(),
                files
            )),
            CommitOutcome::WouldReplicate { files } => format!(
                "  {}  {} ({} file(s))",
                style::hash(&commit.hash),
                commit.summary(),
                files
            ),
            CommitOutcome::NoRelevantChange => style::dim(&format!(
                "  {}  {} (no relevant change)",
                commit.short_hash,
                commit.summary()
            )),
            CommitOutcome::Failed(reason) => style::error(reason),
        };
        self.line(line);
    }

    fn commit_skipped(&self, commit: &CommitInfo, reason: &str) {
        self.line(style::dim(&format!(
            "  {}  skipped: {reason}",
            commit.short_hash
        )));
    }

    fn note(&self, message: &str) {
        self.status(message.to_string());
    }

    fn run_finished(&self, _result: &SyncResult) {
        self.finish();
    }
}
