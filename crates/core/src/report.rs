//! Progress reporting hooks.
//!
//! The engine never renders anything itself. Callers pass a [`SyncReporter`]
//! and decide how (or whether) to show progress; every hook has an empty
//! default so implementors only override what they display.

use crate::models::{CommitInfo, CommitOutcome, SyncDirection, SyncResult};

pub trait SyncReporter {
    /// A run is about to replicate `pending` commits.
    fn run_started(&self, _direction: SyncDirection, _pending: usize) {}

    /// Commit `index` (1-based) of `total` is being replicated.
    fn commit_started(&self, _index: usize, _total: usize, _commit: &CommitInfo) {}

    fn commit_finished(&self, _commit: &CommitInfo, _outcome: &CommitOutcome) {}

    /// A pending commit was passed over without replication.
    fn commit_skipped(&self, _commit: &CommitInfo, _reason: &str) {}

    /// Free-form progress note (clone refresh, push, full-sync steps).
    fn note(&self, _message: &str) {}

    fn run_finished(&self, _result: &SyncResult) {}
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl SyncReporter for NullReporter {}
