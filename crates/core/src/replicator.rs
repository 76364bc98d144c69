//! Commit replication: rebuild one source commit's effect on the
//! destination repository and record it as a new commit.
//!
//! A replication moves through Filtering → Materializing → Staging →
//! Committing. File bytes always come from the source commit's tree, never
//! from the source working tree, so replaying old commits is exact.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::classifier::{classify_commit, MappedAction, MappedChange};
use crate::config::SyncConfig;
use crate::errors::{GitError, SyncError};
use crate::git::GitRepo;
use crate::models::{CommitInfo, CommitOutcome, SyncDirection};
use crate::provenance::{squash_message, sync_commit_message};

/// Replays source commits onto a destination working tree.
pub struct CommitReplicator<'a> {
    config: &'a SyncConfig,
    direction: SyncDirection,
    source: &'a dyn GitRepo,
    dest: &'a dyn GitRepo,
}

impl<'a> CommitReplicator<'a> {
    pub fn new(
        config: &'a SyncConfig,
        direction: SyncDirection,
        source: &'a dyn GitRepo,
        dest: &'a dyn GitRepo,
    ) -> Self {
        Self {
            config,
            direction,
            source,
            dest,
        }
    }

    /// Relevant changes of `commit`, minus removals of paths the destination
    /// never had.
    pub fn plan(&self, commit: &CommitInfo) -> Result<Vec<MappedChange>, GitError> {
        let mut planned = Vec::new();
        for change in classify_commit(commit, self.config, self.direction) {
            if change.action == MappedAction::Remove && !self.dest_has(&change.dest_path)? {
                debug!(path = %change.dest_path, "deleted path absent from destination");
                continue;
            }
            planned.push(change);
        }
        Ok(planned)
    }

    fn dest_has(&self, path: &str) -> Result<bool, GitError> {
        if self.dest.workdir().join(path).exists() {
            return Ok(true);
        }
        self.dest.is_tracked(path)
    }

    /// Replicate one commit. Errors are folded into [`CommitOutcome::Failed`].
    #[instrument(skip(self, commit), fields(commit = %commit.short_hash))]
    pub fn replicate(&self, commit: &CommitInfo, dry_run: bool) -> CommitOutcome {
        match self.try_replicate(commit, dry_run) {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = replication_error(commit, e);
                warn!(error = %err, "replication failed");
                CommitOutcome::Failed(err.to_string())
            }
        }
    }

    fn try_replicate(&self, commit: &CommitInfo, dry_run: bool) -> Result<CommitOutcome, SyncError> {
        let plan = self.plan(commit)?;
        if plan.is_empty() {
            debug!("no relevant changes");
            return Ok(CommitOutcome::NoRelevantChange);
        }
        if dry_run {
            return Ok(CommitOutcome::WouldReplicate { files: plan.len() });
        }

        let files = self.materialize(commit, &plan)?;
        let message = sync_commit_message(&self.config.commit_prefix, &commit.message, &commit.hash);
        match self.dest.commit(&message, Some(&commit.author())) {
            Ok(hash) => {
                info!(dest = %hash, files, "replicated commit");
                Ok(CommitOutcome::Replicated { hash, files })
            }
            Err(GitError::NothingToCommit) => {
                debug!("destination tree unchanged");
                Ok(CommitOutcome::NoRelevantChange)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every planned removal, then write and stage every planned
    /// write. Removals go first so a path can change between file and
    /// directory within one commit. A removal that fails is logged and
    /// skipped. Returns the number of destination paths touched.
    fn materialize(&self, commit: &CommitInfo, plan: &[MappedChange]) -> Result<usize, SyncError> {
        let root = self.dest.workdir().to_path_buf();

        let mut removed = 0;
        for change in plan.iter().filter(|c| c.action == MappedAction::Remove) {
            match self.dest.remove(&change.dest_path) {
                Ok(()) => {
                    prune_empty_parents(&root, &change.dest_path);
                    removed += 1;
                }
                Err(e) => warn!(path = %change.dest_path, error = %e, "could not remove path"),
            }
        }

        let mut written = Vec::new();
        for change in plan.iter().filter(|c| c.action == MappedAction::Write) {
            let Some(bytes) = self.source.file_content_at(&commit.hash, &change.source_path)? else {
                debug!(path = %change.source_path, "source path is not a file in this commit");
                continue;
            };
            let target = root.join(&change.dest_path);
            let materialize_err = |source| SyncError::Materialize {
                path: change.dest_path.clone(),
                source,
            };
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(materialize_err)?;
            }
            std::fs::write(&target, &bytes).map_err(materialize_err)?;
            written.push(change.dest_path.clone());
        }
        self.dest.stage(&written)?;

        debug!(written = written.len(), removed, "materialized changes");
        Ok(written.len() + removed)
    }

    /// Replay all `commits` and record them as one destination commit whose
    /// trailer names the last of them. Authorship is the local identity.
    #[instrument(skip(self, commits), fields(count = commits.len()))]
    pub fn replicate_squashed(&self, commits: &[CommitInfo], dry_run: bool) -> CommitOutcome {
        match self.try_squash(commits, dry_run) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "squashed replication failed");
                CommitOutcome::Failed(e.to_string())
            }
        }
    }

    fn try_squash(&self, commits: &[CommitInfo], dry_run: bool) -> Result<CommitOutcome, SyncError> {
        let mut files = 0;
        for commit in commits {
            let step = self.plan(commit).map_err(SyncError::from).and_then(|plan| {
                if dry_run {
                    Ok(plan.len())
                } else {
                    self.materialize(commit, &plan)
                }
            });
            files += step.map_err(|e| replication_error(commit, e))?;
        }

        if files == 0 {
            return Ok(CommitOutcome::NoRelevantChange);
        }
        if dry_run {
            return Ok(CommitOutcome::WouldReplicate { files });
        }

        let Some(message) = squash_message(&self.config.commit_prefix, commits) else {
            return Ok(CommitOutcome::NoRelevantChange);
        };
        match self.dest.commit(&message, None) {
            Ok(hash) => {
                info!(dest = %hash, files, "replicated squashed commit");
                Ok(CommitOutcome::Replicated { hash, files })
            }
            Err(GitError::NothingToCommit) => Ok(CommitOutcome::NoRelevantChange),
            Err(e) => match commits.last() {
                Some(last) => Err(replication_error(last, e.into())),
                None => Err(e.into()),
            },
        }
    }
}

/// Delete directories left empty by removing `rel`, stopping at the first
/// non-empty one or at `root`.
fn prune_empty_parents(root: &Path, rel: &str) {
    let mut dir = root.join(rel);
    while dir.pop() && dir.starts_with(root) && dir != root {
        if std::fs::remove_dir(&dir).is_err() {
            break;
        }
    }
}

fn replication_error(commit: &CommitInfo, source: SyncError) -> SyncError {
    SyncError::Replication {
        short_hash: commit.short_hash.clone(),
        source: Box::new(source),
    }
}
