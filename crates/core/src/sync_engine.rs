//! Commit-level synchronization between the private and public repositories.
//!
//! The [`RepoSyncer`] drives one run in one direction:
//!
//! 1. Open the source and destination repositories (the public side is a
//!    managed clone, refreshed or re-cloned as needed).
//! 2. Recover the resume point from the destination's provenance trailers.
//! 3. Enumerate source commits after it that touch a mapped path, oldest
//!    first, setting aside echoes of the opposite direction.
//! 4. Replicate each commit, stopping at the first failure.
//! 5. Optionally push the destination branch.
//!
//! A full sync replaces every mapped destination subtree with the current
//! source working tree in a single commit.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::classifier::affected_counts;
use crate::config::SyncConfig;
use crate::errors::{GitError, SyncError};
use crate::git::remote_url::inject_token_into_url;
use crate::git::{GitClient, GitRepo};
use crate::models::{
    CommitInfo, CommitOutcome, DirectionStatus, SyncDirection, SyncPreview, SyncResult,
};
use crate::path_filter::{FilterDecision, PathFilter};
use crate::provenance::{find_resume_point, full_sync_message, is_sync_commit};
use crate::replicator::CommitReplicator;
use crate::report::SyncReporter;

/// Source commits awaiting replication for one direction.
#[derive(Debug, Clone, Default)]
pub struct PendingCommits {
    /// Source hash recovered from the destination, if any.
    pub resume_point: Option<String>,
    /// Commits to replicate, oldest first.
    pub commits: Vec<CommitInfo>,
    /// Commits produced by a sync in the opposite direction.
    pub echoes: Vec<CommitInfo>,
}

// ---------------------------------------------------------------------------
// Syncer
// ---------------------------------------------------------------------------

/// Orchestrates sync runs for one configuration.
pub struct RepoSyncer {
    config: SyncConfig,
    token: Option<String>,
    force_reclone: bool,
}

impl RepoSyncer {
    pub fn new(config: SyncConfig) -> Self {
        info!("initializing repo syncer");
        Self {
            config,
            token: None,
            force_reclone: false,
        }
    }

    /// Token used to authenticate against the public remote.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Discard any existing public clone before the next open.
    pub fn with_force_reclone(mut self, force_reclone: bool) -> Self {
        self.force_reclone = force_reclone;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Repositories
    // -----------------------------------------------------------------------

    /// Open the private checkout.
    pub fn open_private(&self) -> Result<GitClient, SyncError> {
        Ok(GitClient::new(self.config.private_repo_path())?)
    }

    /// Open the managed public clone, cloning or refreshing it first.
    pub fn open_public(&self) -> Result<GitClient, SyncError> {
        let path = self.config.public_repo_path();
        let url = match &self.token {
            Some(token) => inject_token_into_url(&self.config.public_repo_url, token),
            None => self.config.public_repo_url.clone(),
        };
        GitClient::ensure_clone(
            &url,
            &path,
            &self.config.public_remote,
            &self.config.public_branch,
            self.force_reclone,
            self.token.as_deref(),
        )
        .map_err(|e| SyncError::CloneFailed {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// `(source, destination)` for a direction.
    pub fn open_pair(&self, direction: SyncDirection) -> Result<(GitClient, GitClient), SyncError> {
        let private = self.open_private()?;
        let public = self.open_public()?;
        Ok(match direction {
            SyncDirection::PrivateToPublic => (private, public),
            SyncDirection::PublicToPrivate => (public, private),
        })
    }

    // -----------------------------------------------------------------------
    // Incremental sync
    // -----------------------------------------------------------------------

    /// Run an incremental sync. `dry_run` is combined with the configured
    /// flag.
    pub fn run(
        &self,
        direction: SyncDirection,
        dry_run: bool,
        reporter: &dyn SyncReporter,
    ) -> SyncResult {
        let dry_run = dry_run || self.config.dry_run;
        match self.open_pair(direction) {
            Ok((source, dest)) => self.sync_between(&source, &dest, direction, dry_run, reporter),
            Err(e) => failed_run(dry_run, e, reporter),
        }
    }

    /// Commits after the destination's resume point that touch a mapped
    /// path. With no enabled mapping nothing is pending.
    #[instrument(skip(self, source, dest))]
    pub fn pending_commits(
        &self,
        source: &dyn GitRepo,
        dest: &dyn GitRepo,
        direction: SyncDirection,
    ) -> Result<PendingCommits, SyncError> {
        let resume_point = find_resume_point(
            dest,
            &self.config.commit_prefix,
            self.config.provenance_lookback,
        )?;
        debug!(resume_point = ?resume_point, "resolved resume point");

        let paths = self.config.source_paths(direction);
        if paths.is_empty() {
            warn!("no enabled mappings");
            return Ok(PendingCommits {
                resume_point,
                ..Default::default()
            });
        }

        let commits = source.commits_since(resume_point.as_deref(), None, &paths)?;
        let (echoes, commits) = if self.config.skip_echo_commits {
            commits
                .into_iter()
                .partition(|c| is_sync_commit(&c.message, &self.config.commit_prefix))
        } else {
            (Vec::new(), commits)
        };

        info!(
            pending = commits.len(),
            echoes = echoes.len(),
            "enumerated source commits"
        );
        Ok(PendingCommits {
            resume_point,
            commits,
            echoes,
        })
    }

    /// Incremental sync between two already-open repositories.
    #[instrument(skip(self, source, dest, reporter))]
    pub fn sync_between(
        &self,
        source: &dyn GitRepo,
        dest: &dyn GitRepo,
        direction: SyncDirection,
        dry_run: bool,
        reporter: &dyn SyncReporter,
    ) -> SyncResult {
        info!(%direction, dry_run, "starting sync");
        let mut result = SyncResult::new(dry_run);

        let pending = match self.pending_commits(source, dest, direction) {
            Ok(pending) => pending,
            Err(e) => return failed_run(dry_run, e, reporter),
        };

        for echo in &pending.echoes {
            reporter.commit_skipped(echo, "created by a sync from the other repository");
            result.commits_skipped += 1;
        }
        reporter.run_started(direction, pending.commits.len());

        let replicator = CommitReplicator::new(&self.config, direction, source, dest);
        if self.config.squash_commits {
            if let Some(last) = pending.commits.last() {
                let outcome = replicator.replicate_squashed(&pending.commits, dry_run);
                reporter.commit_finished(last, &outcome);
                record(&mut result, &pending.commits, &outcome);
            }
        } else {
            let total = pending.commits.len();
            for (i, commit) in pending.commits.iter().enumerate() {
                reporter.commit_started(i + 1, total, commit);
                let outcome = replicator.replicate(commit, dry_run);
                reporter.commit_finished(commit, &outcome);
                record(&mut result, std::slice::from_ref(commit), &outcome);
                if matches!(outcome, CommitOutcome::Failed(_)) {
                    warn!(commit = %commit.short_hash, "stopping after failed commit");
                    break;
                }
            }
        }

        if !dry_run && self.config.auto_push && !result.commit_mappings.is_empty() {
            self.push_destination(dest, direction, &mut result, reporter);
        }

        info!(
            synced = result.commits_synced,
            skipped = result.commits_skipped,
            files = result.files_changed,
            success = result.success,
            "sync finished"
        );
        reporter.run_finished(&result);
        result
    }

    fn push_destination(
        &self,
        dest: &dyn GitRepo,
        direction: SyncDirection,
        result: &mut SyncResult,
        reporter: &dyn SyncReporter,
    ) {
        let (remote, configured) = self.config.dest_remote(direction);
        let branch = dest
            .current_branch()
            .unwrap_or_else(|_| configured.to_string());
        reporter.note(&format!("pushing {branch} to {remote}"));
        if let Err(e) = dest.push(remote, &branch) {
            warn!(error = %e, remote, branch = %branch, "push failed");
            result
                .warnings
                .push(format!("push to {remote}/{branch} failed: {e}"));
        }
    }

    // -----------------------------------------------------------------------
    // Full sync
    // -----------------------------------------------------------------------

    /// Replace every mapped destination path with the source working tree.
    pub fn run_full(
        &self,
        direction: SyncDirection,
        dry_run: bool,
        reporter: &dyn SyncReporter,
    ) -> SyncResult {
        let dry_run = dry_run || self.config.dry_run;
        match self.open_pair(direction) {
            Ok((source, dest)) => self.full_sync_between(&source, &dest, direction, dry_run, reporter),
            Err(e) => failed_run(dry_run, e, reporter),
        }
    }

    /// Full sync between two already-open repositories.
    #[instrument(skip(self, source, dest, reporter))]
    pub fn full_sync_between(
        &self,
        source: &dyn GitRepo,
        dest: &dyn GitRepo,
        direction: SyncDirection,
        dry_run: bool,
        reporter: &dyn SyncReporter,
    ) -> SyncResult {
        info!(%direction, dry_run, "starting full sync");
        let mut result = SyncResult::new(dry_run);
        reporter.run_started(direction, 1);
        if let Err(e) = self.try_full_sync(source, dest, direction, dry_run, reporter, &mut result) {
            warn!(error = %e, "full sync failed");
            result.fail(e.to_string());
        }
        reporter.run_finished(&result);
        result
    }

    fn try_full_sync(
        &self,
        source: &dyn GitRepo,
        dest: &dyn GitRepo,
        direction: SyncDirection,
        dry_run: bool,
        reporter: &dyn SyncReporter,
        result: &mut SyncResult,
    ) -> Result<(), SyncError> {
        let head = source.head_commit()?;
        let mut copied = 0;

        for project in self.config.enabled_projects() {
            let (src_root, dst_root) = project.oriented(direction);
            let src_root = src_root.trim_end_matches('/');
            let dst_root = dst_root.trim_end_matches('/');
            reporter.note(&format!("copying {src_root} -> {dst_root}"));

            let dst_dir = dest.workdir().join(dst_root);
            if !dry_run && dst_dir.exists() {
                std::fs::remove_dir_all(&dst_dir).map_err(|source| SyncError::Materialize {
                    path: dst_root.to_string(),
                    source,
                })?;
            }

            if source.workdir().join(src_root).is_dir() {
                let filter = PathFilter::for_project(project, &self.config.global_exclude_patterns);
                let copy = TreeCopy {
                    source,
                    filter,
                    src_root,
                    dry_run,
                };
                copied += copy.copy_dir("", &dst_dir)?;
            } else {
                warn!(path = src_root, "source directory does not exist");
                result
                    .warnings
                    .push(format!("source directory {src_root} does not exist"));
            }

            if !dry_run {
                dest.stage_subtree(dst_root)?;
            }
        }

        for file in self.config.enabled_files() {
            let (src, dst) = file.oriented(direction);
            let src_path = source.workdir().join(src);
            if src_path.is_file() {
                copied += 1;
                if !dry_run {
                    copy_file(&src_path, &dest.workdir().join(dst), dst)?;
                    dest.stage(&[dst.to_string()])?;
                }
            } else if !dry_run && (dest.workdir().join(dst).exists() || dest.is_tracked(dst)?) {
                dest.remove(dst)?;
            }
        }

        result.files_changed = copied;
        if dry_run {
            result.commits_synced = usize::from(copied > 0);
            return Ok(());
        }

        if !dest.has_staged_changes()? {
            info!("destination already matches source");
            result
                .warnings
                .push("destination already matches the source tree; nothing committed".into());
            return Ok(());
        }

        let message = full_sync_message(&self.config.commit_prefix, direction, &head);
        match dest.commit(&message, None) {
            Ok(hash) => {
                info!(dest = %hash, files = copied, "full sync committed");
                result.commits_synced = 1;
                result.commit_mappings.insert(head, hash);
            }
            Err(GitError::NothingToCommit) => {
                result
                    .warnings
                    .push("destination already matches the source tree; nothing committed".into());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if self.config.auto_push {
            self.push_destination(dest, direction, result, reporter);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Preview & status
    // -----------------------------------------------------------------------

    /// What an incremental run would replicate.
    pub fn preview(&self, direction: SyncDirection) -> Result<SyncPreview, SyncError> {
        let (source, dest) = self.open_pair(direction)?;
        self.preview_between(&source, &dest, direction)
    }

    pub fn preview_between(
        &self,
        source: &dyn GitRepo,
        dest: &dyn GitRepo,
        direction: SyncDirection,
    ) -> Result<SyncPreview, SyncError> {
        let pending = self.pending_commits(source, dest, direction)?;
        let affected = affected_counts(&pending.commits, &self.config, direction);
        Ok(SyncPreview {
            direction,
            resume_point: pending.resume_point,
            echoes: pending.echoes.len(),
            pending: pending.commits,
            affected,
        })
    }

    /// Resume point and pending count for both directions.
    pub fn status(&self) -> Result<Vec<DirectionStatus>, SyncError> {
        let private = self.open_private()?;
        let public = self.open_public()?;
        Ok(self.status_between(&private, &public))
    }

    /// Per-direction status; failures are reported inline.
    pub fn status_between(&self, private: &dyn GitRepo, public: &dyn GitRepo) -> Vec<DirectionStatus> {
        [SyncDirection::PrivateToPublic, SyncDirection::PublicToPrivate]
            .into_iter()
            .map(|direction| {
                let (source, dest) = match direction {
                    SyncDirection::PrivateToPublic => (private, public),
                    SyncDirection::PublicToPrivate => (public, private),
                };
                let last_synced = find_resume_point(
                    dest,
                    &self.config.commit_prefix,
                    self.config.provenance_lookback,
                )
                .map_err(|e| e.to_string());
                let pending = self
                    .pending_commits(source, dest, direction)
                    .map(|p| p.commits.len())
                    .map_err(|e| e.to_string());
                DirectionStatus {
                    direction,
                    last_synced,
                    pending,
                }
            })
            .collect()
    }
}

fn failed_run(dry_run: bool, error: SyncError, reporter: &dyn SyncReporter) -> SyncResult {
    warn!(error = %error, "sync could not start");
    let mut result = SyncResult::new(dry_run);
    result.fail(error.to_string());
    reporter.run_finished(&result);
    result
}

/// Fold one outcome into the run totals. `commits` are the source commits
/// the outcome covers (several for a squash).
fn record(result: &mut SyncResult, commits: &[CommitInfo], outcome: &CommitOutcome) {
    match outcome {
        CommitOutcome::Replicated { hash, files } => {
            result.commits_synced += commits.len();
            result.files_changed += files;
            for commit in commits {
                result
                    .commit_mappings
                    .insert(commit.hash.clone(), hash.clone());
            }
        }
        CommitOutcome::WouldReplicate { files } => {
            result.commits_synced += commits.len();
            result.files_changed += files;
        }
        CommitOutcome::NoRelevantChange => {}
        CommitOutcome::Failed(reason) => result.fail(reason.clone()),
    }
}

// ---------------------------------------------------------------------------
// Working-tree copy
// ---------------------------------------------------------------------------

/// Recursive copy of one project directory out of the source working tree.
struct TreeCopy<'a> {
    source: &'a dyn GitRepo,
    filter: PathFilter,
    src_root: &'a str,
    dry_run: bool,
}

impl TreeCopy<'_> {
    /// Copy `rel_dir` (relative to the project root) into `dst_dir`.
    /// Returns the number of files copied.
    fn copy_dir(&self, rel_dir: &str, dst_dir: &Path) -> Result<usize, SyncError> {
        let src_dir = self.source.workdir().join(self.src_root).join(rel_dir);
        let mut copied = 0;

        for entry in std::fs::read_dir(&src_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                warn!(name = ?file_name, "skipping non UTF-8 file name");
                continue;
            };
            if name == ".git" {
                continue;
            }

            let rel = if rel_dir.is_empty() {
                name.to_string()
            } else {
                format!("{rel_dir}/{name}")
            };
            let repo_path = format!("{}/{rel}", self.src_root);
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                if matches!(self.filter.evaluate(&rel), FilterDecision::Excluded { .. })
                    || self.source.is_ignored(&repo_path)?
                {
                    debug!(path = %repo_path, "skipping directory");
                    continue;
                }
                copied += self.copy_dir(&rel, &dst_dir.join(name))?;
            } else if file_type.is_file() {
                if !self.filter.should_include(&rel) || self.source.is_ignored(&repo_path)? {
                    debug!(path = %repo_path, "skipping file");
                    continue;
                }
                if !self.dry_run {
                    copy_file(&entry.path(), &dst_dir.join(name), &rel)?;
                }
                copied += 1;
            } else {
                debug!(path = %repo_path, "skipping non-regular file");
            }
        }

        Ok(copied)
    }
}

fn copy_file(from: &Path, to: &Path, display: &str) -> Result<(), SyncError> {
    let materialize_err = |source| SyncError::Materialize {
        path: display.to_string(),
        source,
    };
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(materialize_err)?;
    }
    std::fs::copy(from, to).map_err(materialize_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileMapping, ProjectMapping};
    use crate::models::ChangeKind;
    use crate::provenance::parse_trailer;
    use crate::report::NullReporter;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingReporter {
        events: RefCell<Vec<String>>,
    }

    impl SyncReporter for RecordingReporter {
        fn run_started(&self, direction: SyncDirection, pending: usize) {
            self.events.borrow_mut().push(format!("start {direction} {pending}"));
        }
        fn commit_finished(&self, commit: &CommitInfo, outcome: &CommitOutcome) {
            self.events
                .borrow_mut()
                .push(format!("{} {}", commit.summary(), outcome.label()));
        }
        fn commit_skipped(&self, commit: &CommitInfo, _reason: &str) {
            self.events.borrow_mut().push(format!("skip {}", commit.summary()));
        }
    }

    struct Repos {
        _dir: tempfile::TempDir,
        private: GitClient,
        public: GitClient,
    }

    fn repos() -> Repos {
        let dir = tempfile::tempdir().unwrap();
        let private = GitClient::init(dir.path().join("private"), "main").unwrap();
        let public = GitClient::init(dir.path().join("public"), "main").unwrap();
        Repos {
            _dir: dir,
            private,
            public,
        }
    }

    fn config() -> SyncConfig {
        let mut config = SyncConfig::new("/unused", "file:///unused");
        let mut project = ProjectMapping::new("packages/core");
        project.public_path = Some("libs/core".into());
        config.projects.push(project);
        config
    }

    fn commit(repo: &GitClient, files: &[(&str, &str)], message: &str) -> String {
        for (p, c) in files {
            let full = repo.workdir().join(p);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, c).unwrap();
        }
        let paths: Vec<String> = files.iter().map(|(p, _)| p.to_string()).collect();
        repo.stage(&paths).unwrap();
        repo.commit(message, None).unwrap()
    }

    #[test]
    fn test_record_outcomes() {
        let repos = repos();
        commit(&repos.private, &[("packages/core/a", "1")], "A");
        let commits = repos.private.commits_since(None, None, &[]).unwrap();

        let mut result = SyncResult::new(false);
        record(
            &mut result,
            &commits,
            &CommitOutcome::Replicated {
                hash: "d".repeat(40),
                files: 2,
            },
        );
        record(&mut result, &commits, &CommitOutcome::NoRelevantChange);
        assert_eq!(result.commits_synced, 1);
        assert_eq!(result.files_changed, 2);
        assert_eq!(result.commit_mappings.get(&commits[0].hash), Some(&"d".repeat(40)));
        assert!(result.success);

        record(&mut result, &commits, &CommitOutcome::Failed("boom".into()));
        assert!(!result.success);
        assert_eq!(result.errors, vec!["boom".to_string()]);
    }

    #[test]
    fn test_sync_between_is_idempotent() {
        let repos = repos();
        let syncer = RepoSyncer::new(config());
        commit(&repos.private, &[("packages/core/a.py", "a")], "A");
        commit(&repos.private, &[("docs/x.md", "x")], "unrelated");
        commit(&repos.private, &[("packages/core/b.py", "b")], "B");

        let reporter = RecordingReporter::default();
        let first = syncer.sync_between(
            &repos.private,
            &repos.public,
            SyncDirection::PrivateToPublic,
            false,
            &reporter,
        );
        assert!(first.success);
        assert_eq!(first.commits_synced, 2);
        assert_eq!(first.files_changed, 2);
        assert_eq!(
            reporter.events.borrow().as_slice(),
            ["start private-to-public 2", "A replicated", "B replicated"]
        );

        let second = syncer.sync_between(
            &repos.private,
            &repos.public,
            SyncDirection::PrivateToPublic,
            false,
            &NullReporter,
        );
        assert!(second.success);
        assert_eq!(second.commits_synced, 0);
        assert!(second.commit_mappings.is_empty());
    }

    #[test]
    fn test_echo_commits_are_skipped() {
        let repos = repos();
        let syncer = RepoSyncer::new(config());
        commit(&repos.private, &[("packages/core/a.py", "a")], "A");
        syncer.sync_between(
            &repos.private,
            &repos.public,
            SyncDirection::PrivateToPublic,
            false,
            &NullReporter,
        );

        let reporter = RecordingReporter::default();
        let back = syncer.sync_between(
            &repos.public,
            &repos.private,
            SyncDirection::PublicToPrivate,
            false,
            &reporter,
        );
        assert!(back.success);
        assert_eq!(back.commits_synced, 0);
        assert_eq!(back.commits_skipped, 1);
        assert_eq!(reporter.events.borrow()[0], "skip [sync] A");
    }

    #[test]
    fn test_failure_stops_run() {
        let repos = repos();
        let syncer = RepoSyncer::new(config());
        commit(&repos.private, &[("packages/core/a.py", "a")], "A");
        commit(&repos.private, &[("packages/core/b.py", "b")], "B");
        std::fs::write(repos.public.workdir().join("libs"), "blocker").unwrap();

        let result = syncer.sync_between(
            &repos.private,
            &repos.public,
            SyncDirection::PrivateToPublic,
            false,
            &NullReporter,
        );
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.commits_synced, 0);
    }

    #[test]
    fn test_no_mappings_means_nothing_pending() {
        let repos = repos();
        let syncer = RepoSyncer::new(SyncConfig::new("/unused", "file:///unused"));
        commit(&repos.private, &[("a.txt", "a")], "A");
        let pending = syncer
            .pending_commits(&repos.private, &repos.public, SyncDirection::PrivateToPublic)
            .unwrap();
        assert!(pending.commits.is_empty());
    }

    #[test]
    fn test_full_sync_copies_filtered_tree() {
        let repos = repos();
        let mut cfg = config();
        cfg.files.push(FileMapping::new("LICENSE"));
        let syncer = RepoSyncer::new(cfg);

        commit(
            &repos.private,
            &[
                ("packages/core/src/index.py", "code"),
                ("packages/core/.env", "SECRET=1"),
                ("packages/core/.gitignore", "*.log\n"),
                ("LICENSE", "MIT"),
            ],
            "seed",
        );
        std::fs::write(repos.private.workdir().join("packages/core/debug.log"), "x").unwrap();
        let head = repos.private.head_commit().unwrap();
        commit(&repos.public, &[("libs/core/stale.py", "old")], "public seed");

        let result = syncer.full_sync_between(
            &repos.private,
            &repos.public,
            SyncDirection::PrivateToPublic,
            false,
            &NullReporter,
        );
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.commits_synced, 1);
        assert_eq!(result.files_changed, 3);

        let dest_head = repos.public.head_commit().unwrap();
        assert_eq!(result.commit_mappings.get(&head), Some(&dest_head));
        let changes = repos.public.diff_against_parent(&dest_head).unwrap();
        assert!(changes.contains(&crate::models::FileChange::new(
            "libs/core/stale.py",
            ChangeKind::Deleted
        )));
        assert!(repos.public.is_tracked("libs/core/src/index.py").unwrap());
        assert!(repos.public.is_tracked("LICENSE").unwrap());
        assert!(!repos.public.workdir().join("libs/core/.env").exists());
        assert!(!repos.public.workdir().join("libs/core/debug.log").exists());

        let msg = &repos.public.recent_messages(Some(1)).unwrap()[0].1;
        assert!(msg.starts_with("[sync] Full sync from private repo"));
        assert_eq!(parse_trailer(msg).as_deref(), Some(head.as_str()));

        // Nothing changed since: no second commit.
        let again = syncer.full_sync_between(
            &repos.private,
            &repos.public,
            SyncDirection::PrivateToPublic,
            false,
            &NullReporter,
        );
        assert!(again.success);
        assert_eq!(again.commits_synced, 0);
        assert_eq!(repos.public.head_commit().unwrap(), dest_head);
    }

    #[test]
    fn test_status_between_reports_both_directions() {
        let repos = repos();
        let syncer = RepoSyncer::new(config());
        commit(&repos.private, &[("packages/core/a.py", "a")], "A");
        commit(&repos.public, &[("libs/core/p.py", "p")], "P");

        let status = syncer.status_between(&repos.private, &repos.public);
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].direction, SyncDirection::PrivateToPublic);
        assert_eq!(status[0].last_synced, Ok(None));
        assert_eq!(status[0].pending, Ok(1));
        assert_eq!(status[1].pending, Ok(1));
    }

    #[test]
    fn test_preview_counts_affected_paths() {
        let repos = repos();
        let syncer = RepoSyncer::new(config());
        commit(&repos.private, &[("packages/core/a.py", "a"), ("packages/core/b.py", "b")], "A");
        let preview = syncer
            .preview_between(&repos.private, &repos.public, SyncDirection::PrivateToPublic)
            .unwrap();
        assert_eq!(preview.pending.len(), 1);
        assert_eq!(preview.resume_point, None);
        assert_eq!(preview.affected, vec![("packages/core".to_string(), 2)]);
        assert!(repos.public.head_commit().is_err());
    }
}
