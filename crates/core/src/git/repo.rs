//! The [`GitRepo`] trait: the repository capability the sync engine needs.
//!
//! The sync engine never touches `git2` directly; it programs against this
//! trait so the replicator and orchestrator can be driven by any backend.
//! The trait is object-safe and used as `&dyn GitRepo`.
//!
//! | Group    | Methods                                                        |
//! |----------|----------------------------------------------------------------|
//! | Refs     | `current_branch`, `head_commit`, `resolve_commit`              |
//! | History  | `commits_since`, `recent_messages`, `diff_against_parent`      |
//! | Objects  | `file_content_at`                                              |
//! | Index    | `stage`, `stage_subtree`, `remove`, `is_tracked`, `has_staged_changes` |
//! | Commit   | `commit`                                                       |
//! | Remote   | `fetch`, `pull`, `push`                                        |
//! | Ignore   | `is_ignored`                                                   |

use std::path::Path;

use crate::errors::GitError;
use crate::models::{CommitAuthor, CommitInfo, FileChange};

pub trait GitRepo {
    /// Root of the working tree.
    fn workdir(&self) -> &Path;

    // -----------------------------------------------------------------------
    // Refs
    // -----------------------------------------------------------------------

    /// Name of the checked-out branch (also for an unborn branch).
    fn current_branch(&self) -> Result<String, GitError>;

    /// Full hash of HEAD.
    fn head_commit(&self) -> Result<String, GitError>;

    /// Resolve a revision to a full commit hash, `None` if it does not exist.
    fn resolve_commit(&self, rev: &str) -> Result<Option<String>, GitError>;

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Commits reachable from `branch` (current branch when `None`) but not
    /// from `since`, oldest first. When `paths` is non-empty only commits that
    /// touch one of them are returned. An unresolvable `since` enumerates the
    /// whole branch.
    fn commits_since(
        &self,
        since: Option<&str>,
        branch: Option<&str>,
        paths: &[String],
    ) -> Result<Vec<CommitInfo>, GitError>;

    /// `(hash, message)` of the most recent commits on the current branch,
    /// newest first. `None` walks the whole branch.
    fn recent_messages(&self, limit: Option<usize>) -> Result<Vec<(String, String)>, GitError>;

    /// Changes a commit made relative to its first parent.
    fn diff_against_parent(&self, commit: &str) -> Result<Vec<FileChange>, GitError>;

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Bytes of `path` as of `commit`, `None` if the path is not a blob there.
    fn file_content_at(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, GitError>;

    // -----------------------------------------------------------------------
    // Index
    // -----------------------------------------------------------------------

    /// Stage working-tree files.
    fn stage(&self, paths: &[String]) -> Result<(), GitError>;

    /// Stage additions, modifications and deletions under a directory.
    fn stage_subtree(&self, prefix: &str) -> Result<(), GitError>;

    /// Delete a working-tree file and drop it from the index. Missing files
    /// and untracked paths are not errors.
    fn remove(&self, path: &str) -> Result<(), GitError>;

    fn is_tracked(&self, path: &str) -> Result<bool, GitError>;

    /// Whether the index differs from HEAD.
    fn has_staged_changes(&self) -> Result<bool, GitError>;

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Commit the index on the current branch. `author` overrides the author
    /// identity and date; the committer is always the local identity.
    /// Returns [`GitError::NothingToCommit`] when the tree equals HEAD's.
    fn commit(&self, message: &str, author: Option<&CommitAuthor>) -> Result<String, GitError>;

    // -----------------------------------------------------------------------
    // Remote
    // -----------------------------------------------------------------------

    fn fetch(&self, remote: &str) -> Result<(), GitError>;

    /// Fetch and hard-reset the local `branch` to `remote/branch`. A local
    /// branch strictly ahead of the remote keeps its tip (the working tree is
    /// still reset to it).
    fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Ignore rules
    // -----------------------------------------------------------------------

    fn is_ignored(&self, path: &str) -> Result<bool, GitError>;
}
