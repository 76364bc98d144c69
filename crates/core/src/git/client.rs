//! Local Git repository operations via `git2`.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, FixedOffset, TimeZone};
use git2::{
    Cred, CredentialType, Delta, DiffFindOptions, DiffOptions, ErrorCode, FetchOptions,
    IndexAddOption, Oid, PushOptions, RemoteCallbacks, Repository, RepositoryInitOptions,
    ResetType, Signature, Sort, Time,
};
use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;
use crate::git::remote_url::{redact_url, same_remote, TOKEN_USER};
use crate::git::repo::GitRepo;
use crate::models::{short_hash, CommitAuthor, CommitInfo, FileChange, ChangeKind};

/// Identity used for the committer when the repository has no `user.name`.
const FALLBACK_NAME: &str = "monosync";
const FALLBACK_EMAIL: &str = "monosync@localhost";

/// Credential callback invocations before giving up on a remote.
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// High-level Git client wrapping a `git2::Repository`.
pub struct GitClient {
    repo: Repository,
    repo_path: PathBuf,
    token: Option<String>,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        if repo.is_bare() {
            return Err(GitError::RepositoryNotFound(format!(
                "{} (bare repository has no working tree)",
                path.display()
            )));
        }
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
            token: None,
        })
    }

    /// Initialise a new repository whose HEAD points at `branch`.
    pub fn init<P: AsRef<Path>>(repo_path: P, branch: &str) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), branch, "initialising git repository");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(branch);
        let repo = Repository::init_opts(path, &opts)?;
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
            token: None,
        })
    }

    /// Attach a token used for HTTPS authentication on fetch/push.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Clone `url` into `path`, checking out `branch`.
    ///
    /// If the remote has no such branch (e.g. it is empty) the clone falls
    /// back to the remote's default and points HEAD at the unborn `branch`.
    #[instrument(skip(token), fields(url = %redact_url(url), path = %path.display()))]
    pub fn clone_repo(
        url: &str,
        path: &Path,
        remote: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<Self, GitError> {
        info!("cloning git repository");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let repo = match Self::clone_with(url, path, remote, Some(branch), token) {
            Ok(repo) => repo,
            Err(e) => {
                warn!(branch, error = %e, "clone of branch failed, retrying with remote default");
                if path.exists() {
                    std::fs::remove_dir_all(path)?;
                }
                let repo = Self::clone_with(url, path, remote, None, token)?;
                repo.set_head(&format!("refs/heads/{branch}"))?;
                repo
            }
        };

        info!("clone completed");
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
            token: token.map(str::to_string),
        })
    }

    fn clone_with(
        url: &str,
        path: &Path,
        remote: &str,
        branch: Option<&str>,
        token: Option<&str>,
    ) -> Result<Repository, GitError> {
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(remote_callbacks(token));
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        builder.remote_create(move |repo, _name, url| repo.remote(remote, url));
        if let Some(branch) = branch {
            builder.branch(branch);
        }
        Ok(builder.clone(url, path)?)
    }

    /// Make sure a usable clone of `url` exists at `path`.
    ///
    /// An existing clone whose `remote` points at `url` is refreshed (fetch
    /// and hard reset to `remote/branch`). A clone with a different remote,
    /// or one that cannot be opened or refreshed, is removed and cloned
    /// again. `force_reclone` always starts from scratch.
    #[instrument(skip(token), fields(url = %redact_url(url), path = %path.display()))]
    pub fn ensure_clone(
        url: &str,
        path: &Path,
        remote: &str,
        branch: &str,
        force_reclone: bool,
        token: Option<&str>,
    ) -> Result<Self, GitError> {
        if path.exists() {
            if force_reclone {
                info!("force re-clone requested, removing existing clone");
                std::fs::remove_dir_all(path)?;
            } else {
                match Self::reuse_clone(url, path, remote, branch, token) {
                    Ok(client) => return Ok(client),
                    Err(e) => {
                        warn!(error = %e, "existing clone is unusable, re-cloning");
                        std::fs::remove_dir_all(path)?;
                    }
                }
            }
        }
        Self::clone_repo(url, path, remote, branch, token)
    }

    fn reuse_clone(
        url: &str,
        path: &Path,
        remote: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<Self, GitError> {
        let client = Self::new(path)?.with_token(token.map(str::to_string));
        let existing = client.remote_url(remote)?.unwrap_or_default();
        if !same_remote(&existing, url) {
            return Err(GitError::RemoteMismatch {
                remote: remote.to_string(),
                expected: redact_url(url),
                found: redact_url(&existing),
            });
        }
        client.pull(remote, branch)?;
        debug!("reusing existing clone");
        Ok(client)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// URL configured for a named remote.
    pub fn remote_url(&self, remote: &str) -> Result<Option<String>, GitError> {
        let remote = self.repo.find_remote(remote)?;
        Ok(remote.url().map(str::to_string))
    }

    fn head_oid(&self) -> Result<Option<Oid>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn commit_info(&self, oid: Oid) -> Result<CommitInfo, GitError> {
        let commit = self.repo.find_commit(oid)?;
        let author = commit.author();
        let committer = commit.committer();
        let hash = oid.to_string();
        Ok(CommitInfo {
            short_hash: short_hash(&hash),
            message: commit.message().unwrap_or("").trim().to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_date: to_datetime(author.when()),
            committer_name: committer.name().unwrap_or("").to_string(),
            committer_email: committer.email().unwrap_or("").to_string(),
            commit_date: to_datetime(committer.when()),
            files_changed: self.diff_commit(&commit)?,
            hash,
        })
    }

    fn diff_commit(&self, commit: &git2::Commit<'_>) -> Result<Vec<FileChange>, GitError> {
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut opts = DiffOptions::new();
        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            let new_path = delta.new_file().path().map(path_string).transpose()?;
            let old_path = delta.old_file().path().map(path_string).transpose()?;
            let change = match (delta.status(), new_path, old_path) {
                (Delta::Added | Delta::Copied, Some(new), _) => FileChange::new(new, ChangeKind::Added),
                (Delta::Modified | Delta::Typechange, Some(new), _) => {
                    FileChange::new(new, ChangeKind::Modified)
                }
                (Delta::Deleted, _, Some(old)) => FileChange::new(old, ChangeKind::Deleted),
                (Delta::Renamed, Some(new), Some(old)) => FileChange::renamed(old, new),
                (status, new, old) => {
                    debug!(?status, ?new, ?old, "ignoring diff delta");
                    continue;
                }
            };
            changes.push(change);
        }
        Ok(changes)
    }

    fn default_signature(&self) -> Result<Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?),
        }
    }
}

impl GitRepo for GitClient {
    fn workdir(&self) -> &Path {
        self.repo.workdir().unwrap_or(&self.repo_path)
    }

    fn current_branch(&self) -> Result<String, GitError> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head
                .shorthand()
                .map(str::to_string)
                .ok_or_else(|| GitError::RefNotFound("HEAD".into())),
            Ok(_) => Err(GitError::RefNotFound("HEAD is detached".into())),
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD")?;
                head.symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(str::to_string)
                    .ok_or_else(|| GitError::RefNotFound("HEAD".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head_commit(&self) -> Result<String, GitError> {
        self.head_oid()?
            .map(|oid| oid.to_string())
            .ok_or_else(|| GitError::RefNotFound("HEAD has no commits".into()))
    }

    fn resolve_commit(&self, rev: &str) -> Result<Option<String>, GitError> {
        match self.repo.revparse_single(rev) {
            Ok(obj) => Ok(obj.peel_to_commit().ok().map(|c| c.id().to_string())),
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, paths), fields(paths = paths.len()))]
    fn commits_since(
        &self,
        since: Option<&str>,
        branch: Option<&str>,
        paths: &[String],
    ) -> Result<Vec<CommitInfo>, GitError> {
        let tip = match branch {
            Some(name) => match self.repo.find_reference(&format!("refs/heads/{name}")) {
                Ok(r) => Some(r.peel_to_commit()?.id()),
                Err(e) if e.code() == ErrorCode::NotFound => {
                    return Err(GitError::RefNotFound(format!("refs/heads/{name}")))
                }
                Err(e) => return Err(e.into()),
            },
            None => self.head_oid()?,
        };
        let Some(tip) = tip else {
            debug!("branch has no commits");
            return Ok(Vec::new());
        };

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(tip)?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        if let Some(since) = since {
            match self.resolve_commit(since)? {
                Some(hash) => revwalk.hide(Oid::from_str(&hash)?)?,
                None => warn!(since, "resume commit not found, enumerating full history"),
            }
        }

        let prefixes: Vec<String> = paths
            .iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let mut commits = Vec::new();
        for oid in revwalk {
            let info = self.commit_info(oid?)?;
            if prefixes.is_empty() || info.files_changed.iter().any(|c| touches(c, &prefixes)) {
                commits.push(info);
            }
        }
        commits.reverse();
        debug!(count = commits.len(), "collected commits");
        Ok(commits)
    }

    fn recent_messages(&self, limit: Option<usize>) -> Result<Vec<(String, String)>, GitError> {
        if self.head_oid()?.is_none() {
            return Ok(Vec::new());
        }
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mut messages = Vec::new();
        for oid in revwalk.take(limit.unwrap_or(usize::MAX)) {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            messages.push((oid.to_string(), commit.message().unwrap_or("").to_string()));
        }
        Ok(messages)
    }

    fn diff_against_parent(&self, commit: &str) -> Result<Vec<FileChange>, GitError> {
        let oid = Oid::from_str(commit)?;
        let commit = self.repo.find_commit(oid)?;
        self.diff_commit(&commit)
    }

    fn file_content_at(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let oid = Oid::from_str(commit)?;
        let tree = self.repo.find_commit(oid)?.tree()?;
        let entry = match tree.get_path(repo_relative(path)?) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(git2::ObjectType::Blob) {
            return Ok(None);
        }
        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }

    fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(repo_relative(path)?)?;
        }
        index.write()?;
        debug!(count = paths.len(), "staged files");
        Ok(())
    }

    fn stage_subtree(&self, prefix: &str) -> Result<(), GitError> {
        let prefix = prefix.trim_end_matches('/');
        repo_relative(prefix)?;
        let mut index = self.repo.index()?;
        index.add_all([prefix], IndexAddOption::DEFAULT, None)?;
        index.update_all([prefix], None)?;
        index.write()?;
        debug!(prefix, "staged subtree");
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), GitError> {
        let rel = repo_relative(path)?;
        let full = self.workdir().join(rel);
        match std::fs::remove_file(&full) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut index = self.repo.index()?;
        match index.remove_path(rel) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::NotFound => debug!(path, "path was not tracked"),
            Err(e) => return Err(e.into()),
        }
        index.write()?;
        Ok(())
    }

    fn is_tracked(&self, path: &str) -> Result<bool, GitError> {
        let index = self.repo.index()?;
        Ok(index.get_path(repo_relative(path)?, 0).is_some())
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        let head_tree = match self.head_oid()? {
            Some(oid) => Some(self.repo.find_commit(oid)?.tree()?),
            None => None,
        };
        let index = self.repo.index()?;
        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), None)?;
        Ok(diff.deltas().next().is_some())
    }

    #[instrument(skip(self, message, author))]
    fn commit(&self, message: &str, author: Option<&CommitAuthor>) -> Result<String, GitError> {
        let mut index = self.repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let parent = match self.head_oid()? {
            Some(oid) => Some(self.repo.find_commit(oid)?),
            None => None,
        };
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_oid,
            None => tree.is_empty(),
        };
        if unchanged {
            return Err(GitError::NothingToCommit);
        }

        let committer = self.default_signature()?;
        let author_sig = match author {
            Some(a) => {
                let when = Time::new(a.when.timestamp(), a.when.offset().local_minus_utc() / 60);
                Signature::new(&a.name, &a.email, &when)?
            }
            None => committer.clone(),
        };

        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &author_sig, &committer, message, &tree, &parents)?;
        info!(sha = %oid, "created commit");
        Ok(oid.to_string())
    }

    #[instrument(skip(self))]
    fn fetch(&self, remote_name: &str) -> Result<(), GitError> {
        info!(remote = remote_name, "fetching");
        let mut remote = self.repo.find_remote(remote_name)?;
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(remote_callbacks(self.token.as_deref()));
        remote.fetch(&[] as &[&str], Some(&mut fetch_opts), None)?;
        debug!("fetch completed");
        Ok(())
    }

    #[instrument(skip(self))]
    fn pull(&self, remote_name: &str, branch: &str) -> Result<(), GitError> {
        self.fetch(remote_name)?;
        let remote_ref = format!("refs/remotes/{remote_name}/{branch}");
        let target = match self.repo.find_reference(&remote_ref) {
            Ok(r) => r.peel_to_commit()?,
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!(remote_ref, "remote branch does not exist yet");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let local_ref = format!("refs/heads/{branch}");
        let local = match self.repo.find_reference(&local_ref) {
            Ok(r) => Some(r.peel_to_commit()?.id()),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        // Unpushed local commits on top of the remote tip are kept.
        let tip = match local {
            Some(local)
                if local != target.id() && self.repo.graph_descendant_of(local, target.id())? =>
            {
                info!(%local, remote = %target.id(), "local branch is ahead of remote, keeping it");
                self.repo.find_commit(local)?
            }
            _ => target,
        };

        self.repo
            .reference(&local_ref, tip.id(), true, "monosync: reset to remote")?;
        self.repo.set_head(&local_ref)?;
        self.repo.reset(tip.as_object(), ResetType::Hard, None)?;
        info!(sha = %tip.id(), "pull completed");
        Ok(())
    }

    #[instrument(skip(self))]
    fn push(&self, remote_name: &str, branch: &str) -> Result<(), GitError> {
        info!(remote = remote_name, branch, "pushing");
        let mut remote = self.repo.find_remote(remote_name)?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");

        let mut rejection: Option<String> = None;
        {
            let mut callbacks = remote_callbacks(self.token.as_deref());
            callbacks.push_update_reference(|refname, status| {
                if let Some(msg) = status {
                    warn!(refname, msg, "push rejected");
                    rejection = Some(msg.to_string());
                }
                Ok(())
            });
            let mut push_opts = PushOptions::new();
            push_opts.remote_callbacks(callbacks);
            remote.push(&[&refspec], Some(&mut push_opts))?;
        }

        if let Some(detail) = rejection {
            return Err(GitError::PushRejected {
                branch: branch.to_string(),
                detail,
            });
        }
        info!("push completed");
        Ok(())
    }

    fn is_ignored(&self, path: &str) -> Result<bool, GitError> {
        Ok(self.repo.is_path_ignored(repo_relative(path)?)?)
    }
}

/// Credentials: the token for HTTPS, the SSH agent for SSH URLs.
fn remote_callbacks(token: Option<&str>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed: credentials rejected"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Some(tok) = token {
                return Cred::userpass_plaintext(TOKEN_USER, tok);
            }
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        Cred::default()
    });
    callbacks
}

/// Whether a change touches one of the path prefixes (exact file or below a
/// directory).
fn touches(change: &FileChange, prefixes: &[String]) -> bool {
    std::iter::once(change.path.as_str())
        .chain(change.old_path.as_deref())
        .any(|path| {
            prefixes.iter().any(|prefix| {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
        })
}

/// Validate a repository-relative path.
fn repo_relative(path: &str) -> Result<&Path, GitError> {
    let p = Path::new(path);
    if path.is_empty()
        || p.is_absolute()
        || p.components().any(|c| matches!(c, Component::ParentDir))
    {
        return Err(GitError::InvalidPath(path.to_string()));
    }
    Ok(p)
}

fn path_string(path: &Path) -> Result<String, GitError> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| GitError::InvalidPath(path.display().to_string()))
}

/// Convert a git timestamp, keeping its UTC offset. Out-of-range values fall
/// back to the epoch.
fn to_datetime(time: Time) -> DateTime<FixedOffset> {
    let Some(offset) = FixedOffset::east_opt(time.offset_minutes() * 60) else {
        return DateTime::default();
    };
    offset
        .timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let full = dir.join(rel);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    fn author(name: &str, secs: i64) -> CommitAuthor {
        CommitAuthor {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            when: FixedOffset::east_opt(2 * 3600)
                .unwrap()
                .timestamp_opt(secs, 0)
                .unwrap(),
        }
    }

    fn commit_all(client: &GitClient, files: &[(&str, &str)], message: &str) -> String {
        let paths: Vec<String> = files.iter().map(|(p, _)| p.to_string()).collect();
        for (p, c) in files {
            write(client.workdir(), p, c);
        }
        client.stage(&paths).unwrap();
        client.commit(message, None).unwrap()
    }

    #[test]
    fn test_init_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        assert_eq!(client.current_branch().unwrap(), "main");
        assert!(client.head_commit().is_err());

        let sha = commit_all(&client, &[("hello.txt", "hello world")], "initial commit");
        assert_eq!(client.head_commit().unwrap(), sha);
        assert_eq!(client.current_branch().unwrap(), "main");
    }

    #[test]
    fn test_commit_preserves_author() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        write(dir.path(), "a.txt", "a");
        client.stage(&["a.txt".into()]).unwrap();
        let who = author("Ada", 1_700_000_000);
        let sha = client.commit("authored", Some(&who)).unwrap();

        let info = client.commit_info(Oid::from_str(&sha).unwrap()).unwrap();
        assert_eq!(info.author_name, "Ada");
        assert_eq!(info.author_email, "ada@example.com");
        assert_eq!(info.author_date, who.when);
        assert_eq!(info.author_date.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_nothing_to_commit() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        assert!(matches!(client.commit("empty", None), Err(GitError::NothingToCommit)));

        commit_all(&client, &[("a.txt", "a")], "first");
        client.stage(&["a.txt".into()]).unwrap();
        assert!(!client.has_staged_changes().unwrap());
        assert!(matches!(client.commit("again", None), Err(GitError::NothingToCommit)));
    }

    #[test]
    fn test_commits_since_order_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        let a = commit_all(&client, &[("pkg/a.txt", "1")], "A");
        let b = commit_all(&client, &[("other/x.txt", "1")], "B");
        let c = commit_all(&client, &[("pkg/a.txt", "2")], "C");

        let all = client.commits_since(None, None, &[]).unwrap();
        let hashes: Vec<&str> = all.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec![a.as_str(), b.as_str(), c.as_str()]);

        let pkg = client.commits_since(None, None, &["pkg".into()]).unwrap();
        assert_eq!(pkg.len(), 2);
        assert_eq!(pkg[0].message, "A");
        assert_eq!(pkg[1].message, "C");

        let after_a = client.commits_since(Some(&a), Some("main"), &["pkg/".into()]).unwrap();
        assert_eq!(after_a.len(), 1);
        assert_eq!(after_a[0].hash, c);
        assert_eq!(after_a[0].short_hash, &c[..8]);

        let none = client.commits_since(Some(&c), None, &[]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_commits_since_unknown_hash_enumerates_everything() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        commit_all(&client, &[("a.txt", "1")], "A");
        commit_all(&client, &[("a.txt", "2")], "B");
        let missing = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(client.commits_since(Some(missing), None, &[]).unwrap().len(), 2);
        assert_eq!(client.resolve_commit(missing).unwrap(), None);
    }

    #[test]
    fn test_path_prefix_does_not_match_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        commit_all(&client, &[("pkg-extra/a.txt", "1")], "sibling");
        assert!(client.commits_since(None, None, &["pkg".into()]).unwrap().is_empty());
    }

    #[test]
    fn test_file_content_at_reads_history() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        let first = commit_all(&client, &[("f.bin", "v1")], "v1");
        commit_all(&client, &[("f.bin", "v2")], "v2");

        assert_eq!(client.file_content_at(&first, "f.bin").unwrap().unwrap(), b"v1");
        assert_eq!(client.file_content_at(&first, "missing").unwrap(), None);
        assert!(client.file_content_at(&first, "../escape").is_err());
    }

    #[test]
    fn test_diff_against_parent_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        let root = commit_all(
            &client,
            &[("keep.txt", "k"), ("gone.txt", "g"), ("moved.txt", "same content here\n")],
            "root",
        );
        let root_changes = client.diff_against_parent(&root).unwrap();
        assert_eq!(root_changes.len(), 3);
        assert!(root_changes.iter().all(|c| c.kind == ChangeKind::Added));

        write(dir.path(), "keep.txt", "k2");
        std::fs::rename(dir.path().join("moved.txt"), dir.path().join("renamed.txt")).unwrap();
        client.remove("gone.txt").unwrap();
        client.remove("moved.txt").unwrap();
        client
            .stage(&["keep.txt".into(), "renamed.txt".into()])
            .unwrap();
        let second = client.commit("second", None).unwrap();

        let changes = client.diff_against_parent(&second).unwrap();
        assert!(changes.contains(&FileChange::new("keep.txt", ChangeKind::Modified)));
        assert!(changes.contains(&FileChange::new("gone.txt", ChangeKind::Deleted)));
        assert!(changes.contains(&FileChange::renamed("moved.txt", "renamed.txt")));
    }

    #[test]
    fn test_remove_tolerates_untracked_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        client.remove("never/existed.txt").unwrap();

        write(dir.path(), "loose.txt", "x");
        client.remove("loose.txt").unwrap();
        assert!(!dir.path().join("loose.txt").exists());

        commit_all(&client, &[("tracked.txt", "t")], "t");
        assert!(client.is_tracked("tracked.txt").unwrap());
        client.remove("tracked.txt").unwrap();
        assert!(!client.is_tracked("tracked.txt").unwrap());
        assert!(client.has_staged_changes().unwrap());
    }

    #[test]
    fn test_stage_subtree_records_deletions() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        commit_all(&client, &[("lib/a.txt", "a"), ("lib/b.txt", "b")], "init");

        std::fs::remove_dir_all(dir.path().join("lib")).unwrap();
        write(dir.path(), "lib/c.txt", "c");
        client.stage_subtree("lib/").unwrap();

        assert!(!client.is_tracked("lib/a.txt").unwrap());
        assert!(client.is_tracked("lib/c.txt").unwrap());
    }

    #[test]
    fn test_recent_messages_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        assert!(client.recent_messages(Some(10)).unwrap().is_empty());
        commit_all(&client, &[("a", "1")], "one");
        commit_all(&client, &[("a", "2")], "two");
        commit_all(&client, &[("a", "3")], "three");

        let msgs = client.recent_messages(Some(2)).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].1, "three");
        assert_eq!(msgs[1].1, "two");
        assert_eq!(client.recent_messages(None).unwrap().len(), 3);
    }

    #[test]
    fn test_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let client = GitClient::init(dir.path(), "main").unwrap();
        write(dir.path(), ".gitignore", "*.log\n");
        assert!(client.is_ignored("debug.log").unwrap());
        assert!(!client.is_ignored("main.rs").unwrap());
    }

    #[test]
    fn test_clone_push_and_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let origin_path = dir.path().join("origin");
        let origin = GitClient::init(&origin_path, "main").unwrap();
        commit_all(&origin, &[("README.md", "hi")], "seed");
        let bare_path = dir.path().join("bare.git");
        Repository::init_bare(&bare_path).unwrap();
        origin
            .repo()
            .remote("mirror", bare_path.to_str().unwrap())
            .unwrap();
        origin.push("mirror", "main").unwrap();

        let url = bare_path.to_str().unwrap();
        let clone_path = dir.path().join("clone");
        let clone = GitClient::ensure_clone(url, &clone_path, "origin", "main", false, None).unwrap();
        assert!(clone_path.join("README.md").exists());
        commit_all(&clone, &[("new.txt", "n")], "from clone");
        clone.push("origin", "main").unwrap();
        let pushed = clone.head_commit().unwrap();
        drop(clone);

        // Reuse: local junk is reset away, remote state wins.
        write(&clone_path, "README.md", "local edit");
        let again = GitClient::ensure_clone(url, &clone_path, "origin", "main", false, None).unwrap();
        assert_eq!(again.head_commit().unwrap(), pushed);
        assert_eq!(std::fs::read_to_string(clone_path.join("README.md")).unwrap(), "hi");
    }

    #[test]
    fn test_pull_keeps_unpushed_local_commits() {
        let dir = tempfile::tempdir().unwrap();
        let origin = GitClient::init(dir.path().join("origin"), "main").unwrap();
        commit_all(&origin, &[("a.txt", "a")], "seed");
        let url = dir.path().join("origin");
        let url = url.to_str().unwrap();
        let clone_path = dir.path().join("clone");

        let clone = GitClient::ensure_clone(url, &clone_path, "origin", "main", false, None).unwrap();
        let local = commit_all(&clone, &[("b.txt", "b")], "unpushed");
        drop(clone);

        let again = GitClient::ensure_clone(url, &clone_path, "origin", "main", false, None).unwrap();
        assert_eq!(again.head_commit().unwrap(), local);
        assert!(clone_path.join("b.txt").exists());
    }

    #[test]
    fn test_ensure_clone_replaces_foreign_clone() {
        let dir = tempfile::tempdir().unwrap();
        let first = GitClient::init(dir.path().join("first"), "main").unwrap();
        commit_all(&first, &[("first.txt", "1")], "first");
        let second = GitClient::init(dir.path().join("second"), "main").unwrap();
        commit_all(&second, &[("second.txt", "2")], "second");

        let clone_path = dir.path().join("clone");
        let url1 = dir.path().join("first");
        let url2 = dir.path().join("second");
        GitClient::ensure_clone(url1.to_str().unwrap(), &clone_path, "origin", "main", false, None)
            .unwrap();
        assert!(clone_path.join("first.txt").exists());

        GitClient::ensure_clone(url2.to_str().unwrap(), &clone_path, "origin", "main", false, None)
            .unwrap();
        assert!(clone_path.join("second.txt").exists());
        assert!(!clone_path.join("first.txt").exists());
    }

    #[test]
    fn test_open_missing_repo() {
        assert!(matches!(
            GitClient::new("/nonexistent/repo"),
            Err(GitError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_touches() {
        let prefixes = vec!["pkg".to_string(), "LICENSE".to_string()];
        assert!(touches(&FileChange::new("pkg/a", ChangeKind::Added), &prefixes));
        assert!(touches(&FileChange::new("LICENSE", ChangeKind::Modified), &prefixes));
        assert!(!touches(&FileChange::new("pkgx/a", ChangeKind::Added), &prefixes));
        assert!(touches(&FileChange::renamed("pkg/a", "elsewhere/a"), &prefixes));
    }
}
