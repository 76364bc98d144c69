//! Domain model types used throughout monosync.
//!
//! These types bridge the git layer, the sync engine, and the CLI renderer.
//! All of them are per-run value objects; the only durable state is the
//! provenance trailer written into destination commit messages.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sync direction
// ---------------------------------------------------------------------------

/// Which repository is the source for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    PrivateToPublic,
    PublicToPrivate,
}

impl SyncDirection {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Self::PrivateToPublic => Self::PublicToPrivate,
            Self::PublicToPrivate => Self::PrivateToPublic,
        }
    }

    /// Human label of the source side (`private` / `public`).
    pub fn source_label(self) -> &'static str {
        match self {
            Self::PrivateToPublic => "private",
            Self::PublicToPrivate => "public",
        }
    }

    /// Human label of the destination side.
    pub fn dest_label(self) -> &'static str {
        self.reverse().source_label()
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateToPublic => write!(f, "private-to-public"),
            Self::PublicToPrivate => write!(f, "public-to-private"),
        }
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private-to-public" => Ok(Self::PrivateToPublic),
            "public-to-private" => Ok(Self::PublicToPrivate),
            other => Err(format!(
                "unknown direction '{other}' (expected private-to-public or public-to-private)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// File changes
// ---------------------------------------------------------------------------

/// Kind of change a commit made to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    /// Single-letter code as printed by `git log --name-status`.
    pub fn code(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
        }
    }
}

/// One file's status within a commit.
///
/// `path` is named in the commit's own repository. For renames `old_path`
/// carries the prior name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
    pub old_path: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            old_path: None,
        }
    }

    pub fn renamed(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Renamed,
            old_path: Some(old_path.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

/// Immutable snapshot of one source commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub short_hash: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<FixedOffset>,
    pub committer_name: String,
    pub committer_email: String,
    pub commit_date: DateTime<FixedOffset>,
    pub files_changed: Vec<FileChange>,
}

impl CommitInfo {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Author identity used when replaying this commit elsewhere.
    pub fn author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
            when: self.author_date,
        }
    }
}

/// Shorten a full hash to the 8-character display form.
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(8).collect()
}

/// Author attribution for a destination commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of replicating one source commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A destination commit was created.
    Replicated { hash: String, files: usize },
    /// The commit touched nothing the mappings care about, or the resulting
    /// tree was identical to the destination HEAD.
    NoRelevantChange,
    /// Dry-run: the commit would have touched `files` destination paths.
    WouldReplicate { files: usize },
    /// Replication failed; the run stops here.
    Failed(String),
}

impl CommitOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Replicated { .. } => "replicated",
            Self::NoRelevantChange => "no-change",
            Self::WouldReplicate { .. } => "would-replicate",
            Self::Failed(_) => "failed",
        }
    }
}

/// Outcome of one sync invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub dry_run: bool,
    pub commits_synced: usize,
    pub commits_skipped: usize,
    pub files_changed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// source hash -> destination hash
    pub commit_mappings: BTreeMap<String, String>,
}

impl SyncResult {
    pub fn new(dry_run: bool) -> Self {
        Self {
            success: true,
            dry_run,
            ..Default::default()
        }
    }

    /// Record a failure and flip the success flag.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }
}

// ---------------------------------------------------------------------------
// Preview / status
// ---------------------------------------------------------------------------

/// What a sync would do, without doing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPreview {
    pub direction: SyncDirection,
    pub resume_point: Option<String>,
    pub pending: Vec<CommitInfo>,
    /// Pending source commits that are echoes of the opposite direction.
    pub echoes: usize,
    /// (mapping source path, relevant file changes across pending commits)
    pub affected: Vec<(String, usize)>,
}

/// State of one direction as recovered from history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionStatus {
    pub direction: SyncDirection,
    pub last_synced: Result<Option<String>, String>,
    pub pending: Result<usize, String>,
}
