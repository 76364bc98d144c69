//! Error types for the monosync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. Binaries
//! wrap them in `anyhow` at the boundary.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A ref (branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// Push was rejected (e.g. non-fast-forward).
    #[error("git push rejected for branch '{branch}': {detail}")]
    PushRejected {
        branch: String,
        detail: String,
    },

    /// An existing clone tracks a different remote URL.
    #[error("remote '{remote}' points at '{found}', expected '{expected}'")]
    RemoteMismatch {
        remote: String,
        expected: String,
        found: String,
    },

    /// The index tree is identical to HEAD's tree.
    #[error("nothing to commit")]
    NothingToCommit,

    /// A repository-relative path was rejected (absolute, `..`, non UTF-8).
    #[error("invalid repository path '{0}'")]
    InvalidPath(String),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sync engine errors
// ---------------------------------------------------------------------------

/// Errors from the synchronization engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Replication of a single source commit failed.
    #[error("error syncing {short_hash}: {source}")]
    Replication {
        short_hash: String,
        #[source]
        source: Box<SyncError>,
    },

    /// A destination file could not be written or removed.
    #[error("failed to materialize '{path}': {source}")]
    Materialize {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The destination clone could not be prepared.
    #[error("failed to prepare destination clone at '{path}': {detail}")]
    CloneFailed {
        path: String,
        detail: String,
    },

    /// Underlying Git error during sync.
    #[error("sync Git error: {0}")]
    GitError(#[from] GitError),

    /// Generic I/O error during sync.
    #[error("sync I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// TOML serialization error.
    #[error("configuration serialize error: {0}")]
    SerializeError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// A mapping with the same source path already exists.
    #[error("{kind} already exists: {path}")]
    DuplicateMapping {
        kind: &'static str,
        path: String,
    },

    /// No mapping with the given source path exists.
    #[error("{kind} not found: {path}")]
    MappingNotFound {
        kind: &'static str,
        path: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
