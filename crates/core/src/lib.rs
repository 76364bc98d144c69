//! monosync core library.
//!
//! This crate provides the building blocks for commit-level synchronization
//! between a private and a public git monorepo: configuration, path
//! filtering, change classification, provenance trailers, commit
//! replication, and the sync orchestrator.

pub mod classifier;
pub mod config;
pub mod errors;
pub mod git;
pub mod models;
pub mod path_filter;
pub mod provenance;
pub mod replicator;
pub mod report;
pub mod sync_engine;

// Re-exports for convenience.
pub use config::{FileMapping, ProjectMapping, SyncConfig};
pub use errors::{ConfigError, GitError, SyncError};
pub use git::{GitClient, GitRepo};
pub use models::{CommitOutcome, SyncDirection, SyncResult};
pub use report::{NullReporter, SyncReporter};
pub use sync_engine::RepoSyncer;
