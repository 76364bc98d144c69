//! Git operations for monosync.

pub mod client;
pub mod remote_url;
pub mod repo;

pub use client::GitClient;
pub use repo::GitRepo;
