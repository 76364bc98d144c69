//! TOML-based configuration for monosync.
//!
//! A [`SyncConfig`] names the private repository (a local checkout), the
//! public repository (a remote URL plus a managed local clone), and the
//! project/file mappings whose content is allowed to cross between them.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::models::SyncDirection;

/// Default number of destination commits scanned for a provenance trailer.
pub const DEFAULT_PROVENANCE_LOOKBACK: usize = 100;

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

/// A directory that is synchronized between the two repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMapping {
    /// Path relative to the private repo root.
    pub private_path: String,

    /// Path relative to the public repo root. Defaults to `private_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,

    /// Whether to include this project in sync.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Glob patterns for files to exclude, matched against the path relative
    /// to the project root and against each of its segments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_patterns: Vec<String>,

    /// When non-empty, only files matching one of these are synced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_patterns: Vec<String>,
}

impl ProjectMapping {
    pub fn new(private_path: impl Into<String>) -> Self {
        Self {
            private_path: private_path.into(),
            public_path: None,
            enabled: true,
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
        }
    }

    pub fn resolved_public_path(&self) -> &str {
        self.public_path.as_deref().unwrap_or(&self.private_path)
    }

    /// `(source, destination)` roots for a direction.
    pub fn oriented(&self, direction: SyncDirection) -> (&str, &str) {
        orient(&self.private_path, self.resolved_public_path(), direction)
    }
}

/// A single file that is synchronized between the two repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    pub private_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl FileMapping {
    pub fn new(private_path: impl Into<String>) -> Self {
        Self {
            private_path: private_path.into(),
            public_path: None,
            enabled: true,
        }
    }

    pub fn resolved_public_path(&self) -> &str {
        self.public_path.as_deref().unwrap_or(&self.private_path)
    }

    pub fn oriented(&self, direction: SyncDirection) -> (&str, &str) {
        orient(&self.private_path, self.resolved_public_path(), direction)
    }
}

fn orient<'a>(private: &'a str, public: &'a str, direction: SyncDirection) -> (&'a str, &'a str) {
    match direction {
        SyncDirection::PrivateToPublic => (private, public),
        SyncDirection::PublicToPrivate => (public, private),
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Path to the private monorepo checkout.
    pub private_repo_path: PathBuf,

    /// Git remote name for the private repo.
    #[serde(default = "default_remote")]
    pub private_remote: String,

    /// Default branch in the private repo.
    #[serde(default = "default_branch")]
    pub private_branch: String,

    /// Git remote URL for the public monorepo.
    pub public_repo_url: String,

    /// Local path of the managed public clone. Derived from the URL when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_repo_clone_path: Option<PathBuf>,

    #[serde(default = "default_remote")]
    pub public_remote: String,

    #[serde(default = "default_branch")]
    pub public_branch: String,

    /// Prefix added to every replicated commit message.
    #[serde(default = "default_commit_prefix")]
    pub commit_prefix: String,

    /// Patterns excluded from every project.
    #[serde(default = "default_global_excludes")]
    pub global_exclude_patterns: Vec<String>,

    /// Number of destination commits scanned for the last `synced_from:`
    /// trailer. 0 = scan the whole branch.
    #[serde(default = "default_provenance_lookback")]
    pub provenance_lookback: usize,

    /// Skip source commits that were themselves produced by a sync in the
    /// opposite direction.
    #[serde(default = "default_true")]
    pub skip_echo_commits: bool,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub auto_push: bool,

    /// Replay all pending commits as one destination commit.
    #[serde(default)]
    pub squash_commits: bool,

    #[serde(default)]
    pub projects: Vec<ProjectMapping>,

    #[serde(default)]
    pub files: Vec<FileMapping>,
}

fn default_true() -> bool {
    true
}

fn default_remote() -> String {
    "origin".into()
}

fn default_branch() -> String {
    "main".into()
}

fn default_commit_prefix() -> String {
    "[sync]".into()
}

fn default_provenance_lookback() -> usize {
    DEFAULT_PROVENANCE_LOOKBACK
}

/// Secrets, VCS internals and dependency caches.
pub fn default_global_excludes() -> Vec<String> {
    [
        ".env",
        ".env.*",
        "*.secret",
        "*.secrets",
        ".secrets/",
        "__pycache__/",
        "*.pyc",
        ".git/",
        "node_modules/",
        ".nx/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Root directory for managed public clones (`~/.monosync/repos`).
pub fn default_clone_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".monosync")
        .join("repos")
}

/// Extract the repository name from a git URL.
///
/// Handles `git@host:org/repo.git`, `https://host/org/repo.git` and
/// `https://host/org/repo/`.
pub fn repo_name_from_url(url: &str) -> String {
    let mut name = url.trim().trim_end_matches('/');
    if let Some(stripped) = name.strip_suffix(".git") {
        name = stripped;
    }
    let name = match name.rsplit_once('/') {
        Some((_, last)) => last,
        None => name.rsplit_once(':').map_or(name, |(_, last)| last),
    };
    if name.is_empty() {
        "public-repo".into()
    } else {
        name.to_string()
    }
}

impl SyncConfig {
    /// Build a config with defaults for everything but the two repositories.
    pub fn new(private_repo_path: impl Into<PathBuf>, public_repo_url: impl Into<String>) -> Self {
        Self {
            private_repo_path: private_repo_path.into(),
            private_remote: default_remote(),
            private_branch: default_branch(),
            public_repo_url: public_repo_url.into(),
            public_repo_clone_path: None,
            public_remote: default_remote(),
            public_branch: default_branch(),
            commit_prefix: default_commit_prefix(),
            global_exclude_patterns: default_global_excludes(),
            provenance_lookback: default_provenance_lookback(),
            skip_echo_commits: true,
            dry_run: false,
            auto_push: false,
            squash_commits: false,
            projects: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Local path of the public clone.
    pub fn public_repo_path(&self) -> PathBuf {
        match &self.public_repo_clone_path {
            Some(path) => expand_tilde(path),
            None => default_clone_dir().join(repo_name_from_url(&self.public_repo_url)),
        }
    }

    /// Private repo path with `~` expanded.
    pub fn private_repo_path(&self) -> PathBuf {
        expand_tilde(&self.private_repo_path)
    }

    pub fn enabled_projects(&self) -> impl Iterator<Item = &ProjectMapping> {
        self.projects.iter().filter(|p| p.enabled)
    }

    pub fn enabled_files(&self) -> impl Iterator<Item = &FileMapping> {
        self.files.iter().filter(|f| f.enabled)
    }

    /// Source-side paths of every enabled mapping, used to restrict history
    /// enumeration.
    pub fn source_paths(&self, direction: SyncDirection) -> Vec<String> {
        self.enabled_projects()
            .map(|p| p.oriented(direction).0.trim_end_matches('/').to_string())
            .chain(self.enabled_files().map(|f| f.oriented(direction).0.to_string()))
            .collect()
    }

    /// `(remote, branch)` of the destination repository for a direction.
    pub fn dest_remote(&self, direction: SyncDirection) -> (&str, &str) {
        match direction {
            SyncDirection::PrivateToPublic => (&self.public_remote, &self.public_branch),
            SyncDirection::PublicToPrivate => (&self.private_remote, &self.private_branch),
        }
    }

    // -----------------------------------------------------------------------
    // Mapping edits
    // -----------------------------------------------------------------------

    pub fn add_project(&mut self, project: ProjectMapping) -> Result<(), ConfigError> {
        if self.projects.iter().any(|p| p.private_path == project.private_path) {
            return Err(ConfigError::DuplicateMapping {
                kind: "project",
                path: project.private_path,
            });
        }
        self.projects.push(project);
        Ok(())
    }

    pub fn remove_project(&mut self, private_path: &str) -> Result<ProjectMapping, ConfigError> {
        let idx = self
            .projects
            .iter()
            .position(|p| p.private_path == private_path)
            .ok_or_else(|| ConfigError::MappingNotFound {
                kind: "project",
                path: private_path.to_string(),
            })?;
        Ok(self.projects.remove(idx))
    }

    pub fn add_file(&mut self, file: FileMapping) -> Result<(), ConfigError> {
        if self.files.iter().any(|f| f.private_path == file.private_path) {
            return Err(ConfigError::DuplicateMapping {
                kind: "file",
                path: file.private_path,
            });
        }
        self.files.push(file);
        Ok(())
    }

    pub fn remove_file(&mut self, private_path: &str) -> Result<FileMapping, ConfigError> {
        let idx = self
            .files
            .iter()
            .position(|f| f.private_path == private_path)
            .ok_or_else(|| ConfigError::MappingNotFound {
                kind: "file",
                path: private_path.to_string(),
            })?;
        Ok(self.files.remove(idx))
    }

    // -----------------------------------------------------------------------
    // Loading & saving
    // -----------------------------------------------------------------------

    /// Load a [`SyncConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(
            projects = config.projects.len(),
            files = config.files.len(),
            "configuration parsed successfully"
        );
        Ok(config)
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config back as TOML.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        info!(path = %path.display(), "configuration written");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.private_repo_path.as_os_str().is_empty() {
            return Err(invalid("private_repo_path", "must not be empty"));
        }
        if self.public_repo_url.trim().is_empty() {
            return Err(invalid("public_repo_url", "must not be empty"));
        }
        for (field, value) in [
            ("private_remote", &self.private_remote),
            ("private_branch", &self.private_branch),
            ("public_remote", &self.public_remote),
            ("public_branch", &self.public_branch),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        if self.commit_prefix.trim().is_empty() {
            return Err(invalid(
                "commit_prefix",
                "must not be empty; it marks replicated commits",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for project in &self.projects {
            validate_mapping_path("projects.private_path", &project.private_path)?;
            if let Some(public) = &project.public_path {
                validate_mapping_path("projects.public_path", public)?;
            }
            if !seen.insert(project.private_path.trim_end_matches('/')) {
                return Err(ConfigError::DuplicateMapping {
                    kind: "project",
                    path: project.private_path.clone(),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for file in &self.files {
            validate_mapping_path("files.private_path", &file.private_path)?;
            if let Some(public) = &file.public_path {
                validate_mapping_path("files.public_path", public)?;
            }
            if !seen.insert(file.private_path.as_str()) {
                return Err(ConfigError::DuplicateMapping {
                    kind: "file",
                    path: file.private_path.clone(),
                });
            }
        }

        Ok(())
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# monosync configuration

private_repo_path = "."
private_remote = "origin"
private_branch = "main"

public_repo_url = "git@github.com:your-org/your-public-repo.git"
# public_repo_clone_path = "~/.monosync/repos/your-public-repo"  # derived from the URL
public_remote = "origin"
public_branch = "main"

commit_prefix = "[sync]"
# provenance_lookback = 100  # 0 = scan the whole branch
skip_echo_commits = true
auto_push = false
squash_commits = false

global_exclude_patterns = [
    ".env",
    ".env.*",
    "*.secret",
    "*.secrets",
    ".secrets/",
    "__pycache__/",
    "*.pyc",
    ".git/",
    "node_modules/",
    ".nx/",
]

[[projects]]
private_path = "packages/core"
# public_path = "libs/core"
enabled = true
# exclude_patterns = ["*.log"]
# include_patterns = []

[[files]]
private_path = "LICENSE"
enabled = true
"#
    }
}

fn invalid(field: &str, detail: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        detail: detail.into(),
    }
}

/// Mapping paths are repository-relative, forward-slash, and stay inside the
/// repository.
fn validate_mapping_path(field: &str, path: &str) -> Result<(), ConfigError> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    let p = Path::new(trimmed);
    if p.is_absolute() || trimmed.starts_with('/') {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: format!("'{path}' must be relative to the repository root"),
        });
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: format!("'{path}' must not contain '..'"),
        });
    }
    Ok(())
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
