//! Change classification: which file changes of a commit matter to a mapping,
//! and where they land in the destination repository.
//!
//! Directory mappings match on the source prefix (`<root>/`) and run the
//! project-relative remainder through the [`PathFilter`]. Single-file mappings
//! match on exact path equality and are never pattern-filtered. A rename is
//! treated as a removal of the old path plus a write of the new one, each
//! side judged on its own.

use tracing::trace;

use crate::config::{FileMapping, ProjectMapping, SyncConfig};
use crate::models::{ChangeKind, CommitInfo, FileChange, SyncDirection};
use crate::path_filter::PathFilter;

/// What has to happen to one destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedAction {
    /// Write the file's bytes as of the source commit.
    Write,
    /// Remove the destination file.
    Remove,
}

/// A relevant change translated into the destination namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedChange {
    pub action: MappedAction,
    pub source_path: String,
    pub dest_path: String,
}

impl MappedChange {
    fn write(source_path: &str, dest_path: String) -> Self {
        Self {
            action: MappedAction::Write,
            source_path: source_path.to_string(),
            dest_path,
        }
    }

    fn remove(source_path: &str, dest_path: String) -> Self {
        Self {
            action: MappedAction::Remove,
            source_path: source_path.to_string(),
            dest_path,
        }
    }
}

/// Split a change into `(path, action)` pairs; renames become two.
fn actions(change: &FileChange) -> Vec<(&str, MappedAction)> {
    match change.kind {
        ChangeKind::Added | ChangeKind::Modified => vec![(change.path.as_str(), MappedAction::Write)],
        ChangeKind::Deleted => vec![(change.path.as_str(), MappedAction::Remove)],
        ChangeKind::Renamed => {
            let mut out = Vec::with_capacity(2);
            if let Some(old) = change.old_path.as_deref() {
                out.push((old, MappedAction::Remove));
            }
            out.push((change.path.as_str(), MappedAction::Write));
            out
        }
    }
}

fn mapped(path: &str, action: MappedAction, dest_path: String) -> MappedChange {
    match action {
        MappedAction::Write => MappedChange::write(path, dest_path),
        MappedAction::Remove => MappedChange::remove(path, dest_path),
    }
}

/// Relevant changes of `commit` for a directory mapping.
pub fn relevant_changes(
    commit: &CommitInfo,
    project: &ProjectMapping,
    direction: SyncDirection,
    global_excludes: &[String],
) -> Vec<MappedChange> {
    let (src_root, dst_root) = project.oriented(direction);
    let src_prefix = format!("{}/", src_root.trim_end_matches('/'));
    let dst_root = dst_root.trim_end_matches('/');
    let filter = PathFilter::for_project(project, global_excludes);

    let mut out = Vec::new();
    for change in &commit.files_changed {
        for (path, action) in actions(change) {
            let Some(rel) = path.strip_prefix(&src_prefix) else {
                continue;
            };
            let decision = filter.evaluate(rel);
            if !decision.is_included() {
                trace!(path, decision = decision.label(), "change filtered out");
                continue;
            }
            out.push(mapped(path, action, format!("{dst_root}/{rel}")));
        }
    }
    out
}

/// Relevant changes of `commit` for a single-file mapping.
pub fn relevant_file_changes(
    commit: &CommitInfo,
    file: &FileMapping,
    direction: SyncDirection,
) -> Vec<MappedChange> {
    let (src, dst) = file.oriented(direction);
    commit
        .files_changed
        .iter()
        .flat_map(actions)
        .filter(|(path, _)| *path == src)
        .map(|(path, action)| mapped(path, action, dst.to_string()))
        .collect()
}

/// All relevant changes of `commit` across the enabled mappings of `config`,
/// directory mappings first, in change order.
pub fn classify_commit(
    commit: &CommitInfo,
    config: &SyncConfig,
    direction: SyncDirection,
) -> Vec<MappedChange> {
    let mut out: Vec<MappedChange> = config
        .enabled_projects()
        .flat_map(|p| relevant_changes(commit, p, direction, &config.global_exclude_patterns))
        .collect();
    out.extend(
        config
            .enabled_files()
            .flat_map(|f| relevant_file_changes(commit, f, direction)),
    );
    out
}

/// Number of relevant changes per enabled mapping (keyed by its source path)
/// across `commits`. Mappings with no relevant change are omitted.
pub fn affected_counts(
    commits: &[CommitInfo],
    config: &SyncConfig,
    direction: SyncDirection,
) -> Vec<(String, usize)> {
    let globals = &config.global_exclude_patterns;
    let projects = config.enabled_projects().map(|p| {
        let count = commits
            .iter()
            .map(|c| relevant_changes(c, p, direction, globals).len())
            .sum();
        (p.oriented(direction).0.to_string(), count)
    });
    let files = config.enabled_files().map(|f| {
        let count = commits
            .iter()
            .map(|c| relevant_file_changes(c, f, direction).len())
            .sum();
        (f.oriented(direction).0.to_string(), count)
    });
    projects.chain(files).filter(|(_, n)| *n > 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_global_excludes;
    use chrono::{FixedOffset, TimeZone};

    fn commit(changes: Vec<FileChange>) -> CommitInfo {
        let when = FixedOffset::east_opt(0).unwrap().timestamp_opt(1_700_000_000, 0).unwrap();
        CommitInfo {
            hash: "a".repeat(40),
            short_hash: "a".repeat(8),
            message: "change".into(),
            author_name: "Dev".into(),
            author_email: "dev@example.com".into(),
            author_date: when,
            committer_name: "Dev".into(),
            committer_email: "dev@example.com".into(),
            commit_date: when,
            files_changed: changes,
        }
    }

    fn core_mapping() -> ProjectMapping {
        let mut project = ProjectMapping::new("packages/core");
        project.public_path = Some("libs/core".into());
        project
    }

    #[test]
    fn test_directory_mapping_translates_and_filters() {
        let c = commit(vec![
            FileChange::new("packages/core/src/index.py", ChangeKind::Added),
            FileChange::new("packages/core/.env", ChangeKind::Added),
            FileChange::new("packages/other/x.py", ChangeKind::Modified),
            FileChange::new("packages/core-extra/y.py", ChangeKind::Modified),
        ]);
        let changes = relevant_changes(
            &c,
            &core_mapping(),
            SyncDirection::PrivateToPublic,
            &default_global_excludes(),
        );
        assert_eq!(
            changes,
            vec![MappedChange::write("packages/core/src/index.py", "libs/core/src/index.py".into())]
        );
    }

    #[test]
    fn test_reverse_direction_swaps_roots() {
        let c = commit(vec![
            FileChange::new("libs/core/a.py", ChangeKind::Deleted),
            FileChange::new("packages/core/b.py", ChangeKind::Added),
        ]);
        let changes = relevant_changes(&c, &core_mapping(), SyncDirection::PublicToPrivate, &[]);
        assert_eq!(
            changes,
            vec![MappedChange::remove("libs/core/a.py", "packages/core/a.py".into())]
        );
    }

    #[test]
    fn test_rename_split_by_relevance() {
        let c = commit(vec![
            FileChange::renamed("packages/core/old.py", "packages/core/new.py"),
            FileChange::renamed("packages/core/moved.py", "elsewhere/moved.py"),
            FileChange::renamed("elsewhere/in.py", "packages/core/in.py"),
        ]);
        let changes = relevant_changes(&c, &core_mapping(), SyncDirection::PrivateToPublic, &[]);
        let summary: Vec<(MappedAction, &str)> = changes
            .iter()
            .map(|m| (m.action, m.dest_path.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (MappedAction::Remove, "libs/core/old.py"),
                (MappedAction::Write, "libs/core/new.py"),
                (MappedAction::Remove, "libs/core/moved.py"),
                (MappedAction::Write, "libs/core/in.py"),
            ]
        );
    }

    #[test]
    fn test_include_patterns_apply_to_relative_path() {
        let mut project = core_mapping();
        project.include_patterns = vec!["src/**".into()];
        let c = commit(vec![
            FileChange::new("packages/core/src/a.py", ChangeKind::Added),
            FileChange::new("packages/core/README.md", ChangeKind::Added),
        ]);
        let changes = relevant_changes(&c, &project, SyncDirection::PrivateToPublic, &[]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].dest_path, "libs/core/src/a.py");
    }

    #[test]
    fn test_file_mapping_exact_match_no_filtering() {
        let mut file = FileMapping::new(".env.example");
        file.public_path = Some("config/.env.example".into());
        let c = commit(vec![
            FileChange::new(".env.example", ChangeKind::Modified),
            FileChange::new("sub/.env.example", ChangeKind::Modified),
        ]);
        let changes = relevant_file_changes(&c, &file, SyncDirection::PrivateToPublic);
        assert_eq!(
            changes,
            vec![MappedChange::write(".env.example", "config/.env.example".into())]
        );
    }

    #[test]
    fn test_classify_commit_and_affected_counts() {
        let mut config = SyncConfig::new("/p", "https://example.com/o/r.git");
        config.projects.push(core_mapping());
        let mut disabled = ProjectMapping::new("packages/secret");
        disabled.enabled = false;
        config.projects.push(disabled);
        config.files.push(FileMapping::new("LICENSE"));

        let c1 = commit(vec![
            FileChange::new("packages/core/a.py", ChangeKind::Added),
            FileChange::new("packages/secret/k.py", ChangeKind::Added),
            FileChange::new("LICENSE", ChangeKind::Modified),
        ]);
        let c2 = commit(vec![FileChange::new("packages/core/b.py", ChangeKind::Added)]);

        let planned = classify_commit(&c1, &config, SyncDirection::PrivateToPublic);
        let dests: Vec<&str> = planned.iter().map(|m| m.dest_path.as_str()).collect();
        assert_eq!(dests, vec!["libs/core/a.py", "LICENSE"]);

        let counts = affected_counts(&[c1, c2], &config, SyncDirection::PrivateToPublic);
        assert_eq!(
            counts,
            vec![("packages/core".to_string(), 2), ("LICENSE".to_string(), 1)]
        );
    }
}
