//! Path filtering for synced projects.
//!
//! Provides [`PathFilter`] which combines the global exclude list with a
//! project's own exclude and include patterns and decides whether a
//! project-relative path may cross into the other repository.
//!
//! # Decision model
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | Path or any segment matches a global exclude | `Excluded { scope: Global }` |
//! | Path or any segment matches a project exclude | `Excluded { scope: Project }` |
//! | Include list non-empty and nothing matches | `NotIncluded` |
//! | None of the above | `Include` |
//!
//! Excludes are checked first, so an include pattern can never re-admit an
//! excluded path. Patterns use shell syntax; `*` also crosses `/`, so
//! `*.py` selects `src/a.py` and `docs/*.md` catches `docs/api/x.md`.

use regex_lite::Regex;
use tracing::{trace, warn};

use crate::config::ProjectMapping;

// ---------------------------------------------------------------------------
// Decision enum
// ---------------------------------------------------------------------------

/// Where an exclude pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludeScope {
    Global,
    Project,
}

/// The outcome of evaluating a path against the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Path passes all checks.
    Include,
    /// Path matches an exclude pattern.
    Excluded { pattern: String, scope: ExcludeScope },
    /// The project has an include list and the path matches none of it.
    NotIncluded,
}

impl FilterDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, Self::Include)
    }

    /// Short human-readable label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Excluded { scope: ExcludeScope::Global, .. } => "global-exclude",
            Self::Excluded { scope: ExcludeScope::Project, .. } => "project-exclude",
            Self::NotIncluded => "not-included",
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// A compiled shell-style pattern.
///
/// `*` matches any run of characters including `/`, `?` matches one
/// character, `[seq]` / `[!seq]` match a (negated) class. A pattern that
/// cannot be compiled matches only its literal text.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Option<Regex>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.replace('\\', "/");
        let regex = match Regex::new(&translate(&pattern)) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid pattern, matching literally");
                None
            }
        };
        Self {
            source: pattern,
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None => text == self.source,
        }
    }
}

/// Translate a shell pattern into an anchored regular expression.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^(?s:");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str("\\[");
                    continue;
                }
                out.push('[');
                let mut class = &chars[i..j];
                if let Some((&'!', rest)) = class.split_first() {
                    out.push('^');
                    class = rest;
                }
                for &ch in class {
                    match ch {
                        '\\' | '[' | ']' | '&' | '~' | '^' => {
                            out.push('\\');
                            out.push(ch);
                        }
                        _ => out.push(ch),
                    }
                }
                out.push(']');
                i = j + 1;
            }
            other => out.push_str(&regex_lite::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push_str(")$");
    out
}

/// An exclude pattern, tried as written and with any trailing `/` removed.
#[derive(Debug, Clone)]
struct ExcludePattern {
    pattern: GlobPattern,
    bare: Option<GlobPattern>,
}

impl ExcludePattern {
    fn new(pattern: &str) -> Self {
        let pattern = GlobPattern::new(pattern);
        let trimmed = pattern.as_str().trim_end_matches('/');
        let bare = (trimmed != pattern.as_str() && !trimmed.is_empty())
            .then(|| GlobPattern::new(trimmed));
        Self { pattern, bare }
    }

    fn candidates(&self) -> impl Iterator<Item = &GlobPattern> {
        std::iter::once(&self.pattern)
            .chain(self.bare.as_ref())
            .filter(|p| !p.as_str().is_empty())
    }

    /// Hits when it matches the whole path or any single segment, so
    /// `node_modules/` catches `a/node_modules/b.js`.
    fn excludes(&self, path: &str) -> bool {
        if self.candidates().any(|p| p.matches(path)) {
            return true;
        }
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .any(|segment| self.candidates().any(|p| p.matches(segment)))
    }
}

// ---------------------------------------------------------------------------
// PathFilter
// ---------------------------------------------------------------------------

/// Evaluates project-relative paths against exclude/include patterns.
#[derive(Debug, Clone)]
pub struct PathFilter {
    global_excludes: Vec<ExcludePattern>,
    project_excludes: Vec<ExcludePattern>,
    includes: Vec<GlobPattern>,
}

impl PathFilter {
    pub fn new(global_excludes: &[String], project_excludes: &[String], includes: &[String]) -> Self {
        Self {
            global_excludes: global_excludes.iter().map(|p| ExcludePattern::new(p)).collect(),
            project_excludes: project_excludes.iter().map(|p| ExcludePattern::new(p)).collect(),
            includes: includes.iter().map(|p| GlobPattern::new(p)).collect(),
        }
    }

    /// Filter for a project mapping under the given global excludes.
    pub fn for_project(project: &ProjectMapping, global_excludes: &[String]) -> Self {
        Self::new(
            global_excludes,
            &project.exclude_patterns,
            &project.include_patterns,
        )
    }

    /// Evaluate a path relative to the project root (forward-slash separated).
    pub fn evaluate(&self, rel_path: &str) -> FilterDecision {
        let path = rel_path.replace('\\', "/");

        for (patterns, scope) in [
            (&self.global_excludes, ExcludeScope::Global),
            (&self.project_excludes, ExcludeScope::Project),
        ] {
            if let Some(hit) = patterns.iter().find(|p| p.excludes(&path)) {
                let pattern = hit.pattern.as_str();
                trace!(path = %path, pattern, ?scope, "path excluded");
                return FilterDecision::Excluded {
                    pattern: pattern.to_string(),
                    scope,
                };
            }
        }

        if !self.includes.is_empty() && !self.includes.iter().any(|p| p.matches(&path)) {
            trace!(path = %path, "path matches no include pattern");
            return FilterDecision::NotIncluded;
        }

        FilterDecision::Include
    }

    pub fn should_include(&self, rel_path: &str) -> bool {
        self.evaluate(rel_path).is_included()
    }
}

/// `should_include(path, mapping, global_excludes)`.
pub fn should_include(rel_path: &str, project: &ProjectMapping, global_excludes: &[String]) -> bool {
    PathFilter::for_project(project, global_excludes).should_include(rel_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_global_excludes;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_include_when_no_patterns() {
        let filter = PathFilter::new(&[], &[], &[]);
        assert_eq!(filter.evaluate("src/main.py"), FilterDecision::Include);
        assert_eq!(filter.evaluate("src/main.py").label(), "include");
    }

    #[test]
    fn test_default_globals_block_secrets_and_caches() {
        let globals = default_global_excludes();
        let filter = PathFilter::new(&globals, &[], &[]);
        for path in [
            ".env",
            ".env.local",
            "config/.env",
            "api.secret",
            "deep/nested/keys.secrets",
            ".secrets/token",
            "pkg/__pycache__/mod.cpython-311.pyc",
            "mod.pyc",
            "web/node_modules/left-pad/index.js",
            ".nx/cache/x",
            ".git/config",
        ] {
            assert!(!filter.should_include(path), "{path} should be excluded");
        }
        assert!(filter.should_include("src/index.py"));
        assert!(filter.should_include("docs/environment.md"));
    }

    #[test]
    fn test_directory_pattern_matches_segment() {
        let globals = strings(&["build/"]);
        let filter = PathFilter::new(&globals, &[], &[]);
        assert!(!filter.should_include("build"));
        assert!(!filter.should_include("a/build/out.o"));
        assert!(filter.should_include("a/builder/out.o"));
    }

    #[test]
    fn test_glob_character_classes() {
        let excludes = strings(&["draft-?.md", "[0-9]*.tmp"]);
        let filter = PathFilter::new(&[], &excludes, &[]);
        assert!(!filter.should_include("docs/draft-1.md"));
        assert!(filter.should_include("docs/draft-10.md"));
        assert!(!filter.should_include("7cache.tmp"));
        assert!(filter.should_include("cache.tmp"));
    }

    #[test]
    fn test_project_exclude_scope() {
        let excludes = strings(&["*.log"]);
        let filter = PathFilter::new(&[], &excludes, &[]);
        let decision = filter.evaluate("logs/server.log");
        assert_eq!(
            decision,
            FilterDecision::Excluded {
                pattern: "*.log".into(),
                scope: ExcludeScope::Project
            }
        );
        assert_eq!(decision.label(), "project-exclude");
    }

    #[test]
    fn test_global_checked_before_project() {
        let globals = strings(&["*.log"]);
        let excludes = strings(&["*.log"]);
        let filter = PathFilter::new(&globals, &excludes, &[]);
        assert_eq!(filter.evaluate("a.log").label(), "global-exclude");
    }

    #[test]
    fn test_include_list_restricts() {
        let includes = strings(&["*.py", "src/**"]);
        let filter = PathFilter::new(&[], &[], &includes);
        assert!(filter.should_include("setup.py"));
        assert!(filter.should_include("src/deep/file.rs"));
        assert_eq!(filter.evaluate("README.md"), FilterDecision::NotIncluded);
    }

    #[test]
    fn test_star_crosses_directories() {
        let includes = strings(&["*.py"]);
        let filter = PathFilter::new(&[], &[], &includes);
        assert!(filter.should_include("src/a.py"));
        assert!(filter.should_include("src/pkg/deep/b.py"));
        assert_eq!(filter.evaluate("src/a.rs"), FilterDecision::NotIncluded);

        let excludes = strings(&["docs/*.md"]);
        let filter = PathFilter::new(&[], &excludes, &[]);
        assert!(!filter.should_include("docs/x.md"));
        assert!(!filter.should_include("docs/api/x.md"));
        assert!(filter.should_include("guide/x.md"));
    }

    #[test]
    fn test_negated_class_and_unclosed_bracket() {
        let excludes = strings(&["v[!0-9]*", "odd[name"]);
        let filter = PathFilter::new(&[], &excludes, &[]);
        assert!(!filter.should_include("vendor/lib.js"));
        assert!(filter.should_include("v2/lib.js"));
        assert!(!filter.should_include("odd[name"));
        assert!(filter.should_include("oddname"));
    }

    #[test]
    fn test_pattern_metacharacters_are_literal() {
        let excludes = strings(&["a+b.(x)", "c|d"]);
        let filter = PathFilter::new(&[], &excludes, &[]);
        assert!(!filter.should_include("a+b.(x)"));
        assert!(filter.should_include("aab.(x)"));
        assert!(!filter.should_include("src/c|d"));
        assert!(filter.should_include("c"));
    }

    #[test]
    fn test_exclude_beats_include() {
        let globals = default_global_excludes();
        let excludes = strings(&["generated/"]);
        let includes = strings(&["**"]);
        let filter = PathFilter::new(&globals, &excludes, &includes);
        assert!(!filter.should_include(".env"));
        assert!(!filter.should_include("src/generated/api.py"));
        assert!(filter.should_include("src/api.py"));
    }

    #[test]
    fn test_should_include_with_mapping() {
        let mut project = ProjectMapping::new("packages/core");
        project.exclude_patterns = strings(&["tests/"]);
        let globals = default_global_excludes();
        assert!(should_include("src/index.py", &project, &globals));
        assert!(!should_include("tests/test_index.py", &project, &globals));
        assert!(!should_include(".env", &project, &globals));
    }

    #[test]
    fn test_backslash_paths_normalized() {
        let globals = strings(&["node_modules/"]);
        let filter = PathFilter::new(&globals, &[], &[]);
        assert!(!filter.should_include("web\\node_modules\\x.js"));
    }
}
