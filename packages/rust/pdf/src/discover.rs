//! Input discovery: turn command-line arguments into markdown files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use sitedocs_shared::{MarkdownFile, SiteDocsError};
use tracing::{debug, warn};

/// How arguments are interpreted.
#[derive(Debug, Clone, Copy)]
pub struct DiscoverOptions {
    /// `**` crosses directory boundaries. When off, `**` behaves like `*`.
    pub recursive: bool,
    /// Take every argument literally as a file path, no globbing.
    pub single: bool,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            single: false,
        }
    }
}

/// Outcome of expanding every argument.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Matched files: per argument sorted by path, arguments in order,
    /// each path at most once.
    pub files: Vec<MarkdownFile>,
    /// One `NoMatch` error per argument that produced nothing.
    pub unmatched: Vec<SiteDocsError>,
}

/// Expand `inputs` into markdown files.
///
/// An argument that matches nothing (or, in single mode, is not an existing
/// file) is recorded in [`Discovery::unmatched`]; the remaining arguments are
/// still expanded.
pub fn discover<S: AsRef<str>>(inputs: &[S], opts: DiscoverOptions) -> Discovery {
    let mut discovery = Discovery::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for input in inputs {
        let input = input.as_ref();
        let matched = if opts.single {
            literal_file(input)
        } else {
            expand_pattern(input, opts.recursive)
        };

        match matched {
            Ok(paths) => {
                debug!(pattern = input, matches = paths.len(), "pattern expanded");
                discovery.files.extend(
                    paths
                        .into_iter()
                        .filter(|p| seen.insert(identity(p)))
                        .map(MarkdownFile::new),
                );
            }
            Err(e) => {
                warn!(pattern = input, error = %e, "no input files");
                discovery.unmatched.push(e);
            }
        }
    }

    discovery
}

/// Key used to recognise one file reached through different spellings
/// (`docs/a.md`, `docs/../docs/a.md`, relative vs absolute).
fn identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn literal_file(input: &str) -> Result<Vec<PathBuf>, SiteDocsError> {
    let path = Path::new(input);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let reason = if path.exists() {
        "not a regular file"
    } else {
        "file does not exist"
    };
    Err(SiteDocsError::NoMatch {
        pattern: input.to_string(),
        reason: Some(reason.into()),
    })
}

fn expand_pattern(pattern: &str, recursive: bool) -> Result<Vec<PathBuf>, SiteDocsError> {
    let effective = if recursive {
        pattern.to_string()
    } else {
        pattern.replace("**", "*")
    };

    let options = MatchOptions {
        require_literal_separator: true,
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let paths = glob::glob_with(&effective, options).map_err(|e| SiteDocsError::NoMatch {
        pattern: pattern.to_string(),
        reason: Some(e.to_string()),
    })?;

    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "unreadable path while globbing");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(SiteDocsError::no_match(pattern));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "# doc\n").unwrap();
    }

    fn pattern(dir: &Path, rest: &str) -> String {
        format!("{}/{rest}", glob::Pattern::escape(&dir.display().to_string()))
    }

    fn names(d: &Discovery, root: &Path) -> Vec<String> {
        d.files
            .iter()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn star_matches_only_markdown_in_directory() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.md");
        touch(tmp.path(), "b.md");
        touch(tmp.path(), "c.txt");
        touch(tmp.path(), "sub/d.md");

        let d = discover(&[pattern(tmp.path(), "*.md")], DiscoverOptions::default());
        assert_eq!(names(&d, tmp.path()), vec!["a.md", "b.md"]);
        assert!(d.unmatched.is_empty());
    }

    #[test]
    fn double_star_recurses() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "top.md");
        touch(tmp.path(), "guide/intro.md");
        touch(tmp.path(), "guide/deep/more.md");
        touch(tmp.path(), "guide/notes.txt");

        let d = discover(&[pattern(tmp.path(), "**/*.md")], DiscoverOptions::default());
        assert_eq!(
            names(&d, tmp.path()),
            vec!["guide/deep/more.md", "guide/intro.md", "top.md"]
        );
    }

    #[test]
    fn no_recursive_limits_double_star_to_one_level() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "top.md");
        touch(tmp.path(), "guide/intro.md");
        touch(tmp.path(), "guide/deep/more.md");

        let opts = DiscoverOptions {
            recursive: false,
            single: false,
        };
        let d = discover(&[pattern(tmp.path(), "**/*.md")], opts);
        assert_eq!(names(&d, tmp.path()), vec!["guide/intro.md"]);
    }

    #[test]
    fn hidden_files_need_literal_dot() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), ".draft.md");
        touch(tmp.path(), "page.md");

        let d = discover(&[pattern(tmp.path(), "*.md")], DiscoverOptions::default());
        assert_eq!(names(&d, tmp.path()), vec!["page.md"]);

        let d = discover(&[pattern(tmp.path(), ".*.md")], DiscoverOptions::default());
        assert_eq!(names(&d, tmp.path()), vec![".draft.md"]);
    }

    #[test]
    fn empty_directory_is_no_match() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("docs")).unwrap();

        let input = pattern(tmp.path(), "docs/*.md");
        let d = discover(&[input.clone()], DiscoverOptions::default());
        assert!(d.files.is_empty());
        assert_eq!(d.unmatched.len(), 1);
        assert_eq!(
            d.unmatched[0].to_string(),
            format!("no files found matching pattern: {input}")
        );
    }

    #[test]
    fn unmatched_pattern_does_not_stop_others() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.md");

        let d = discover(
            &[pattern(tmp.path(), "missing/*.md"), pattern(tmp.path(), "*.md")],
            DiscoverOptions::default(),
        );
        assert_eq!(names(&d, tmp.path()), vec!["a.md"]);
        assert_eq!(d.unmatched.len(), 1);
    }

    #[test]
    fn overlapping_patterns_are_deduplicated_in_first_seen_order() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.md");
        touch(tmp.path(), "b.md");

        let d = discover(
            &[pattern(tmp.path(), "b.md"), pattern(tmp.path(), "*.md")],
            DiscoverOptions::default(),
        );
        assert_eq!(names(&d, tmp.path()), vec!["b.md", "a.md"]);
    }

    #[test]
    fn same_file_through_different_spellings_is_listed_once() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "docs/a.md");

        let d = discover(
            &[
                pattern(tmp.path(), "docs/*.md"),
                pattern(tmp.path(), "./docs/*.md"),
                pattern(tmp.path(), "docs/../docs/a.md"),
            ],
            DiscoverOptions::default(),
        );
        assert_eq!(names(&d, tmp.path()), vec!["docs/a.md"]);
        assert!(d.unmatched.is_empty());

        let literal = tmp.path().join("docs").join("a.md");
        let dotted = tmp.path().join("docs").join("..").join("docs").join("a.md");
        let opts = DiscoverOptions {
            recursive: true,
            single: true,
        };
        let d = discover(
            &[literal.display().to_string(), dotted.display().to_string()],
            opts,
        );
        assert_eq!(d.files.len(), 1);
        assert_eq!(d.files[0].path, literal);
    }

    #[test]
    fn directories_are_not_returned() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("folder.md")).unwrap();
        touch(tmp.path(), "real.md");

        let d = discover(&[pattern(tmp.path(), "*.md")], DiscoverOptions::default());
        assert_eq!(names(&d, tmp.path()), vec!["real.md"]);
    }

    #[test]
    fn invalid_pattern_reports_reason() {
        let d = discover(&["docs/[.md"], DiscoverOptions::default());
        assert_eq!(d.unmatched.len(), 1);
        match &d.unmatched[0] {
            SiteDocsError::NoMatch { pattern, reason } => {
                assert_eq!(pattern, "docs/[.md");
                assert!(reason.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn single_mode_takes_paths_literally() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "[draft].md");

        let literal = tmp.path().join("[draft].md").display().to_string();
        let missing = tmp.path().join("*.md").display().to_string();
        let opts = DiscoverOptions {
            recursive: true,
            single: true,
        };

        let d = discover(&[literal, missing], opts);
        assert_eq!(names(&d, tmp.path()), vec!["[draft].md"]);
        assert_eq!(d.unmatched.len(), 1);
        assert!(d.unmatched[0].to_string().contains("file does not exist"));
    }
}
