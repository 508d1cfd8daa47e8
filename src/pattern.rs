//! Source-pattern resolution for the manifest's files section.
//!
//! This module expands a manifest file entry into concrete
//! (source path, archive target path) pairs. A source may be:
//!
//! - a **literal path** to one file (`bin/Release/Sample.dll`)
//! - a **directory path**, meaning everything beneath it, preserving the
//!   directory-relative structure
//! - a **wildcard pattern** with `*` (within one segment), `**` (recursive)
//!   and `?` (single character), matched with the `glob` crate over a
//!   `walkdir` traversal
//!
//! The target path names where the resolved files land inside the archive.
//! When omitted, the source-relative structure is mirrored. For wildcard
//! sources the path relative to the pattern's non-wildcard prefix is
//! appended to the target, so `bin/*.dll -> lib` flattens one level while
//! `bin/**/*.dll -> lib` preserves nesting.
//!
//! A resolved source file named `_._` (the empty-folder sentinel) produces an
//! [`ResolvedFile::EmptyFolder`] entry for the target's parent directory
//! instead of a physical file.
//!
//! # Errors
//!
//! A literal source that matches nothing is a fatal
//! [`CapsuleError::FileNotFound`]; wildcard and directory sources may resolve
//! to zero files silently.

use crate::core::error::CapsuleError;
use crate::framework::EMPTY_FOLDER_MARKER;
use crate::metadata::ResolvedFile;
use glob::Pattern;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Expand one source/target specification against a base directory.
///
/// `target` is the archive folder (or full archive path, for a literal source
/// whose target names a file). Returns entries in sorted order for
/// deterministic output.
///
/// # Errors
///
/// - [`CapsuleError::InvalidPattern`] when a wildcard source is not a valid glob
/// - [`CapsuleError::FileNotFound`] when a literal source matches nothing
/// - IO errors from directory traversal
pub fn resolve_files(
    base: &Path,
    source: &str,
    target: Option<&str>,
) -> Result<Vec<ResolvedFile>, CapsuleError> {
    let source = source.replace('\\', "/");
    let target = target.map(|t| t.replace('\\', "/").trim_matches('/').to_string());
    debug!("Resolving source '{}' (target {:?}) against {:?}", source, target, base);

    if is_wildcard(&source) {
        resolve_wildcard(base, &source, target.as_deref())
    } else {
        let path = base.join(&source);
        if path.is_dir() {
            resolve_directory(&path, target.as_deref())
        } else if path.is_file() {
            Ok(vec![make_entry(&path, literal_target(&source, target.as_deref()))])
        } else {
            // Literal sources must exist; this is an authoring error
            Err(CapsuleError::FileNotFound { path: source })
        }
    }
}

/// Remove resolved files whose source path matches any exclusion pattern.
///
/// `exclude` is a semicolon-delimited list of globs, each interpreted
/// relative to `base` (the same base the sources were resolved against).
/// Empty-folder entries carry no source path and are never excluded.
///
/// # Errors
///
/// Returns [`CapsuleError::InvalidPattern`] when an exclusion glob is invalid.
pub fn apply_exclusions(
    files: Vec<ResolvedFile>,
    base: &Path,
    exclude: &str,
) -> Result<Vec<ResolvedFile>, CapsuleError> {
    let mut patterns = Vec::new();
    for raw in exclude.split(';') {
        let raw = raw.trim().replace('\\', "/");
        if raw.is_empty() {
            continue;
        }
        patterns.push(Pattern::new(&raw).map_err(|_| CapsuleError::InvalidPattern {
            pattern: raw.clone(),
        })?);
    }
    if patterns.is_empty() {
        return Ok(files);
    }

    let before = files.len();
    let kept: Vec<ResolvedFile> = files
        .into_iter()
        .filter(|file| {
            let Some(source) = file.source() else {
                return true;
            };
            let relative = source.strip_prefix(base).unwrap_or(source);
            let relative = relative.to_string_lossy().replace('\\', "/");
            let excluded = patterns.iter().any(|p| p.matches(&relative));
            if excluded {
                trace!("Excluding {}", relative);
            }
            !excluded
        })
        .collect();
    debug!("Exclusions removed {} of {} files", before - kept.len(), before);
    Ok(kept)
}

fn is_wildcard(source: &str) -> bool {
    source.contains('*') || source.contains('?')
}

/// Build the entry for one source file, honoring the empty-folder sentinel.
fn make_entry(source: &Path, target: String) -> ResolvedFile {
    let file_name = source.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if file_name == EMPTY_FOLDER_MARKER {
        let parent = match target.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        };
        ResolvedFile::EmptyFolder { target: parent }
    } else {
        ResolvedFile::Physical {
            source: source.to_path_buf(),
            target,
        }
    }
}

/// Target path for a literal single-file source.
///
/// A target whose last segment has an extension is the full archive path;
/// otherwise it is a folder receiving the source file name. With no target
/// the source's own relative path is mirrored.
fn literal_target(source: &str, target: Option<&str>) -> String {
    let file_name = source.rsplit('/').next().unwrap_or(source);
    match target {
        None => source.trim_start_matches("./").to_string(),
        Some("") => file_name.to_string(),
        Some(t) => {
            let last = t.rsplit('/').next().unwrap_or(t);
            if last.contains('.') {
                t.to_string()
            } else {
                format!("{t}/{file_name}")
            }
        }
    }
}

fn join_target(target: Option<&str>, relative: &str) -> String {
    match target {
        None | Some("") => relative.to_string(),
        Some(t) => format!("{t}/{relative}"),
    }
}

fn resolve_directory(dir: &Path, target: Option<&str>) -> Result<Vec<ResolvedFile>, CapsuleError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| CapsuleError::IoError {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        entries.push(make_entry(entry.path(), join_target(target, &relative)));
    }
    entries.sort_by(|a, b| a.target().cmp(b.target()));
    Ok(entries)
}

fn resolve_wildcard(
    base: &Path,
    source: &str,
    target: Option<&str>,
) -> Result<Vec<ResolvedFile>, CapsuleError> {
    let pattern = Pattern::new(source).map_err(|_| CapsuleError::InvalidPattern {
        pattern: source.to_string(),
    })?;

    // The longest directory prefix without wildcards anchors both the
    // traversal and the portion of the path carried over to the target
    let prefix = wildcard_prefix(source);
    let search_root = if prefix.is_empty() { base.to_path_buf() } else { base.join(&prefix) };
    if !search_root.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(base).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| CapsuleError::IoError {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(base)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        trace!("Checking path: {}", relative);
        if !pattern.matches(&relative) {
            continue;
        }

        let carried = if prefix.is_empty() {
            relative.as_str()
        } else {
            relative.strip_prefix(&prefix).unwrap_or(&relative).trim_start_matches('/')
        };
        entries.push(make_entry(entry.path(), join_target(target, carried)));
    }
    entries.sort_by(|a, b| a.target().cmp(b.target()));
    debug!("Pattern '{}' resolved {} files", source, entries.len());
    Ok(entries)
}

/// The directory prefix of a pattern up to its first wildcard segment.
fn wildcard_prefix(source: &str) -> String {
    let mut prefix_segments = Vec::new();
    for segment in source.split('/') {
        if segment.contains('*') || segment.contains('?') {
            break;
        }
        prefix_segments.push(segment);
    }
    // The last segment is the file part unless the pattern ended with '/'
    if prefix_segments.len() == source.split('/').count() {
        prefix_segments.pop();
    }
    prefix_segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn touch(base: &Path, relative: &str) {
        let path = base.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn targets(files: &[ResolvedFile]) -> Vec<&str> {
        files.iter().map(ResolvedFile::target).collect()
    }

    #[test]
    fn test_literal_file_with_folder_target() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "bin/Sample.dll");

        let files = resolve_files(temp.path(), "bin/Sample.dll", Some("lib/net45")).unwrap();
        assert_eq!(targets(&files), vec!["lib/net45/Sample.dll"]);
        assert_eq!(files[0].source(), Some(temp.path().join("bin/Sample.dll").as_path()));
    }

    #[test]
    fn test_literal_file_with_file_target() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "readme.txt");

        let files = resolve_files(temp.path(), "readme.txt", Some("docs/intro.txt")).unwrap();
        assert_eq!(targets(&files), vec!["docs/intro.txt"]);
    }

    #[test]
    fn test_literal_file_without_target_mirrors_source() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "tools/run.ps1");

        let files = resolve_files(temp.path(), "tools/run.ps1", None).unwrap();
        assert_eq!(targets(&files), vec!["tools/run.ps1"]);
    }

    #[test]
    fn test_literal_missing_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = resolve_files(temp.path(), "bin/Missing.dll", Some("lib")).unwrap_err();
        assert!(matches!(err, CapsuleError::FileNotFound { .. }));
    }

    #[test]
    fn test_wildcard_matching_nothing_is_silent() {
        let temp = TempDir::new().unwrap();
        let files = resolve_files(temp.path(), "bin/*.dll", Some("lib")).unwrap();
        assert!(files.is_empty());

        let files = resolve_files(temp.path(), "**/*.*", None).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_single_level_wildcard_flattens_to_target() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "bin/A.dll");
        touch(temp.path(), "bin/B.dll");
        touch(temp.path(), "bin/notes.txt");

        let files = resolve_files(temp.path(), "bin/*.dll", Some("lib/net45")).unwrap();
        assert_eq!(targets(&files), vec!["lib/net45/A.dll", "lib/net45/B.dll"]);
    }

    #[test]
    fn test_recursive_wildcard_preserves_structure() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "out/A.dll");
        touch(temp.path(), "out/sub/B.dll");

        let files = resolve_files(temp.path(), "out/**/*.dll", Some("lib")).unwrap();
        assert_eq!(targets(&files), vec!["lib/A.dll", "lib/sub/B.dll"]);
    }

    #[test]
    fn test_directory_source_takes_everything_under_it() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "content/site.css");
        touch(temp.path(), "content/Views/index.html");

        let files = resolve_files(temp.path(), "content", Some("content")).unwrap();
        assert_eq!(targets(&files), vec!["content/Views/index.html", "content/site.css"]);
    }

    #[test]
    fn test_directory_source_may_be_empty() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();

        let files = resolve_files(temp.path(), "empty", Some("content")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_empty_folder_sentinel_becomes_folder_entry() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "stage/_._");

        let files = resolve_files(temp.path(), "stage/_._", Some("lib/net45/_._")).unwrap();
        assert_eq!(files, vec![ResolvedFile::EmptyFolder {
            target: "lib/net45".to_string()
        }]);
    }

    #[test]
    fn test_empty_folder_sentinel_through_wildcard() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "stage/net45/_._");
        touch(temp.path(), "stage/net45/Sample.dll");

        let files = resolve_files(temp.path(), "stage/**/*", Some("lib")).unwrap();
        assert_eq!(files, vec![
            ResolvedFile::EmptyFolder {
                target: "lib/net45".to_string()
            },
            ResolvedFile::Physical {
                source: temp.path().join("stage/net45/Sample.dll"),
                target: "lib/net45/Sample.dll".to_string()
            },
        ]);
    }

    #[test]
    fn test_exclusions_filter_by_source_path() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "bin/A.dll");
        touch(temp.path(), "bin/A.Tests.dll");
        touch(temp.path(), "bin/B.dll");

        let files = resolve_files(temp.path(), "bin/*.dll", Some("lib")).unwrap();
        let files = apply_exclusions(files, temp.path(), "**/*.Tests.dll").unwrap();
        assert_eq!(targets(&files), vec!["lib/A.dll", "lib/B.dll"]);
    }

    #[test]
    fn test_exclusions_semicolon_delimited() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "bin/A.dll");
        touch(temp.path(), "bin/A.pdb");
        touch(temp.path(), "bin/A.xml");

        let files = resolve_files(temp.path(), "bin/*.*", Some("lib")).unwrap();
        let files = apply_exclusions(files, temp.path(), "**/*.pdb;**/*.xml").unwrap();
        assert_eq!(targets(&files), vec!["lib/A.dll"]);
    }

    #[test]
    fn test_exclusions_keep_empty_folder_entries() {
        let files = vec![ResolvedFile::EmptyFolder {
            target: "lib/net45".to_string(),
        }];
        let kept = apply_exclusions(files.clone(), &PathBuf::from("/tmp"), "**/*").unwrap();
        assert_eq!(kept, files);
    }

    #[test]
    fn test_recursive_pattern_is_superset_of_narrower_patterns() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/one.dll");
        touch(temp.path(), "a/b/two.txt");
        touch(temp.path(), "three.css");

        let all = resolve_files(temp.path(), "**/*.*", None).unwrap();
        for narrower in ["a/*.dll", "**/*.txt", "*.css"] {
            let subset = resolve_files(temp.path(), narrower, None).unwrap();
            for file in &subset {
                assert!(
                    all.iter().any(|f| f.source() == file.source()),
                    "{narrower} resolved a file missing from **/*.*"
                );
            }
        }
    }

    #[test]
    fn test_invalid_exclusion_pattern() {
        let err = apply_exclusions(Vec::new(), &PathBuf::from("/tmp"), "[invalid").unwrap_err();
        assert!(matches!(err, CapsuleError::InvalidPattern { .. }));
    }
}
