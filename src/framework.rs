//! Target framework monikers and package folder layout.
//!
//! Files inside a package live under well-known top-level folders (`lib`,
//! `content`, `tools`, `build`), optionally followed by a target-framework
//! subfolder selecting platform-specific content (`lib/net45/Foo.dll`).
//! This module parses archive target paths into that structure so schema
//! inference, template resolution, and reference validation can all reason
//! about the same classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Sentinel file name marking an intentionally empty directory.
///
/// Zip archives cannot store an empty directory as a file entry, so a file
/// with this name stands in for "this folder exists and is empty".
pub const EMPTY_FOLDER_MARKER: &str = "_._";

/// Well-known top-level folders inside a package archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFolder {
    /// Compiled libraries consumed as references
    Lib,
    /// Files copied into the consuming project
    Content,
    /// Scripts and executables
    Tools,
    /// Build-integration files
    Build,
}

impl PackageFolder {
    /// Parse a path segment into a well-known folder, case-insensitively.
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "lib" => Some(Self::Lib),
            "content" => Some(Self::Content),
            "tools" => Some(Self::Tools),
            "build" => Some(Self::Build),
            _ => None,
        }
    }

    /// The canonical lower-case folder name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lib => "lib",
            Self::Content => "content",
            Self::Tools => "tools",
            Self::Build => "build",
        }
    }
}

impl fmt::Display for PackageFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn framework_regex() -> &'static Regex {
    static FRAMEWORK_REGEX: OnceLock<Regex> = OnceLock::new();
    FRAMEWORK_REGEX.get_or_init(|| {
        // Known framework identifier prefixes, optionally followed by a
        // dotted version: net45, net4.5, netstandard2.0, netcoreapp3.1, ...
        Regex::new(r"(?i)^(netstandard|netcoreapp|net|uap|wp|sl|monoandroid|xamarinios)(\d+(\.\d+)*)?$")
            .unwrap()
    })
}

/// A target framework moniker such as `net45` or `netstandard2.0`.
///
/// Monikers are compared case-insensitively but preserve the folder's
/// original spelling for display and round-tripping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetFramework(String);

impl TargetFramework {
    /// Parse a folder segment as a framework moniker.
    ///
    /// Returns `None` for segments that are ordinary subfolders rather than
    /// framework selectors.
    #[must_use]
    pub fn parse(segment: &str) -> Option<Self> {
        if framework_regex().is_match(segment) {
            Some(Self(segment.to_string()))
        } else {
            None
        }
    }

    /// The moniker as written in the folder name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for TargetFramework {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for TargetFramework {}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An archive target path broken into folder, framework, and trailing segments.
#[derive(Debug, Clone)]
pub struct ClassifiedPath {
    /// The well-known top-level folder, if the path starts with one
    pub folder: Option<PackageFolder>,
    /// The framework moniker subfolder directly under the root, if any
    pub framework: Option<TargetFramework>,
    /// Remaining path segments after the root and framework folders
    pub rest: Vec<String>,
}

impl ClassifiedPath {
    /// The file name (last segment), if the path has one.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.rest.last().map(String::as_str)
    }

    /// True when the path points at the empty-folder marker file.
    #[must_use]
    pub fn is_empty_folder_marker(&self) -> bool {
        self.file_name() == Some(EMPTY_FOLDER_MARKER)
    }

    /// True when the file sits directly in the root folder or its framework
    /// subfolder, with no further nesting.
    #[must_use]
    pub fn is_directly_under_root(&self) -> bool {
        self.rest.len() == 1
    }
}

/// Classify an archive target path.
///
/// Paths use forward slashes; backslashes are accepted and normalized.
///
/// # Examples
///
/// ```
/// use capsule_cli::framework::{PackageFolder, classify_path};
///
/// let path = classify_path("lib/net45/Sample.dll");
/// assert_eq!(path.folder, Some(PackageFolder::Lib));
/// assert_eq!(path.framework.as_ref().unwrap().as_str(), "net45");
/// assert_eq!(path.file_name(), Some("Sample.dll"));
/// ```
#[must_use]
pub fn classify_path(target: &str) -> ClassifiedPath {
    let normalized = target.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

    let folder = segments.first().and_then(|s| PackageFolder::from_segment(s));
    let mut rest_start = usize::from(folder.is_some());

    let framework = if folder.is_some() && segments.len() > rest_start + 1 {
        // Only a segment with something after it can be a framework selector;
        // a bare `lib/net45` entry is a file named net45
        let candidate = TargetFramework::parse(segments[rest_start]);
        if candidate.is_some() {
            rest_start += 1;
        }
        candidate
    } else {
        None
    };

    ClassifiedPath {
        folder,
        framework,
        rest: segments[rest_start..].iter().map(ToString::to_string).collect(),
    }
}
