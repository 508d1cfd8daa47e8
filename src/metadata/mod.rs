//! The in-memory package data model.
//!
//! [`PackageMetadata`] is the fully-typed form of a manifest's metadata
//! section: versions are parsed, author/owner/tag strings are split into
//! ordered de-duplicated sets, and dependency ranges are [`VersionRange`]
//! values. It is produced from the raw manifest representation after any
//! template placeholders have been resolved, and from that point on it is an
//! immutable input to validation and emission.
//!
//! [`ResolvedFile`] is the closed file-kind variant used throughout the
//! pipeline: a physical on-disk file headed for an archive entry, or an
//! empty-folder marker that becomes a directory entry. The two only diverge
//! at the emission boundary, so the variant is matched exhaustively there and
//! treated uniformly everywhere else.

use crate::core::error::CapsuleError;
use crate::version::{VersionRange, parse_version_lenient};
use semver::Version;
use std::path::{Path, PathBuf};

/// A single package dependency: an identifier plus an optional version range.
///
/// `None` means any version is acceptable; outside template mode that is a
/// legitimate, if loose, authoring choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Identifier of the package depended upon
    pub id: String,
    /// Acceptable version range, if constrained
    pub version_range: Option<VersionRange>,
}

/// A group of dependencies that applies to one target framework.
///
/// A set with no framework applies unconditionally. Order is preserved from
/// the manifest; consumers rely on it for stable output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySet {
    /// Framework moniker the set applies to, or `None` for all frameworks
    pub target_framework: Option<String>,
    /// The dependencies in manifest order
    pub dependencies: Vec<Dependency>,
}

/// A reference to an assembly shipped with the target framework itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkAssembly {
    /// Name of the framework assembly, e.g. `System.Net`
    pub assembly_name: String,
    /// Framework monikers the reference applies to; empty means all
    pub target_frameworks: Vec<String>,
}

/// An explicit set of lib-folder files the consuming project should reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSet {
    /// Framework moniker the set applies to, or `None` for all frameworks
    pub target_framework: Option<String>,
    /// Bare file names under lib/, in manifest order
    pub references: Vec<String>,
}

/// Fully-typed package metadata.
///
/// Constructed once per build from the (possibly template-resolved) manifest;
/// immutable from the moment emission begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Package identifier; validated against the id grammar before save
    pub id: String,
    /// Package version
    pub version: Version,
    /// Human-readable title
    pub title: Option<String>,
    /// Long description
    pub description: Option<String>,
    /// Short summary
    pub summary: Option<String>,
    /// Release notes for this version
    pub release_notes: Option<String>,
    /// Copyright statement
    pub copyright: Option<String>,
    /// Language/culture tag, e.g. `en-US`
    pub language: Option<String>,
    /// Icon URL
    pub icon_url: Option<String>,
    /// License URL
    pub license_url: Option<String>,
    /// Project homepage URL
    pub project_url: Option<String>,
    /// Whether consumers must accept the license before install
    pub require_license_acceptance: bool,
    /// Whether the package is a development-only dependency
    pub development_dependency: bool,
    /// Minimum client version able to install this package
    pub min_client_version: Option<Version>,
    /// Package authors; ordered, de-duplicated, never empty for a valid package
    pub authors: Vec<String>,
    /// Package owners; ordered, de-duplicated
    pub owners: Vec<String>,
    /// Tags parsed from the manifest's space-delimited tag string
    pub tags: Vec<String>,
    /// Dependency sets in manifest order
    pub dependency_sets: Vec<DependencySet>,
    /// Framework assembly references in manifest order
    pub framework_assemblies: Vec<FrameworkAssembly>,
    /// Explicit reference sets in manifest order
    pub reference_sets: Vec<ReferenceSet>,
}

impl PackageMetadata {
    /// Whether the package version is stable (no pre-release label).
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.version.pre.is_empty()
    }

    /// All dependencies across all sets, in manifest order.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependency_sets.iter().flat_map(|set| set.dependencies.iter())
    }

    /// Comma-joined author list for archive properties.
    #[must_use]
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }

    /// Space-joined tag list for archive properties.
    #[must_use]
    pub fn tags_joined(&self) -> String {
        self.tags.join(" ")
    }
}

/// Split a space-delimited tag string into an ordered, de-duplicated set.
#[must_use]
pub fn parse_tags(tags: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags.split_whitespace() {
        if !seen.iter().any(|existing: &String| existing == tag) {
            seen.push(tag.to_string());
        }
    }
    seen
}

/// De-duplicate a name list preserving first-occurrence order, dropping
/// empty entries.
#[must_use]
pub fn dedup_names(names: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !seen.iter().any(|existing: &String| existing == trimmed) {
            seen.push(trimmed.to_string());
        }
    }
    seen
}

/// Parse an optional version string field, treating empty as absent.
///
/// # Errors
///
/// Returns [`CapsuleError::InvalidVersion`] for a non-empty unparseable value.
pub fn parse_optional_version(value: Option<&str>) -> Result<Option<Version>, CapsuleError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(Some(parse_version_lenient(text)?)),
        _ => Ok(None),
    }
}

/// A file resolved from the manifest's files section, ready for emission.
///
/// The closed set of file kinds the emitter must handle. Files are compared
/// by target path for de-duplication; the first occurrence wins and
/// insertion order is preserved everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFile {
    /// A real on-disk file copied into the archive at `target`
    Physical {
        /// Absolute path of the source file on disk
        source: PathBuf,
        /// Archive-relative target path with forward slashes
        target: String,
    },
    /// A marker for an intentionally empty directory at `target`
    EmptyFolder {
        /// Archive-relative directory path with forward slashes
        target: String,
    },
}

impl ResolvedFile {
    /// The archive target path of this entry.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Physical { target, .. } | Self::EmptyFolder { target } => target,
        }
    }

    /// The on-disk source path, for physical files.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        match self {
            Self::Physical { source, .. } => Some(source),
            Self::EmptyFolder { .. } => None,
        }
    }

    /// Whether this entry occupies a real archive entry with content.
    #[must_use]
    pub fn is_physical(&self) -> bool {
        matches!(self, Self::Physical { .. })
    }
}

/// De-duplicate resolved files by target path, keeping first occurrences in
/// insertion order.
#[must_use]
pub fn dedup_files(files: Vec<ResolvedFile>) -> Vec<ResolvedFile> {
    let mut result: Vec<ResolvedFile> = Vec::with_capacity(files.len());
    for file in files {
        if !result.iter().any(|existing| existing.target() == file.target()) {
            result.push(file);
        }
    }
    result
}
