//! Manifest descriptor parsing and serialization.
//!
//! A manifest (`*.pkgspec`) is a TOML document with a `[metadata]` table and
//! an optional `[[files]]` array of `{ source, target, exclude }` entries:
//!
//! ```toml
//! [metadata]
//! id = "Sample.Package"
//! version = "1.2.3"
//! authors = ["Alice"]
//! description = "A sample package"
//!
//! [[files]]
//! source = "bin/Release/*.dll"
//! target = "lib/net45"
//! ```
//!
//! A manifest that declares `schema = "template"` is a template: metadata
//! fields may hold placeholder tokens (`$id$`, `$version$`, ...) that are
//! resolved from the package's compiled artifacts at build time.
//!
//! The same document format is embedded into the emitted archive as the
//! manifest part, at which point the `schema-version` key records the
//! inferred structural schema version instead.
//!
//! This module owns the raw (string-typed) representation; conversion to the
//! typed [`PackageMetadata`] model happens after template resolution via
//! [`RawMetadata::to_package_metadata`].

use crate::core::error::CapsuleError;
use crate::metadata::{
    Dependency, DependencySet, FrameworkAssembly, PackageMetadata, ReferenceSet, dedup_names,
    parse_optional_version, parse_tags,
};
use crate::version::{VersionRange, parse_version_lenient};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// File extension of manifest documents, on disk and inside the archive.
pub const MANIFEST_EXTENSION: &str = "pkgspec";

/// Schema value marking a manifest as a template.
pub const TEMPLATE_SCHEMA: &str = "template";

/// True when an archive target path is itself a root-level manifest document.
///
/// The emitter skips such files to avoid double-embedding a manifest next to
/// the one it writes itself.
#[must_use]
pub fn is_manifest_path(target: &str) -> bool {
    !target.contains('/')
        && Path::new(target)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION))
}

/// A source/target/exclude entry from the manifest's files section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FileEntry {
    /// Source path or glob pattern, relative to the manifest's base directory
    pub source: String,
    /// Target path inside the archive; omitted mirrors the source structure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Semicolon-delimited exclusion globs applied to the resolved set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

/// A raw dependency entry: id plus unparsed version range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RawDependency {
    /// Identifier of the package depended upon
    pub id: String,
    /// Version range text; absent means any version (or, in template mode,
    /// a version to be inferred from the primary artifact)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A raw dependency set keyed by optional target framework.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawDependencySet {
    /// Framework moniker, or absent for all frameworks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<String>,
    /// Dependencies in manifest order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<RawDependency>,
}

/// A raw framework assembly reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RawFrameworkAssembly {
    /// Name of the framework assembly
    pub assembly_name: String,
    /// Framework monikers the reference applies to; empty means all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_frameworks: Vec<String>,
}

/// A raw reference set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawReferenceSet {
    /// Framework moniker, or absent for all frameworks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<String>,
    /// Bare lib-folder file names in manifest order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

/// The raw metadata table of a manifest, all fields as written.
///
/// String fields stay unparsed here because in template mode they may hold
/// placeholder tokens rather than real values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawMetadata {
    /// Package identifier (or `$id$` in a template)
    #[serde(default)]
    pub id: String,
    /// Package version (or `$version$` in a template)
    #[serde(default)]
    pub version: String,
    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Short summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Release notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    /// Copyright statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    /// Language/culture tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Icon URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// License URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    /// Project homepage URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,
    /// Whether consumers must accept the license before install
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub require_license_acceptance: bool,
    /// Whether the package is a development-only dependency
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub development_dependency: bool,
    /// Minimum client version able to install this package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_client_version: Option<String>,
    /// Authors as written
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Owners as written
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
    /// Space-delimited tag string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Dependency sets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_sets: Vec<RawDependencySet>,
    /// Framework assembly references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub framework_assemblies: Vec<RawFrameworkAssembly>,
    /// Reference sets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_sets: Vec<RawReferenceSet>,
}

impl RawMetadata {
    /// Convert the raw metadata into the typed model.
    ///
    /// Call after template resolution; any placeholder still present fails
    /// version parsing (and later identifier validation) rather than leaking
    /// into an archive.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidVersion`] or
    /// [`CapsuleError::InvalidVersionRange`] for unparseable version fields.
    pub fn to_package_metadata(&self) -> Result<PackageMetadata, CapsuleError> {
        let version = parse_version_lenient(&self.version)?;
        let min_client_version = parse_optional_version(self.min_client_version.as_deref())?;

        let mut dependency_sets = Vec::with_capacity(self.dependency_sets.len());
        for raw_set in &self.dependency_sets {
            let mut dependencies = Vec::with_capacity(raw_set.dependencies.len());
            for raw_dep in &raw_set.dependencies {
                let version_range = match raw_dep.version.as_deref() {
                    Some(text) if !text.trim().is_empty() => Some(text.parse::<VersionRange>()?),
                    _ => None,
                };
                dependencies.push(Dependency {
                    id: raw_dep.id.clone(),
                    version_range,
                });
            }
            dependency_sets.push(DependencySet {
                target_framework: raw_set.target_framework.clone(),
                dependencies,
            });
        }

        Ok(PackageMetadata {
            id: self.id.clone(),
            version,
            title: self.title.clone(),
            description: self.description.clone(),
            summary: self.summary.clone(),
            release_notes: self.release_notes.clone(),
            copyright: self.copyright.clone(),
            language: self.language.clone(),
            icon_url: self.icon_url.clone(),
            license_url: self.license_url.clone(),
            project_url: self.project_url.clone(),
            require_license_acceptance: self.require_license_acceptance,
            development_dependency: self.development_dependency,
            min_client_version,
            authors: dedup_names(&self.authors),
            owners: dedup_names(&self.owners),
            tags: self.tags.as_deref().map(parse_tags).unwrap_or_default(),
            dependency_sets,
            framework_assemblies: self
                .framework_assemblies
                .iter()
                .map(|raw| FrameworkAssembly {
                    assembly_name: raw.assembly_name.clone(),
                    target_frameworks: raw.target_frameworks.clone(),
                })
                .collect(),
            reference_sets: self
                .reference_sets
                .iter()
                .map(|raw| ReferenceSet {
                    target_framework: raw.target_framework.clone(),
                    references: raw.references.clone(),
                })
                .collect(),
        })
    }

    /// Build the raw representation of typed metadata, for embedding into the
    /// archive's manifest part.
    #[must_use]
    pub fn from_package_metadata(metadata: &PackageMetadata) -> Self {
        Self {
            id: metadata.id.clone(),
            version: metadata.version.to_string(),
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            summary: metadata.summary.clone(),
            release_notes: metadata.release_notes.clone(),
            copyright: metadata.copyright.clone(),
            language: metadata.language.clone(),
            icon_url: metadata.icon_url.clone(),
            license_url: metadata.license_url.clone(),
            project_url: metadata.project_url.clone(),
            require_license_acceptance: metadata.require_license_acceptance,
            development_dependency: metadata.development_dependency,
            min_client_version: metadata.min_client_version.as_ref().map(ToString::to_string),
            authors: metadata.authors.clone(),
            owners: metadata.owners.clone(),
            tags: if metadata.tags.is_empty() {
                None
            } else {
                Some(metadata.tags_joined())
            },
            dependency_sets: metadata
                .dependency_sets
                .iter()
                .map(|set| RawDependencySet {
                    target_framework: set.target_framework.clone(),
                    dependencies: set
                        .dependencies
                        .iter()
                        .map(|dep| RawDependency {
                            id: dep.id.clone(),
                            version: dep.version_range.as_ref().map(ToString::to_string),
                        })
                        .collect(),
                })
                .collect(),
            framework_assemblies: metadata
                .framework_assemblies
                .iter()
                .map(|fa| RawFrameworkAssembly {
                    assembly_name: fa.assembly_name.clone(),
                    target_frameworks: fa.target_frameworks.clone(),
                })
                .collect(),
            reference_sets: metadata
                .reference_sets
                .iter()
                .map(|rs| RawReferenceSet {
                    target_framework: rs.target_framework.clone(),
                    references: rs.references.clone(),
                })
                .collect(),
        }
    }
}

/// A parsed manifest document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestFile {
    /// Declared schema; `"template"` marks a template manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Structural schema version; set on archive-embedded manifest parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    /// The metadata table
    pub metadata: RawMetadata,
    /// The files section; absent means the package is metadata-only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,
}

impl ManifestFile {
    /// Parse a manifest from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::ManifestParseError`] with `origin` as the file
    /// label when the text is not a valid manifest.
    pub fn parse(text: &str, origin: &str) -> Result<Self, CapsuleError> {
        toml::from_str(text).map_err(|e| CapsuleError::ManifestParseError {
            file: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load and parse a manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be read, or
    /// [`CapsuleError::ManifestParseError`] when it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, CapsuleError> {
        debug!("Loading manifest from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Whether this manifest declares template mode.
    #[must_use]
    pub fn is_template(&self) -> bool {
        self.schema.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(TEMPLATE_SCHEMA))
    }

    /// Serialize the manifest to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::TomlSerError`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, CapsuleError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Serialize typed metadata as an archive manifest part at `schema_version`.
///
/// # Errors
///
/// Returns [`CapsuleError::TomlSerError`] if serialization fails.
pub fn serialize_manifest_part(
    metadata: &PackageMetadata,
    schema_version: u32,
) -> Result<String, CapsuleError> {
    let part = ManifestFile {
        schema: None,
        schema_version: Some(schema_version),
        metadata: RawMetadata::from_package_metadata(metadata),
        files: Vec::new(),
    };
    part.to_toml()
}
