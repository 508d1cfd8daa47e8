//! Template placeholder resolution.
//!
//! A template manifest points at a compiled artifact once and lets the
//! identifying metadata flow from the artifact's own records instead of being
//! duplicated by hand. Six placeholder tokens are recognized:
//! `$id$`, `$version$`, `$title$`, `$author$`, `$copyright$`,
//! `$description$`.
//!
//! Resolution scans the resolved file set for candidate artifacts (a
//! `.dll`/`.winmd` directly under a `lib` or `build` root or its
//! framework-moniker subfolder, excluding `.resources.dll` satellites),
//! inspects them in file-set order, and threads an explicit
//! [`PlaceholderMap`] accumulator through each step: the first artifact to
//! produce a value wins, and every later artifact must agree exactly or the
//! build fails naming both artifacts and values. Resolution succeeds only if
//! at least one candidate was inspected and every registered placeholder
//! ended up with a value.
//!
//! Dependencies without an explicit version range take the inspected
//! artifact's version as their minimum bound; a versionless dependency with
//! no discoverable artifact is fatal.
//!
//! After resolution, unedited template-scaffolding boilerplate (the
//! well-known license/project/icon URL sentinels, release-notes text, and
//! tag list) is cleared so it never leaks into a real package.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::artifact::{ArtifactInspector, ArtifactMetadata};
use crate::core::error::CapsuleError;
use crate::framework::PackageFolder;
use crate::manifest::RawMetadata;
use crate::metadata::ResolvedFile;
use crate::version::parse_version_lenient;

/// Default boilerplate the template scaffolding ships with; cleared on
/// resolution when left unedited.
pub const DEFAULT_LICENSE_URL: &str = "http://LICENSE_URL_HERE_OR_DELETE_THIS_LINE";
/// Project URL boilerplate sentinel.
pub const DEFAULT_PROJECT_URL: &str = "http://PROJECT_URL_HERE_OR_DELETE_THIS_LINE";
/// Icon URL boilerplate sentinel.
pub const DEFAULT_ICON_URL: &str = "http://ICON_URL_HERE_OR_DELETE_THIS_LINE";
/// Release-notes boilerplate sentinel.
pub const DEFAULT_RELEASE_NOTES: &str = "Summary of changes made in this release of the package.";
/// Tags boilerplate sentinel.
pub const DEFAULT_TAGS: &str = "Tag1 Tag2";

/// The enumerated placeholder tokens a template manifest may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Placeholder {
    /// `$id$` - resolves from the artifact name
    Id,
    /// `$version$` - resolves from the artifact version records
    Version,
    /// `$title$` - resolves from the title/product records
    Title,
    /// `$author$` - resolves from the company record
    Author,
    /// `$copyright$` - resolves from the copyright record
    Copyright,
    /// `$description$` - resolves from the description record
    Description,
}

impl Placeholder {
    /// Every placeholder, in resolution order.
    pub const ALL: [Self; 6] = [
        Self::Id,
        Self::Version,
        Self::Title,
        Self::Author,
        Self::Copyright,
        Self::Description,
    ];

    /// The literal token as written in a manifest.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Id => "$id$",
            Self::Version => "$version$",
            Self::Title => "$title$",
            Self::Author => "$author$",
            Self::Copyright => "$copyright$",
            Self::Description => "$description$",
        }
    }

    /// The field name used in error messages.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Version => "version",
            Self::Title => "title",
            Self::Author => "author",
            Self::Copyright => "copyright",
            Self::Description => "description",
        }
    }

    fn matches(self, value: &str) -> bool {
        value.trim().eq_ignore_ascii_case(self.token())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Accumulator tracking each registered placeholder's resolution state.
///
/// Threaded through the scan as a value; the conflict check is a pure
/// function of (current entry, new observation), so it can be tested per
/// field in isolation.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderMap {
    entries: BTreeMap<Placeholder, Resolution>,
}

#[derive(Debug, Clone)]
struct Resolution {
    value: Option<String>,
    /// Archive target of the artifact that produced the value
    source: Option<String>,
}

impl PlaceholderMap {
    /// Register a placeholder as needing resolution.
    pub fn register(&mut self, key: Placeholder) {
        self.entries.entry(key).or_insert(Resolution {
            value: None,
            source: None,
        });
    }

    /// Whether any placeholder is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` was registered.
    #[must_use]
    pub fn contains(&self, key: Placeholder) -> bool {
        self.entries.contains_key(&key)
    }

    /// The resolved value for `key`, if registered and resolved.
    #[must_use]
    pub fn value(&self, key: Placeholder) -> Option<&str> {
        self.entries.get(&key).and_then(|r| r.value.as_deref())
    }

    /// Record an observation of `key` from the artifact at `artifact`.
    ///
    /// First observation resolves the key; later observations must agree
    /// exactly with the resolved value.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::ConflictingArtifactMetadata`] when `value`
    /// differs from an earlier artifact's value.
    pub fn observe(
        &mut self,
        key: Placeholder,
        value: &str,
        artifact: &str,
    ) -> Result<(), CapsuleError> {
        let Some(entry) = self.entries.get_mut(&key) else {
            return Ok(());
        };
        match (&entry.value, &entry.source) {
            (Some(existing), Some(source)) => {
                if existing != value {
                    return Err(CapsuleError::ConflictingArtifactMetadata {
                        field: key.field_name().to_string(),
                        first_artifact: source.clone(),
                        first_value: existing.clone(),
                        second_artifact: artifact.to_string(),
                        second_value: value.to_string(),
                    });
                }
            }
            _ => {
                trace!("Resolved {} = '{}' from {}", key, value, artifact);
                entry.value = Some(value.to_string());
                entry.source = Some(artifact.to_string());
            }
        }
        Ok(())
    }

    /// Tokens of every registered-but-unresolved placeholder.
    #[must_use]
    pub fn unresolved(&self) -> Vec<Placeholder> {
        self.entries
            .iter()
            .filter(|(_, r)| r.value.is_none())
            .map(|(k, _)| *k)
            .collect()
    }

    /// Resolved (placeholder, value) pairs.
    #[must_use]
    pub fn resolved(&self) -> BTreeMap<Placeholder, String> {
        self.entries
            .iter()
            .filter_map(|(k, r)| r.value.clone().map(|v| (*k, v)))
            .collect()
    }
}

/// Result of template resolution: the filled metadata plus the placeholder
/// values that were substituted.
#[derive(Debug, Clone)]
pub struct TemplateOutcome {
    /// Metadata with placeholders replaced and boilerplate cleared
    pub metadata: RawMetadata,
    /// The placeholder values resolved from artifacts
    pub placeholders: BTreeMap<Placeholder, String>,
}

/// Whether a resolved file is a candidate artifact for template resolution.
///
/// Candidates sit directly under a `lib` or `build` root (or its framework
/// subfolder) with a `.dll` or `.winmd` extension; satellite resource
/// assemblies are never candidates.
#[must_use]
pub fn is_candidate_artifact(file: &ResolvedFile) -> bool {
    if !file.is_physical() {
        return false;
    }
    let classified = crate::framework::classify_path(file.target());
    if !matches!(classified.folder, Some(PackageFolder::Lib | PackageFolder::Build)) {
        return false;
    }
    if !classified.is_directly_under_root() {
        return false;
    }
    let Some(name) = classified.file_name() else {
        return false;
    };
    let lower = name.to_ascii_lowercase();
    (lower.ends_with(".dll") || lower.ends_with(".winmd")) && !lower.ends_with(".resources.dll")
}

/// Fill template placeholders in `metadata` from the package's artifacts.
///
/// Scans `files` in order for candidate artifacts, restricts them to the
/// expected primary name when the id is already known, and inspects each
/// through `inspector`, accumulating values and cross-validating agreement.
///
/// # Errors
///
/// - [`CapsuleError::ConflictingArtifactMetadata`] when two artifacts disagree
/// - [`CapsuleError::UnresolvedTemplatePlaceholder`] when keys stay unresolved
///   (including when no candidate artifact could be inspected at all)
/// - [`CapsuleError::MissingDependencyVersionSource`] when a versionless
///   dependency has no artifact version to inherit
pub fn fill_placeholders(
    metadata: &RawMetadata,
    files: &[ResolvedFile],
    inspector: &dyn ArtifactInspector,
) -> Result<TemplateOutcome, CapsuleError> {
    let mut map = PlaceholderMap::default();
    for key in Placeholder::ALL {
        if field_value(metadata, key).iter().any(|v| key.matches(v)) {
            debug!("Registering placeholder {}", key);
            map.register(key);
        }
    }

    let has_versionless_dependency = metadata
        .dependency_sets
        .iter()
        .flat_map(|set| set.dependencies.iter())
        .any(|dep| dep.version.as_deref().is_none_or(|v| v.trim().is_empty()));

    let mut artifact_version: Option<String> = None;
    let mut inspected_any = false;

    if !map.is_empty() || has_versionless_dependency {
        // The primary artifact is the one matching the package id; with the
        // id itself a placeholder, any candidate qualifies
        let expected_name = if map.contains(Placeholder::Id) {
            None
        } else {
            Some(metadata.id.clone())
        };

        for file in files {
            if !is_candidate_artifact(file) {
                continue;
            }
            let stem = file_stem(file.target());
            if let Some(expected) = &expected_name
                && !stem.eq_ignore_ascii_case(expected)
            {
                trace!("Skipping non-primary artifact {}", file.target());
                continue;
            }
            let Some(source) = file.source() else {
                continue;
            };
            let Some(artifact) = inspector.inspect(source)? else {
                debug!("Artifact {} is not inspectable", file.target());
                continue;
            };
            inspected_any = true;
            observe_artifact(&mut map, &artifact, file.target())?;
            if artifact_version.is_none() {
                artifact_version = artifact.version.clone();
            }
        }
    }

    if !map.is_empty() {
        // With no inspectable candidate at all, every registered key is
        // still unresolved, so one check covers both termination conditions
        let unresolved = map.unresolved();
        if !inspected_any || !unresolved.is_empty() {
            return Err(CapsuleError::UnresolvedTemplatePlaceholder {
                placeholders: unresolved.iter().map(|k| k.token()).collect::<Vec<_>>().join(", "),
            });
        }
    }

    let mut filled = substitute(metadata, &map);
    infer_dependency_versions(&mut filled, artifact_version.as_deref())?;
    clear_boilerplate(&mut filled);

    Ok(TemplateOutcome {
        placeholders: map.resolved(),
        metadata: filled,
    })
}

/// The manifest field values a placeholder key is checked against.
fn field_value(metadata: &RawMetadata, key: Placeholder) -> Vec<String> {
    match key {
        Placeholder::Id => vec![metadata.id.clone()],
        Placeholder::Version => vec![metadata.version.clone()],
        Placeholder::Title => metadata.title.clone().into_iter().collect(),
        Placeholder::Author => metadata.authors.clone(),
        Placeholder::Copyright => metadata.copyright.clone().into_iter().collect(),
        Placeholder::Description => metadata.description.clone().into_iter().collect(),
    }
}

fn observe_artifact(
    map: &mut PlaceholderMap,
    artifact: &ArtifactMetadata,
    target: &str,
) -> Result<(), CapsuleError> {
    map.observe(Placeholder::Id, &artifact.name, target)?;
    for (key, value) in [
        (Placeholder::Version, &artifact.version),
        (Placeholder::Title, &artifact.title),
        (Placeholder::Author, &artifact.author),
        (Placeholder::Copyright, &artifact.copyright),
        (Placeholder::Description, &artifact.description),
    ] {
        if let Some(value) = value {
            map.observe(key, value, target)?;
        }
    }
    Ok(())
}

fn substitute(metadata: &RawMetadata, map: &PlaceholderMap) -> RawMetadata {
    let mut filled = metadata.clone();
    if let Some(value) = map.value(Placeholder::Id) {
        filled.id = value.to_string();
    }
    if let Some(value) = map.value(Placeholder::Version) {
        filled.version = value.to_string();
    }
    if let Some(value) = map.value(Placeholder::Title) {
        filled.title = Some(value.to_string());
    }
    if let Some(value) = map.value(Placeholder::Author) {
        for author in &mut filled.authors {
            if Placeholder::Author.matches(author) {
                *author = value.to_string();
            }
        }
    }
    if let Some(value) = map.value(Placeholder::Copyright) {
        filled.copyright = Some(value.to_string());
    }
    if let Some(value) = map.value(Placeholder::Description) {
        filled.description = Some(value.to_string());
    }
    filled
}

/// Give versionless dependencies the artifact version as a minimum bound.
fn infer_dependency_versions(
    metadata: &mut RawMetadata,
    artifact_version: Option<&str>,
) -> Result<(), CapsuleError> {
    for set in &mut metadata.dependency_sets {
        for dep in &mut set.dependencies {
            if dep.version.as_deref().is_some_and(|v| !v.trim().is_empty()) {
                continue;
            }
            let Some(version) = artifact_version else {
                return Err(CapsuleError::MissingDependencyVersionSource {
                    dependency: dep.id.clone(),
                });
            };
            // Validate before adopting; a malformed artifact version must not
            // silently become an unparseable range
            parse_version_lenient(version)?;
            dep.version = Some(version.to_string());
        }
    }
    Ok(())
}

fn clear_boilerplate(metadata: &mut RawMetadata) {
    let clear = |field: &mut Option<String>, sentinel: &str| {
        if field.as_deref().is_some_and(|v| v.trim() == sentinel) {
            *field = None;
        }
    };
    clear(&mut metadata.license_url, DEFAULT_LICENSE_URL);
    clear(&mut metadata.project_url, DEFAULT_PROJECT_URL);
    clear(&mut metadata.icon_url, DEFAULT_ICON_URL);
    clear(&mut metadata.release_notes, DEFAULT_RELEASE_NOTES);
    clear(&mut metadata.tags, DEFAULT_TAGS);
}

fn file_stem(target: &str) -> &str {
    let name = target.rsplit('/').next().unwrap_or(target);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}
