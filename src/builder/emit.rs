//! Archive emission.
//!
//! An emitted package is a zip container with four internal parts plus one
//! part per content file:
//!
//! - `_rels/.rels` - the relationships stream linking well-known relationship
//!   types to the manifest and properties parts
//! - `[Content_Types].toml` - the generic content type plus per-part
//!   overrides
//! - `<id>.pkgspec` - the manifest part, serialized at the inferred schema
//!   version
//! - `package/properties.toml` - archive-level descriptive properties
//!
//! Every part is written with maximum deflate compression and a fixed
//! timestamp, so emitting the same package twice produces byte-identical
//! output. Content files are copied through scoped stream acquisitions; a
//! failure mid-copy aborts the whole save rather than emitting a partial
//! member. Empty-folder markers become directory entries - they occupy no
//! real archive entry.

use std::fs::File;
use std::io::{Seek, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::core::error::CapsuleError;
use crate::manifest::{MANIFEST_EXTENSION, is_manifest_path, serialize_manifest_part};
use crate::metadata::{PackageMetadata, ResolvedFile};
use crate::schema::SchemaVersion;

/// File extension of emitted package archives.
pub const PACKAGE_EXTENSION: &str = "capsule";

/// Archive path of the relationships stream.
pub const RELATIONSHIPS_PATH: &str = "_rels/.rels";

/// Archive path of the content-types part.
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].toml";

/// Generic content type recorded for content parts.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type of manifest parts.
pub const MANIFEST_CONTENT_TYPE: &str = "application/capsule-manifest+toml";

/// Archive path of the core properties part.
pub const PROPERTIES_PATH: &str = "package/properties.toml";

/// Relationship type linking the archive root to its manifest part.
pub const MANIFEST_RELATIONSHIP_TYPE: &str = "https://capsule.dev/relationships/manifest";

/// Relationship type linking the archive root to its properties part.
pub const PROPERTIES_RELATIONSHIP_TYPE: &str = "https://capsule.dev/relationships/core-properties";

/// Fixed subject string recorded in the properties part.
pub const PACKAGE_SUBJECT: &str = "Capsule package";

/// One entry of the relationships stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship identifier, unique within the stream
    pub id: String,
    /// Well-known relationship type
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// Absolute internal URI of the related part
    pub target: String,
}

/// The relationships stream document.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Relationships {
    /// The relationships, in emission order
    #[serde(default, rename = "relationship")]
    pub relationships: Vec<Relationship>,
}

impl Relationships {
    /// The target of the first relationship of `relationship_type`, if any.
    #[must_use]
    pub fn target_of(&self, relationship_type: &str) -> Option<&str> {
        self.relationships
            .iter()
            .find(|r| r.relationship_type == relationship_type)
            .map(|r| r.target.as_str())
    }
}

/// The content-types part: a generic default plus per-part overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentTypes {
    /// Content type applied to every part without an override
    pub default: String,
    /// Per-part content types, keyed by absolute internal URI
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub overrides: std::collections::BTreeMap<String, String>,
}

/// Archive-level descriptive properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CoreProperties {
    /// Comma-joined author list
    pub creator: String,
    /// Package description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Package identifier
    pub identifier: String,
    /// Package version string
    pub version: String,
    /// Language/culture tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Space-joined tag list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Package title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Fixed subject marker identifying capsule archives
    pub subject: String,
}

impl CoreProperties {
    /// Build the properties part for `metadata`.
    #[must_use]
    pub fn from_metadata(metadata: &PackageMetadata) -> Self {
        Self {
            creator: metadata.authors_joined(),
            description: metadata.description.clone(),
            identifier: metadata.id.clone(),
            version: metadata.version.to_string(),
            language: metadata.language.clone(),
            keywords: if metadata.tags.is_empty() {
                None
            } else {
                Some(metadata.tags_joined())
            },
            title: metadata.title.clone(),
            subject: PACKAGE_SUBJECT.to_string(),
        }
    }
}

/// The archive path of a package's manifest part.
#[must_use]
pub fn manifest_part_path(id: &str) -> String {
    format!("{id}.{MANIFEST_EXTENSION}")
}

/// Serialize the package into `writer` as a complete archive.
///
/// `files` must already be de-duplicated; entries whose target is itself a
/// root-level manifest path are skipped to avoid double-embedding.
///
/// # Errors
///
/// Fails on any IO or zip error; the caller must treat the output as
/// unusable when an error is returned, since the archive may hold a partial
/// member set.
pub fn write_archive<W: Write + Seek>(
    metadata: &PackageMetadata,
    files: &[ResolvedFile],
    schema_version: SchemaVersion,
    writer: W,
) -> Result<(), CapsuleError> {
    // Fixed timestamp keeps emission byte-reproducible
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(writer);
    let manifest_path = manifest_part_path(&metadata.id);

    let relationships = Relationships {
        relationships: vec![
            Relationship {
                id: "R1".to_string(),
                relationship_type: MANIFEST_RELATIONSHIP_TYPE.to_string(),
                target: format!("/{manifest_path}"),
            },
            Relationship {
                id: "R2".to_string(),
                relationship_type: PROPERTIES_RELATIONSHIP_TYPE.to_string(),
                target: format!("/{PROPERTIES_PATH}"),
            },
        ],
    };
    zip.start_file(RELATIONSHIPS_PATH, options)?;
    zip.write_all(toml::to_string_pretty(&relationships)?.as_bytes())?;

    let content_types = ContentTypes {
        default: DEFAULT_CONTENT_TYPE.to_string(),
        overrides: std::collections::BTreeMap::from([(
            format!("/{manifest_path}"),
            MANIFEST_CONTENT_TYPE.to_string(),
        )]),
    };
    zip.start_file(CONTENT_TYPES_PATH, options)?;
    zip.write_all(toml::to_string_pretty(&content_types)?.as_bytes())?;

    zip.start_file(manifest_path.as_str(), options)?;
    zip.write_all(serialize_manifest_part(metadata, schema_version.ordinal())?.as_bytes())?;

    zip.start_file(PROPERTIES_PATH, options)?;
    let properties = CoreProperties::from_metadata(metadata);
    zip.write_all(toml::to_string_pretty(&properties)?.as_bytes())?;

    for file in files {
        match file {
            ResolvedFile::Physical { source, target } => {
                if is_manifest_path(target) {
                    debug!("Skipping manifest-path file {}", target);
                    continue;
                }
                zip.start_file(target.as_str(), options)?;
                // Scoped acquisition: opened, copied, closed before the next
                // entry; a failed copy aborts the save
                let mut stream = File::open(source)?;
                std::io::copy(&mut stream, &mut zip)?;
            }
            ResolvedFile::EmptyFolder { target } => {
                if target.is_empty() {
                    continue;
                }
                zip.add_directory(target.as_str(), options)?;
            }
        }
    }

    zip.finish()?;
    Ok(())
}
