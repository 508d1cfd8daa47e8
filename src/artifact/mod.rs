//! Artifact metadata inspection.
//!
//! Compiled artifacts carry declarative metadata records (version, title,
//! company, copyright, description) embedded by their build toolchain.
//! Template resolution reads those records to fill manifest placeholders, so
//! identifying metadata flows from the artifact itself instead of being
//! duplicated in the manifest and drifting.
//!
//! The core depends only on the [`ArtifactInspector`] trait: a synchronous
//! `inspect(path) -> Option<ArtifactMetadata>` call. Hosts that need to keep
//! untrusted binaries out of their own process can satisfy the trait from a
//! sandboxed subprocess; the bundled [`EmbeddedRecordInspector`] reads the
//! record block directly from the file.
//!
//! # Record block format
//!
//! A record block is located by the [`METADATA_MAGIC`] marker anywhere in the
//! artifact, followed by a little-endian `u32` length and that many bytes of
//! JSON holding the raw records. An artifact without a block, or with one
//! that cannot be decoded, is simply "not inspectable" - never an error.
//!
//! # Field fallbacks
//!
//! Each resolved field falls back through record tiers:
//!
//! - version: informational version → assembly version → file version
//! - title: title record → product record
//! - author: company record
//!
//! When the informational version carries a pre-release label, the raw
//! numeric assembly version is cross-checked for auto-generated build and
//! revision components (build = days since 2000-01-01, revision =
//! half-seconds since midnight, both judged against wall-clock now at
//! inspection time). Auto-generated components are appended back onto the
//! informational version as a `.build.revision` suffix, because hand-authored
//! informational versions silently collide across builds when only the
//! auto-incremented numeric version changed.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, trace};

use crate::core::error::CapsuleError;

/// Marker locating an embedded record block inside an artifact.
pub const METADATA_MAGIC: &[u8] = b"\0CAPSMETA\0";

/// Reference date for auto-generated build numbers (days since 2000-01-01).
const BUILD_EPOCH: (i32, u32, u32) = (2000, 1, 1);

/// Tolerance, in half-second units, when matching an auto-generated revision
/// against the current time of day.
const REVISION_TOLERANCE: i64 = 120;

/// Raw metadata records as embedded in an artifact.
///
/// Every field is optional; extraction applies fallbacks across them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordBlock {
    /// Hand-authored informational version, e.g. `1.2.3-beta`
    pub informational_version: Option<String>,
    /// Four-part numeric assembly version, e.g. `1.2.3.4`
    pub assembly_version: Option<String>,
    /// Four-part numeric file version
    pub file_version: Option<String>,
    /// Assembly title record
    pub title: Option<String>,
    /// Product name record
    pub product: Option<String>,
    /// Company record
    pub company: Option<String>,
    /// Copyright record
    pub copyright: Option<String>,
    /// Description record
    pub description: Option<String>,
}

/// Resolved metadata for one artifact, after record fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// The artifact's name (file stem); resolves `$id$`
    pub name: String,
    /// Best-available version string
    pub version: Option<String>,
    /// Title, falling back to product name
    pub title: Option<String>,
    /// Author, from the company record
    pub author: Option<String>,
    /// Copyright statement
    pub copyright: Option<String>,
    /// Description
    pub description: Option<String>,
}

/// Capability boundary for artifact inspection.
///
/// Implementations return `Ok(None)` for artifacts they cannot read - wrong
/// format, missing records, unreadable file. Absence only becomes an error
/// at the template layer, when a required placeholder stays unresolved.
pub trait ArtifactInspector {
    /// Inspect the artifact at `path`, returning its metadata if readable.
    ///
    /// # Errors
    ///
    /// Implementations backed by external processes may fail to communicate;
    /// the in-process reader never errors.
    fn inspect(&self, path: &Path) -> Result<Option<ArtifactMetadata>, CapsuleError>;
}

/// In-process inspector reading the embedded record block.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedRecordInspector;

impl ArtifactInspector for EmbeddedRecordInspector {
    fn inspect(&self, path: &Path) -> Result<Option<ArtifactMetadata>, CapsuleError> {
        let Some(block) = read_record_block(path) else {
            debug!("No metadata record block in {:?}", path);
            return Ok(None);
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Some(resolve_metadata(name, &block, Utc::now())))
    }
}

/// Locate and decode the record block of an artifact.
///
/// Returns `None` for any unreadable artifact: missing file, no magic
/// marker, truncated length, or undecodable JSON.
#[must_use]
pub fn read_record_block(path: &Path) -> Option<RecordBlock> {
    let bytes = std::fs::read(path).ok()?;
    let start = find_magic(&bytes)? + METADATA_MAGIC.len();
    let length_bytes: [u8; 4] = bytes.get(start..start + 4)?.try_into().ok()?;
    let length = u32::from_le_bytes(length_bytes) as usize;
    let payload = bytes.get(start + 4..start + 4 + length)?;
    serde_json::from_slice(payload).ok()
}

/// Encode a record block in the embedded on-disk layout.
///
/// The counterpart of [`read_record_block`], used by build tooling (and
/// tests) that stamps metadata into artifacts.
#[must_use]
pub fn encode_record_block(block: &RecordBlock) -> Vec<u8> {
    let payload = serde_json::to_vec(block).expect("record block serializes");
    let mut bytes = Vec::with_capacity(METADATA_MAGIC.len() + 4 + payload.len());
    bytes.extend_from_slice(METADATA_MAGIC);
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&payload);
    bytes
}

fn find_magic(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(METADATA_MAGIC.len())
        .position(|window| window == METADATA_MAGIC)
}

/// Four-part numeric version as produced by build toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericVersion {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Build component; auto-generated as days since 2000-01-01
    pub build: u64,
    /// Revision component; auto-generated as half-seconds since midnight
    pub revision: u64,
}

impl NumericVersion {
    /// Parse a dotted numeric version with up to four components.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = [0u64; 4];
        let mut count = 0;
        for segment in text.trim().split('.') {
            if count == 4 {
                return None;
            }
            parts[count] = segment.parse().ok()?;
            count += 1;
        }
        if count < 2 {
            return None;
        }
        Some(Self {
            major: parts[0],
            minor: parts[1],
            build: parts[2],
            revision: parts[3],
        })
    }
}

/// Apply record fallbacks and the auto-generated-version heuristic.
///
/// `now` is the inspection-time wall clock; classification of build/revision
/// components is deliberately relative to now, not to the artifact's own
/// build time.
#[must_use]
pub fn resolve_metadata(name: String, block: &RecordBlock, now: DateTime<Utc>) -> ArtifactMetadata {
    let version = resolve_version(block, now);
    ArtifactMetadata {
        name,
        version,
        title: block.title.clone().or_else(|| block.product.clone()),
        author: block.company.clone(),
        copyright: block.copyright.clone(),
        description: block.description.clone(),
    }
}

fn resolve_version(block: &RecordBlock, now: DateTime<Utc>) -> Option<String> {
    if let Some(informational) = &block.informational_version {
        let mut version = informational.clone();
        // A hand-authored pre-release string can collide across builds when
        // only the auto-incremented numeric version moved; stamp the numeric
        // suffix back on when it looks auto-generated
        if version.contains('-')
            && let Some(numeric) = block.assembly_version.as_deref().and_then(NumericVersion::parse)
            && looks_auto_generated(numeric, now)
        {
            trace!("Appending auto-generated suffix {}.{}", numeric.build, numeric.revision);
            version = format!("{version}.{}.{}", numeric.build, numeric.revision);
        }
        return Some(version);
    }
    block.assembly_version.clone().or_else(|| block.file_version.clone())
}

/// Whether a numeric version's build/revision components match the
/// auto-generation scheme, judged against `now`.
fn looks_auto_generated(numeric: NumericVersion, now: DateTime<Utc>) -> bool {
    let epoch = NaiveDate::from_ymd_opt(BUILD_EPOCH.0, BUILD_EPOCH.1, BUILD_EPOCH.2)
        .expect("valid epoch date");
    let days_today = (now.date_naive() - epoch).num_days();
    let Ok(build) = i64::try_from(numeric.build) else {
        return false;
    };
    if build != days_today {
        return false;
    }
    let half_seconds_now = i64::from(now.time().num_seconds_from_midnight()) / 2;
    let Ok(revision) = i64::try_from(numeric.revision) else {
        return false;
    };
    (revision - half_seconds_now).abs() <= REVISION_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn block_with_versions(
        informational: Option<&str>,
        assembly: Option<&str>,
        file: Option<&str>,
    ) -> RecordBlock {
        RecordBlock {
            informational_version: informational.map(str::to_string),
            assembly_version: assembly.map(str::to_string),
            file_version: file.map(str::to_string),
            ..RecordBlock::default()
        }
    }

    /// A fixed "now" of 10:00:00 UTC with matching auto-generated components.
    fn fixed_now() -> (DateTime<Utc>, u64, u64) {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let build = u64::try_from((now.date_naive() - epoch).num_days()).unwrap();
        let revision = u64::from(now.time().num_seconds_from_midnight()) / 2;
        (now, build, revision)
    }

    #[test]
    fn test_record_block_round_trip_through_artifact() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("Sample.dll");

        let block = RecordBlock {
            informational_version: Some("1.2.3".to_string()),
            title: Some("Sample Library".to_string()),
            company: Some("Acme".to_string()),
            ..RecordBlock::default()
        };

        // Record block embedded mid-file, surrounded by machine code bytes
        let mut bytes = vec![0x4d, 0x5a, 0x90, 0x00];
        bytes.extend_from_slice(&encode_record_block(&block));
        bytes.extend_from_slice(&[0xcc; 16]);
        fs::write(&artifact, &bytes).unwrap();

        assert_eq!(read_record_block(&artifact), Some(block));
    }

    #[test]
    fn test_unreadable_artifacts_are_absent_not_errors() {
        let temp = TempDir::new().unwrap();

        // Missing file
        assert!(read_record_block(&temp.path().join("nope.dll")).is_none());

        // No magic marker
        let plain = temp.path().join("plain.dll");
        fs::write(&plain, b"no records here").unwrap();
        assert!(read_record_block(&plain).is_none());

        // Truncated payload
        let truncated = temp.path().join("truncated.dll");
        let mut bytes = METADATA_MAGIC.to_vec();
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(b"{}");
        fs::write(&truncated, &bytes).unwrap();
        assert!(read_record_block(&truncated).is_none());

        let inspector = EmbeddedRecordInspector;
        assert_eq!(inspector.inspect(&plain).unwrap(), None);
    }

    #[test]
    fn test_inspector_resolves_name_from_file_stem() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("Acme.Widgets.dll");
        fs::write(&artifact, encode_record_block(&RecordBlock::default())).unwrap();

        let metadata = EmbeddedRecordInspector.inspect(&artifact).unwrap().unwrap();
        assert_eq!(metadata.name, "Acme.Widgets");
        assert_eq!(metadata.version, None);
    }

    #[test]
    fn test_version_fallback_tiers() {
        let (now, _, _) = fixed_now();

        let block = block_with_versions(Some("2.0.0"), Some("1.0.0.0"), Some("0.9.0.0"));
        assert_eq!(resolve_metadata("A".into(), &block, now).version.as_deref(), Some("2.0.0"));

        let block = block_with_versions(None, Some("1.0.0.0"), Some("0.9.0.0"));
        assert_eq!(resolve_metadata("A".into(), &block, now).version.as_deref(), Some("1.0.0.0"));

        let block = block_with_versions(None, None, Some("0.9.0.0"));
        assert_eq!(resolve_metadata("A".into(), &block, now).version.as_deref(), Some("0.9.0.0"));

        let block = block_with_versions(None, None, None);
        assert_eq!(resolve_metadata("A".into(), &block, now).version, None);
    }

    #[test]
    fn test_title_falls_back_to_product() {
        let (now, _, _) = fixed_now();
        let block = RecordBlock {
            product: Some("Acme Product".to_string()),
            ..RecordBlock::default()
        };
        assert_eq!(
            resolve_metadata("A".into(), &block, now).title.as_deref(),
            Some("Acme Product")
        );

        let block = RecordBlock {
            title: Some("Acme Title".to_string()),
            product: Some("Acme Product".to_string()),
            ..RecordBlock::default()
        };
        assert_eq!(
            resolve_metadata("A".into(), &block, now).title.as_deref(),
            Some("Acme Title")
        );
    }

    #[test]
    fn test_auto_generated_suffix_appended_to_prerelease() {
        let (now, build, revision) = fixed_now();
        let block = block_with_versions(
            Some("1.2.3-beta"),
            Some(&format!("1.2.{build}.{revision}")),
            None,
        );
        assert_eq!(
            resolve_metadata("A".into(), &block, now).version,
            Some(format!("1.2.3-beta.{build}.{revision}"))
        );
    }

    #[test]
    fn test_auto_generated_suffix_within_tolerance() {
        let (now, build, revision) = fixed_now();
        let block = block_with_versions(
            Some("1.2.3-beta"),
            Some(&format!("1.2.{build}.{}", revision - 30)),
            None,
        );
        let resolved = resolve_metadata("A".into(), &block, now).version.unwrap();
        assert!(resolved.starts_with("1.2.3-beta."));
    }

    #[test]
    fn test_stable_informational_version_untouched() {
        let (now, build, revision) = fixed_now();
        let block =
            block_with_versions(Some("1.2.3"), Some(&format!("1.2.{build}.{revision}")), None);
        assert_eq!(resolve_metadata("A".into(), &block, now).version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_hand_authored_numeric_version_untouched() {
        let (now, _, _) = fixed_now();

        // Build does not match today's day count
        let block = block_with_versions(Some("1.2.3-beta"), Some("1.2.3.4"), None);
        assert_eq!(
            resolve_metadata("A".into(), &block, now).version.as_deref(),
            Some("1.2.3-beta")
        );

        // Build matches but revision is far from the current time of day
        let (_, build, revision) = fixed_now();
        let far_revision = revision + 10_000;
        let block = block_with_versions(
            Some("1.2.3-beta"),
            Some(&format!("1.2.{build}.{far_revision}")),
            None,
        );
        assert_eq!(
            resolve_metadata("A".into(), &block, now).version.as_deref(),
            Some("1.2.3-beta")
        );
    }

    #[test]
    fn test_numeric_version_parsing() {
        assert_eq!(NumericVersion::parse("1.2.3.4"), Some(NumericVersion {
            major: 1,
            minor: 2,
            build: 3,
            revision: 4
        }));
        assert_eq!(NumericVersion::parse("1.2"), Some(NumericVersion {
            major: 1,
            minor: 2,
            build: 0,
            revision: 0
        }));
        assert!(NumericVersion::parse("1").is_none());
        assert!(NumericVersion::parse("1.2.3.4.5").is_none());
        assert!(NumericVersion::parse("1.2.x").is_none());
    }
}
