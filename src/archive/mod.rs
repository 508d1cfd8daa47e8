//! Reading emitted package archives.
//!
//! Opens a `.capsule` archive the way a consuming client would: resolve the
//! manifest part through the relationships stream, parse it back into typed
//! metadata, and list the content parts. Exists for the round-trip
//! guarantee (what was built can be read back identically) and for the
//! `capsule show` command.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::builder::emit::{
    CONTENT_TYPES_PATH, CoreProperties, MANIFEST_RELATIONSHIP_TYPE, PROPERTIES_PATH,
    RELATIONSHIPS_PATH, Relationships,
};
use crate::core::error::CapsuleError;
use crate::manifest::ManifestFile;
use crate::metadata::PackageMetadata;

/// A parsed package archive.
#[derive(Debug, Clone)]
pub struct PackageArchive {
    /// The metadata read back from the manifest part
    pub metadata: PackageMetadata,
    /// Schema version declared by the manifest part
    pub schema_version: u32,
    /// Archive-level descriptive properties
    pub properties: CoreProperties,
    /// Content part paths, in archive order
    pub files: Vec<String>,
    /// Empty-folder entries, in archive order
    pub folders: Vec<String>,
}

impl PackageArchive {
    /// Read a package archive from any seekable reader.
    ///
    /// # Errors
    ///
    /// [`CapsuleError::InvalidArchive`] when the container is missing its
    /// relationships stream, manifest part, or properties part; zip and
    /// parse errors otherwise.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CapsuleError> {
        let mut zip = ZipArchive::new(reader)?;

        let relationships: Relationships =
            toml::from_str(&read_part(&mut zip, RELATIONSHIPS_PATH)?)?;
        let manifest_path = relationships
            .target_of(MANIFEST_RELATIONSHIP_TYPE)
            .ok_or_else(|| CapsuleError::InvalidArchive {
                reason: "relationships stream declares no manifest part".to_string(),
            })?
            .trim_start_matches('/')
            .to_string();
        debug!("Manifest part at {}", manifest_path);

        let manifest = ManifestFile::parse(&read_part(&mut zip, &manifest_path)?, &manifest_path)?;
        let metadata = manifest.metadata.to_package_metadata()?;
        let schema_version = manifest.schema_version.unwrap_or(1);

        let properties: CoreProperties = toml::from_str(&read_part(&mut zip, PROPERTIES_PATH)?)?;

        let mut files = Vec::new();
        let mut folders = Vec::new();
        for index in 0..zip.len() {
            let entry = zip.by_index(index)?;
            let name = entry.name().to_string();
            if entry.is_dir() {
                folders.push(name.trim_end_matches('/').to_string());
            } else if name != RELATIONSHIPS_PATH
                && name != CONTENT_TYPES_PATH
                && name != PROPERTIES_PATH
                && name != manifest_path
            {
                files.push(name);
            }
        }

        Ok(Self {
            metadata,
            schema_version,
            properties,
            files,
            folders,
        })
    }

    /// Open and read a package archive from disk.
    ///
    /// # Errors
    ///
    /// IO errors opening the file, plus everything [`PackageArchive::read`]
    /// reports.
    pub fn open(path: &Path) -> Result<Self, CapsuleError> {
        let file = File::open(path)?;
        Self::read(file)
    }
}

fn read_part<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, CapsuleError> {
    let mut entry = zip.by_name(name).map_err(|_| CapsuleError::InvalidArchive {
        reason: format!("missing required part '{name}'"),
    })?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_archive_without_relationships_is_invalid() {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut buffer);
        writer.start_file("random.txt", SimpleFileOptions::default()).unwrap();
        std::io::Write::write_all(&mut writer, b"hello").unwrap();
        writer.finish().unwrap();
        buffer.set_position(0);

        let err = PackageArchive::read(buffer).unwrap_err();
        match err {
            CapsuleError::InvalidArchive { reason } => {
                assert!(reason.contains(RELATIONSHIPS_PATH));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_a_zip_is_an_archive_error() {
        let err = PackageArchive::read(Cursor::new(b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, CapsuleError::ZipError { .. }));
    }
}
