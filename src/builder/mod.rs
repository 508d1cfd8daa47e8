//! Package assembly and emission.
//!
//! [`PackageBuilder`] owns the in-memory package model: typed metadata plus
//! the ordered file set resolved from the manifest's files section. It is
//! constructed once per build - from a manifest descriptor and base directory
//! via [`PackageBuilder::from_manifest`], or programmatically - and from the
//! moment [`PackageBuilder::save`] begins the model is an immutable input.
//!
//! `save` runs the full pipeline in order: validation, schema version
//! inference, then archive emission. The emitted archive is write-once;
//! there is no incremental update path.
//!
//! The whole pipeline is synchronous and single-threaded. Artifact
//! inspection during template resolution visits files in file-set order so
//! "first resolver wins, later ones must agree" stays deterministic.

pub mod emit;
pub mod validation;

use std::collections::BTreeMap;
use std::io::{Seek, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::artifact::ArtifactInspector;
use crate::core::error::CapsuleError;
use crate::core::id::{DefaultIdValidator, IdValidator};
use crate::manifest::ManifestFile;
use crate::metadata::{PackageMetadata, ResolvedFile, dedup_files};
use crate::pattern::{apply_exclusions, resolve_files};
use crate::schema::{SchemaVersion, infer_minimum_version};
use crate::template::{Placeholder, fill_placeholders};

pub use emit::PACKAGE_EXTENSION;

/// Builds a package from metadata and a resolved file set, then emits it.
pub struct PackageBuilder {
    metadata: PackageMetadata,
    files: Vec<ResolvedFile>,
    placeholders: BTreeMap<Placeholder, String>,
    id_validator: Box<dyn IdValidator>,
}

impl std::fmt::Debug for PackageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageBuilder")
            .field("metadata", &self.metadata)
            .field("files", &self.files)
            .field("placeholders", &self.placeholders)
            .finish_non_exhaustive()
    }
}

impl PackageBuilder {
    /// Create a builder from already-typed metadata and no files.
    #[must_use]
    pub fn new(metadata: PackageMetadata) -> Self {
        Self {
            metadata,
            files: Vec::new(),
            placeholders: BTreeMap::new(),
            id_validator: Box::new(DefaultIdValidator),
        }
    }

    /// Build from a parsed manifest and its base directory.
    ///
    /// Resolves the files section first (template resolution inspects the
    /// resolved artifacts), fills placeholders when the manifest declares
    /// template mode, and converts the metadata into its typed form.
    ///
    /// # Errors
    ///
    /// Any resolution error: pattern expansion, template placeholder
    /// resolution, or metadata conversion.
    pub fn from_manifest(
        manifest: &ManifestFile,
        base_dir: &Path,
        inspector: &dyn ArtifactInspector,
    ) -> Result<Self, CapsuleError> {
        let mut files = Vec::new();
        for entry in &manifest.files {
            let mut resolved = resolve_files(base_dir, &entry.source, entry.target.as_deref())?;
            if let Some(exclude) = &entry.exclude {
                resolved = apply_exclusions(resolved, base_dir, exclude)?;
            }
            files.extend(resolved);
        }
        debug!("Resolved {} files from {} manifest entries", files.len(), manifest.files.len());

        let (raw_metadata, placeholders) = if manifest.is_template() {
            let outcome = fill_placeholders(&manifest.metadata, &files, inspector)?;
            (outcome.metadata, outcome.placeholders)
        } else {
            (manifest.metadata.clone(), BTreeMap::new())
        };

        Ok(Self {
            metadata: raw_metadata.to_package_metadata()?,
            files,
            placeholders,
            id_validator: Box::new(DefaultIdValidator),
        })
    }

    /// Replace the identifier validator invoked before every save.
    #[must_use]
    pub fn with_id_validator(mut self, validator: impl IdValidator + 'static) -> Self {
        self.id_validator = Box::new(validator);
        self
    }

    /// Append a resolved file to the file set.
    pub fn add_file(&mut self, file: ResolvedFile) {
        self.files.push(file);
    }

    /// The package metadata.
    #[must_use]
    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    /// The resolved file set, in insertion order.
    #[must_use]
    pub fn files(&self) -> &[ResolvedFile] {
        &self.files
    }

    /// Placeholder values resolved during template mode, empty otherwise.
    #[must_use]
    pub fn placeholders(&self) -> &BTreeMap<Placeholder, String> {
        &self.placeholders
    }

    /// The conventional output file name: `<id>.<version>.capsule`.
    #[must_use]
    pub fn default_output_name(&self) -> String {
        format!("{}.{}.{}", self.metadata.id, self.metadata.version, PACKAGE_EXTENSION)
    }

    /// Run pre-save validation without emitting anything.
    ///
    /// # Errors
    ///
    /// The same validation errors [`PackageBuilder::save`] would report.
    pub fn validate(&self) -> Result<(), CapsuleError> {
        validation::validate_package(&self.metadata, &self.files, self.id_validator.as_ref())
    }

    /// Validate, infer the schema version, and emit the archive.
    ///
    /// Returns the inferred schema version on success. On failure the
    /// written output must be discarded; a mid-copy failure leaves a partial
    /// archive behind the writer.
    ///
    /// # Errors
    ///
    /// Validation errors ([`validation::validate_package`]) and emission
    /// errors ([`emit::write_archive`]).
    pub fn save<W: Write + Seek>(&self, writer: W) -> Result<SchemaVersion, CapsuleError> {
        validation::validate_package(&self.metadata, &self.files, self.id_validator.as_ref())?;

        // Set semantics on write; insertion order everywhere else
        let files = dedup_files(self.files.clone());
        let schema_version = infer_minimum_version(&files);
        debug!(
            "Emitting {} v{} at schema version {}",
            self.metadata.id,
            self.metadata.version,
            schema_version.ordinal()
        );

        emit::write_archive(&self.metadata, &files, schema_version, writer)?;
        info!("Packaged {} v{}", self.metadata.id, self.metadata.version);
        Ok(schema_version)
    }
}
