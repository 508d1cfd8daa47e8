//! Capsule - a manifest-driven package archive builder.
//!
//! Capsule assembles a structured package archive (a zip container holding a
//! declarative metadata document plus a tree of content files) from a
//! manifest descriptor and a file-system source tree.
//!
//! # Pipeline
//!
//! Building a package runs these stages in order:
//!
//! 1. **Manifest parsing** ([`manifest`]) - read the TOML descriptor: a
//!    metadata table plus `{ source, target, exclude }` file entries.
//! 2. **File resolution** ([`pattern`]) - expand each source entry (literal
//!    path, directory, or glob) into concrete (source, archive-target)
//!    pairs, applying exclusion filters.
//! 3. **Template resolution** ([`template`]) - when the manifest declares
//!    template mode, fill `$id$`-style placeholders from metadata records
//!    embedded in the package's compiled artifacts ([`artifact`]).
//! 4. **Validation** ([`builder::validation`]) - identifier grammar,
//!    non-empty content, pre-release dependency consistency, and
//!    reference-assembly presence.
//! 5. **Schema inference** ([`schema`]) - pick the minimum manifest schema
//!    version able to represent the file set.
//! 6. **Emission** ([`builder::emit`]) - write the archive: relationships
//!    stream, manifest part, properties part, and one entry per
//!    de-duplicated content file, at maximum compression with fixed
//!    timestamps for reproducible output.
//!
//! Emitted archives can be read back with [`archive::PackageArchive`].
//!
//! # Example
//!
//! ```rust,no_run
//! use capsule_cli::artifact::EmbeddedRecordInspector;
//! use capsule_cli::builder::PackageBuilder;
//! use capsule_cli::manifest::ManifestFile;
//! use std::fs::File;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let manifest = ManifestFile::load(Path::new("Sample.pkgspec"))?;
//! let builder =
//!     PackageBuilder::from_manifest(&manifest, Path::new("."), &EmbeddedRecordInspector)?;
//! let output = File::create(builder.default_output_name())?;
//! builder.save(output)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The pipeline is synchronous and single-threaded by design: template
//! resolution inspects artifacts in file-set order so conflict detection is
//! deterministic, and the archive writer holds exclusive access to its
//! output for the duration of a save.

// Core functionality
pub mod builder;
pub mod core;
pub mod manifest;
pub mod metadata;

// Resolution stages
pub mod artifact;
pub mod pattern;
pub mod schema;
pub mod template;

// Supporting modules
pub mod archive;
pub mod cli;
pub mod framework;
pub mod version;
