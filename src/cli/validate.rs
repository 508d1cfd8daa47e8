//! The `validate` command: resolve and validate without emitting.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::artifact::EmbeddedRecordInspector;
use crate::builder::PackageBuilder;
use crate::manifest::ManifestFile;

/// Arguments for `capsule validate`.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the manifest file (.pkgspec)
    manifest: PathBuf,

    /// Base directory the manifest's source patterns resolve against;
    /// defaults to the manifest's own directory
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

impl ValidateArgs {
    /// Validate the manifest end to end: parse, resolve files, fill
    /// templates, and run every pre-save check.
    ///
    /// # Errors
    ///
    /// The first validation failure encountered.
    pub fn execute(self, quiet: bool) -> Result<()> {
        let manifest = ManifestFile::load(&self.manifest)?;
        let base_dir = self
            .base_dir
            .or_else(|| self.manifest.parent().map(std::path::Path::to_path_buf))
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));

        let builder = PackageBuilder::from_manifest(&manifest, &base_dir, &EmbeddedRecordInspector)?;
        builder.validate()?;

        if !quiet {
            println!(
                "{} {} v{} ({} files)",
                "Valid".green().bold(),
                builder.metadata().id,
                builder.metadata().version,
                builder.files().len()
            );
        }
        Ok(())
    }
}
