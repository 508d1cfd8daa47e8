//! The `pack` command: build an archive from a manifest.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::debug;

use crate::artifact::EmbeddedRecordInspector;
use crate::builder::PackageBuilder;
use crate::manifest::ManifestFile;

/// Arguments for `capsule pack`.
#[derive(Args)]
pub struct PackArgs {
    /// Path to the manifest file (.pkgspec)
    manifest: PathBuf,

    /// Output archive path; defaults to <id>.<version>.capsule next to the manifest
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Base directory the manifest's source patterns resolve against;
    /// defaults to the manifest's own directory
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

impl PackArgs {
    /// Build the archive.
    ///
    /// # Errors
    ///
    /// Manifest, resolution, validation, and emission errors.
    pub fn execute(self, quiet: bool) -> Result<()> {
        let manifest = ManifestFile::load(&self.manifest)?;
        let base_dir = self.resolve_base_dir();
        debug!("Packing {:?} against base {:?}", self.manifest, base_dir);

        let builder = PackageBuilder::from_manifest(&manifest, &base_dir, &EmbeddedRecordInspector)?;

        if !quiet {
            for (placeholder, value) in builder.placeholders() {
                println!("  {} {} => {}", "resolved".cyan(), placeholder, value);
            }
        }

        let output = self
            .output
            .unwrap_or_else(|| base_dir.join(builder.default_output_name()));
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {parent:?}"))?;
        }

        let file = File::create(&output)
            .with_context(|| format!("Failed to create output file {output:?}"))?;
        if let Err(error) = builder.save(file) {
            // Never leave a partial archive behind
            let _ = std::fs::remove_file(&output);
            return Err(error.into());
        }

        if !quiet {
            println!(
                "{} {} v{} -> {}",
                "Packaged".green().bold(),
                builder.metadata().id,
                builder.metadata().version,
                output.display()
            );
        }
        Ok(())
    }

    fn resolve_base_dir(&self) -> PathBuf {
        if let Some(base) = &self.base_dir {
            return base.clone();
        }
        let parent = self.manifest.parent().unwrap_or_else(|| std::path::Path::new(""));
        if parent.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            parent.to_path_buf()
        }
    }
}
