//! The `show` command: inspect an existing package archive.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::archive::PackageArchive;

/// Arguments for `capsule show`.
#[derive(Args)]
pub struct ShowArgs {
    /// Path to the package archive (.capsule)
    package: PathBuf,
}

impl ShowArgs {
    /// Print the archive's metadata and contents.
    ///
    /// # Errors
    ///
    /// Archive open and parse errors.
    pub fn execute(self) -> Result<()> {
        let archive = PackageArchive::open(&self.package)?;
        let metadata = &archive.metadata;

        println!("{} {}", "Package:".bold(), metadata.id);
        println!("{} {}", "Version:".bold(), metadata.version);
        println!("{} {}", "Authors:".bold(), metadata.authors_joined());
        if let Some(description) = &metadata.description {
            println!("{} {}", "Description:".bold(), description);
        }
        if !metadata.tags.is_empty() {
            println!("{} {}", "Tags:".bold(), metadata.tags_joined());
        }
        println!("{} {}", "Schema version:".bold(), archive.schema_version);

        if !metadata.dependency_sets.is_empty() {
            println!("{}", "Dependencies:".bold());
            for set in &metadata.dependency_sets {
                let framework =
                    set.target_framework.as_deref().unwrap_or("any framework");
                for dependency in &set.dependencies {
                    let range = dependency
                        .version_range
                        .as_ref()
                        .map_or_else(|| "any".to_string(), ToString::to_string);
                    println!("  {} {} ({framework})", dependency.id, range);
                }
            }
        }

        println!("{}", "Contents:".bold());
        for file in &archive.files {
            println!("  {file}");
        }
        for folder in &archive.folders {
            println!("  {folder}/ {}", "(empty)".dimmed());
        }
        Ok(())
    }
}
