//! Command-line interface for Capsule.
//!
//! Each command lives in its own module with its own argument struct and
//! execution logic:
//!
//! - `pack` - build a package archive from a manifest and a source tree
//! - `validate` - resolve and validate a manifest without emitting anything
//! - `show` - print the metadata and contents of an existing archive
//!
//! # Usage
//!
//! ```bash
//! # Build Sample.1.2.3.capsule next to the manifest
//! capsule pack Sample.pkgspec
//!
//! # Build with an explicit base directory and output path
//! capsule pack Sample.pkgspec --base-dir ./out --output dist/Sample.capsule
//!
//! # Check a manifest without producing an archive
//! capsule validate Sample.pkgspec
//!
//! # Inspect an archive
//! capsule show dist/Sample.1.2.3.capsule
//! ```

mod pack;
mod show;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Top-level command-line interface.
///
/// Handles global flags and delegates to subcommands.
#[derive(Parser)]
#[command(
    name = "capsule",
    about = "Capsule - build manifest-described package archives",
    version,
    author
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build a package archive from a manifest
    Pack(pack::PackArgs),

    /// Validate a manifest without emitting an archive
    Validate(validate::ValidateArgs),

    /// Show the metadata and contents of a package archive
    Show(show::ShowArgs),
}

impl Cli {
    /// Execute the selected command.
    ///
    /// # Errors
    ///
    /// Propagates the command's error for `main` to render user-friendly.
    pub fn execute(self) -> Result<()> {
        self.init_logging();
        match self.command {
            Commands::Pack(args) => args.execute(self.quiet),
            Commands::Validate(args) => args.execute(self.quiet),
            Commands::Show(args) => args.execute(),
        }
    }

    fn init_logging(&self) {
        let filter = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}
