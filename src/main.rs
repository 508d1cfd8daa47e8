//! Capsule CLI entry point.
//!
//! Parses command-line arguments, executes the selected command, and renders
//! failures as user-friendly errors with suggestions.

use anyhow::Result;
use capsule_cli::cli;
use capsule_cli::core::error::user_friendly_error;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute() {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
