//! relpack CLI entry point
//!
//! Parses command-line arguments, executes the selected subcommand, and
//! renders failures through the user-friendly error reporting before exiting
//! with a non-zero status.

use anyhow::Result;
use clap::Parser;
use relpack::cli;
use relpack::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // Execute the command
    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Convert to user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
