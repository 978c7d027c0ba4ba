//! Command-line interface for relpack
//!
//! This module defines the clap command structure and dispatches to the
//! subcommand implementations:
//!
//! - `bundle` - Resolve, fetch, and merge the bundle; in CI also commit the
//!   metadata record and publish a tagged release
//! - `check` - Resolve versions only and report whether a run would build
//!
//! # Global Options
//!
//! - `--manifest-path <path>` - Explicit path to `relpack.toml`
//! - `-v, --verbose` - Enable debug diagnostics
//! - `-q, --quiet` - Suppress diagnostics entirely
//!
//! Diagnostics go to stderr through `tracing`; progress lines and results are
//! printed to stdout, so piping stdout captures only the user-facing output.
//!
//! # Examples
//!
//! ```bash
//! relpack bundle                 # Build dist/<name>.zip locally
//! relpack bundle --ci            # Full CI run: commit, tag, publish
//! relpack check                  # Report would-build or would-skip
//! relpack --verbose bundle       # With debug diagnostics
//! ```

mod bundle;
mod check;

pub use bundle::BundleCommand;
pub use check::CheckCommand;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::manifest::MANIFEST_FILE;

/// Top-level command-line interface.
///
/// Global flags are available to every subcommand. `--verbose` and `--quiet`
/// are mutually exclusive; clap enforces that at parse time.
#[derive(Parser)]
#[command(
    name = "relpack",
    about = "Bundle an upstream plugin loader with a local payload and publish it",
    version,
    author,
    long_about = "relpack watches an upstream plugin loader's GitHub releases, merges its \
platform archives with additional source repositories, optional datasets, and a local payload \
tree, and publishes the result as a tagged release when running in CI."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging.
    ///
    /// Equivalent to `RUST_LOG=debug` when `RUST_LOG` is unset.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress diagnostic output.
    ///
    /// Progress lines and errors are still printed.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the manifest file (relpack.toml).
    ///
    /// Defaults to `relpack.toml` in the current directory.
    #[arg(long, global = true)]
    manifest_path: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Build the bundle; in CI, commit metadata and publish a release.
    Bundle(BundleCommand),

    /// Resolve versions and report whether a run would build or skip.
    Check(CheckCommand),
}

impl Cli {
    /// Installs the tracing subscriber and dispatches to the subcommand.
    ///
    /// # Errors
    ///
    /// Returns any error from the executed subcommand; the binary entry point
    /// renders it with [`crate::core::user_friendly_error`].
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Bundle(cmd) => cmd.execute_with_manifest_path(self.manifest_path).await,
            Commands::Check(cmd) => cmd.execute_with_manifest_path(self.manifest_path).await,
        }
    }

    /// Installs a `tracing_subscriber` writing to stderr.
    ///
    /// `RUST_LOG` takes precedence when set; otherwise `--verbose` selects
    /// `debug` and the default is `info`. `--quiet` skips installation
    /// entirely, silencing all diagnostics.
    fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if self.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Resolves the manifest location: the explicit flag, or `relpack.toml` in
/// the current directory.
fn resolve_manifest_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(MANIFEST_FILE))
}
