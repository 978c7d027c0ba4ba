//! Check command: resolve versions without fetching or writing anything.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::{DEFAULT_DIST_DIR, DEFAULT_PAYLOAD_DIR, RunContext};
use crate::git::WorkingCopy;
use crate::github::GithubClient;
use crate::manifest::Manifest;
use crate::pipeline::Pipeline;

/// Resolve the latest releases and report whether a run would build or skip.
///
/// Performs the same release lookups as `bundle` but downloads nothing and
/// changes nothing on disk. Exits 0 for both outcomes; resolution failures
/// still exit 1.
#[derive(Args)]
pub struct CheckCommand {
    /// GitHub token used for API calls.
    ///
    /// Optional; raises the API rate limit when present.
    #[arg(long, env = "GITHUB_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl CheckCommand {
    /// Resolves the manifest location and runs the command.
    pub async fn execute_with_manifest_path(self, manifest_path: Option<PathBuf>) -> Result<()> {
        let manifest_path = super::resolve_manifest_path(manifest_path);
        self.execute_from_path(&manifest_path).await
    }

    /// Runs the resolve phase against an explicit manifest path.
    pub async fn execute_from_path(self, manifest_path: &Path) -> Result<()> {
        let manifest = Manifest::load(manifest_path)?;
        let project_dir = manifest
            .dir()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let ctx = RunContext::for_project(
            &project_dir,
            Path::new(DEFAULT_PAYLOAD_DIR),
            Path::new(DEFAULT_DIST_DIR),
            false,
            self.token,
        );

        let host = GithubClient::new(ctx.token.clone())?;
        let vcs = WorkingCopy::new(&ctx.project_dir);
        let pipeline = Pipeline::new(host, vcs, manifest, ctx);

        let resolution = pipeline.resolve().await?;
        if resolution.skip {
            println!("{} Nothing to do; a run would skip.", "✓".green());
        } else {
            println!(
                "{} A run would build {}",
                "→".cyan(),
                format!("v{}", resolution.candidate).bold()
            );
        }
        Ok(())
    }
}
