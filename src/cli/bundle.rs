//! Bundle command: the full fetch, merge, and publish run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::{DEFAULT_DIST_DIR, DEFAULT_PAYLOAD_DIR, RunContext};
use crate::git::{WorkingCopy, ensure_git_available};
use crate::github::GithubClient;
use crate::manifest::Manifest;
use crate::pipeline::{Pipeline, RunOutcome};

/// Build the bundle, and in CI mode commit metadata and publish a release.
///
/// In local mode the run stops after writing `dist/<name>.zip`. CI mode
/// (enabled by the `--ci` flag or a truthy `CI` environment variable)
/// additionally requires a token, commits the updated metadata record, and
/// publishes the tagged release with the archive attached.
#[derive(Args)]
pub struct BundleCommand {
    /// Force CI mode: commit metadata and publish a release.
    ///
    /// CI mode is also enabled automatically when the `CI` environment
    /// variable carries a truthy value, as on GitHub Actions runners.
    #[arg(long)]
    ci: bool,

    /// Directory the merged archive is written to.
    ///
    /// Relative paths resolve against the manifest's directory.
    #[arg(long, default_value = DEFAULT_DIST_DIR)]
    dist_dir: PathBuf,

    /// Directory of local files embedded last into every bundle.
    ///
    /// Relative paths resolve against the manifest's directory. A missing
    /// directory contributes no files.
    #[arg(long, default_value = DEFAULT_PAYLOAD_DIR)]
    payload_dir: PathBuf,

    /// GitHub token used for API calls, uploads, and pushes.
    ///
    /// Required in CI mode; optional locally, where it only raises the API
    /// rate limit.
    #[arg(long, env = "GITHUB_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl BundleCommand {
    /// Resolves the manifest location and runs the command.
    pub async fn execute_with_manifest_path(self, manifest_path: Option<PathBuf>) -> Result<()> {
        let manifest_path = super::resolve_manifest_path(manifest_path);
        self.execute_from_path(&manifest_path).await
    }

    /// Runs the bundle pipeline against an explicit manifest path.
    pub async fn execute_from_path(self, manifest_path: &Path) -> Result<()> {
        let manifest = Manifest::load(manifest_path)?;
        let project_dir = manifest
            .dir()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let ctx = RunContext::for_project(
            &project_dir,
            &self.payload_dir,
            &self.dist_dir,
            self.ci,
            self.token,
        );

        if ctx.ci {
            ensure_git_available()?;
        }

        let host = GithubClient::new(ctx.token.clone())?;
        let vcs = WorkingCopy::new(&ctx.project_dir);
        let pipeline = Pipeline::new(host, vcs, manifest, ctx);

        match pipeline.run().await? {
            RunOutcome::Skipped => {}
            RunOutcome::DoneLocal => {
                println!("{} Bundle written to dist", "✓".green());
            }
            RunOutcome::DoneRemote => {
                println!("\n{}", "Update complete!".green().bold());
            }
        }
        Ok(())
    }
}
