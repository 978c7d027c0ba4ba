//! Run configuration assembled from CLI flags and the environment.
//!
//! The environment is read exactly once, here, when a command constructs its
//! [`RunContext`]. Everything below the CLI receives explicit values, so the
//! pipeline never consults `std::env` and behaves identically under tests and
//! in CI.
//!
//! Recognized environment variables:
//!
//! - `CI` - truthy values switch on CI mode (commit, push, publish)
//! - `GITHUB_PERSONAL_ACCESS_TOKEN` - credential for API and upload calls
//! - `GITHUB_ACTOR` - login used for the commit identity
//! - `GITHUB_WORKSPACE` - checkout path marked safe for git operations

use std::path::{Path, PathBuf};

use crate::core::RelpackError;
use crate::metadata::METADATA_FILE;

/// Default directory for produced bundles, relative to the project root.
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Default payload directory, relative to the project root.
pub const DEFAULT_PAYLOAD_DIR: &str = "payload";

/// Everything a pipeline run needs to know about its surroundings.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Whether the run commits, pushes, and publishes.
    pub ci: bool,
    /// Personal access token, required in CI mode.
    pub token: Option<String>,
    /// Login of the acting user, when running under GitHub Actions.
    pub actor: Option<String>,
    /// Workspace checkout path under GitHub Actions.
    pub workspace: Option<String>,
    /// Directory containing the manifest; git operations run here.
    pub project_dir: PathBuf,
    /// Local tree embedded into every bundle.
    pub payload_dir: PathBuf,
    /// Output directory for produced archives.
    pub dist_dir: PathBuf,
    /// Location of the committed metadata record.
    pub metadata_path: PathBuf,
}

impl RunContext {
    /// Builds the context for a project directory, resolving relative payload
    /// and dist paths against it and folding in the process environment.
    #[must_use]
    pub fn for_project(
        project_dir: &Path,
        payload_dir: &Path,
        dist_dir: &Path,
        ci_flag: bool,
        token: Option<String>,
    ) -> Self {
        let ci = ci_flag || env_value("CI").is_some_and(|v| is_truthy(&v));

        Self {
            ci,
            token: token.filter(|t| !t.is_empty()),
            actor: env_value("GITHUB_ACTOR"),
            workspace: env_value("GITHUB_WORKSPACE"),
            project_dir: project_dir.to_path_buf(),
            payload_dir: resolve_dir(project_dir, payload_dir),
            dist_dir: resolve_dir(project_dir, dist_dir),
            metadata_path: project_dir.join(METADATA_FILE),
        }
    }

    /// The token, or [`RelpackError::MissingToken`] when absent.
    ///
    /// CI mode calls this before any network access so a misconfigured
    /// workflow fails fast instead of failing halfway through a publish.
    pub fn require_token(&self) -> Result<&str, RelpackError> {
        self.token.as_deref().ok_or(RelpackError::MissingToken)
    }

    /// Commit identity used for metadata commits.
    ///
    /// Uses the acting user's noreply address when an actor is known and a
    /// neutral `relpack` identity otherwise.
    #[must_use]
    pub fn git_identity(&self) -> (String, String) {
        let name = self.actor.clone().unwrap_or_else(|| "relpack".to_string());
        let email = format!("{name}@users.noreply.github.com");
        (name, email)
    }

    /// Path of the bundle archive for `bundle_name`.
    #[must_use]
    pub fn dist_path(&self, bundle_name: &str) -> PathBuf {
        self.dist_dir.join(format!("{bundle_name}.zip"))
    }
}

/// Reads an environment variable, treating empty values as unset.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// CI indicator semantics: any non-empty value except "0" and "false".
fn is_truthy(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    !normalized.is_empty() && normalized != "0" && normalized != "false"
}

/// Resolves a possibly-relative directory against the project root.
fn resolve_dir(project_dir: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        project_dir.join(dir)
    }
}
