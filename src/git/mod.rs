//! Git operations for the commit-and-push stage
//!
//! This module provides a safe, async wrapper around the system `git` command.
//! Like Cargo with `git-fetch-with-cli`, it shells out to the installed Git
//! binary rather than embedding a Git library, so pushes made from CI runners
//! work with whatever credential helpers and authentication the environment
//! already has configured.
//!
//! The [`Vcs`] trait abstracts the handful of operations the pipeline needs
//! (configure, stage, commit, push), with [`WorkingCopy`] as the production
//! implementation backed by [`GitCommand`]. Tests substitute their own
//! implementation to exercise the pipeline without touching a real repository.
//!
//! All commands run with an explicit working directory via `git -C`, captured
//! output, and a timeout, so a hung authentication prompt fails the run
//! instead of wedging it.

mod command_builder;

pub use command_builder::{GitCommand, GitCommandOutput, get_git_command};

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::RelpackError;

/// Verifies that the git binary is installed and reachable on PATH.
pub fn ensure_git_available() -> Result<(), RelpackError> {
    if which::which(get_git_command()).is_ok() {
        Ok(())
    } else {
        Err(RelpackError::GitNotFound)
    }
}

/// Version control operations the pipeline performs when publishing.
///
/// Methods follow the order of use: configure identity, inspect what changed,
/// stage, commit, push.
#[allow(async_fn_in_trait)]
pub trait Vcs {
    /// Sets repository-local configuration entries (key, value).
    async fn configure(&self, entries: &[(String, String)]) -> Result<()>;

    /// Returns the paths of modified and untracked files, relative to the
    /// repository root.
    async fn changed_paths(&self) -> Result<Vec<String>>;

    /// Stages the given paths.
    async fn add(&self, paths: &[String]) -> Result<()>;

    /// Commits staged changes and returns the new commit hash.
    async fn commit(&self, message: &str) -> Result<String>;

    /// Pushes the current branch to its upstream.
    async fn push(&self) -> Result<()>;
}

/// A checked-out repository on disk, driven through the system git binary.
pub struct WorkingCopy {
    root: PathBuf,
}

impl WorkingCopy {
    /// Creates a handle for the repository rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Vcs for WorkingCopy {
    async fn configure(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            GitCommand::config(key, value)
                .current_dir(&self.root)
                .execute_success()
                .await?;
        }
        Ok(())
    }

    async fn changed_paths(&self) -> Result<Vec<String>> {
        let output = GitCommand::status_porcelain()
            .current_dir(&self.root)
            .execute_stdout()
            .await?;
        Ok(parse_porcelain(&output))
    }

    async fn add(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            GitCommand::add(path)
                .current_dir(&self.root)
                .execute_success()
                .await?;
        }
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<String> {
        GitCommand::commit(message)
            .current_dir(&self.root)
            .execute_success()
            .await?;
        GitCommand::current_commit()
            .current_dir(&self.root)
            .execute_stdout()
            .await
    }

    async fn push(&self) -> Result<()> {
        GitCommand::push()
            .current_dir(&self.root)
            .execute_success()
            .await
    }
}

/// Extracts file paths from `git status --porcelain` output.
///
/// Each line is two status characters, a space, then the path. Renames carry
/// both names separated by `" -> "`, of which only the new name matters here.
fn parse_porcelain(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.get(3..))
        .filter(|path| !path.is_empty())
        .map(|path| match path.split_once(" -> ") {
            Some((_, renamed)) => renamed.to_string(),
            None => path.to_string(),
        })
        .collect()
}
