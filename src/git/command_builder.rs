//! Type-safe Git command builder for consistent command execution
//!
//! This module provides a fluent API for building and executing Git commands,
//! eliminating duplication and ensuring consistent error handling across the
//! commit-and-push portion of the pipeline.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::RelpackError;

/// Platform-appropriate name of the git executable.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if cfg!(windows) { "git.exe" } else { "git" }
}

/// Builder for constructing and executing Git commands.
///
/// Commands run with a configurable working directory (passed to git via the
/// `-C` flag so execution is independent of the process directory), a default
/// five-minute timeout, and captured output that is surfaced through
/// [`RelpackError::GitCommandError`] on failure.
///
/// # Examples
///
/// ```rust,ignore
/// use relpack::git::GitCommand;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let status = GitCommand::status_porcelain()
///     .current_dir(Path::new("/path/to/repo"))
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GitCommand {
    /// Command arguments to pass to git (e.g., ["commit", "-m", "msg"]).
    args: Vec<String>,

    /// Working directory for command execution.
    current_dir: Option<std::path::PathBuf>,

    /// Maximum duration to wait for command completion (None = no timeout).
    timeout_duration: Option<Duration>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Default timeout of 5 minutes covers even slow pushes
            timeout_duration: Some(Duration::from_secs(300)),
        }
    }
}

impl GitCommand {
    /// Creates a new Git command builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory for Git command execution.
    ///
    /// The directory is passed with `-C`, so git resolves the repository
    /// independent of the process working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds a single argument to the Git command.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments to the Git command.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a custom timeout for the command (None for no timeout).
    #[must_use]
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Execute the command and return the output.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let mut cmd = Command::new(git_command);

        // Build the full arguments list including -C flag if needed
        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());

        cmd.args(&full_args);

        tracing::debug!(
            target: "git",
            "Executing command: {} {}",
            git_command,
            full_args.join(" ")
        );

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output_future = cmd.output();

        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.context(format!("Failed to execute git {}", full_args.join(" ")))?
            } else {
                tracing::warn!(
                    target: "git",
                    "Command timed out after {} seconds: git {}",
                    duration.as_secs(),
                    full_args.join(" ")
                );
                return Err(RelpackError::GitCommandError {
                    operation: Self::operation_name(&full_args),
                    stderr: format!(
                        "Git command timed out after {} seconds. This may indicate:\n\
                        - Network connectivity issues\n\
                        - Authentication prompts waiting for input\n\
                        Try running the command manually: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    ),
                }
                .into());
            }
        } else {
            output_future
                .await
                .context(format!("Failed to execute git {}", full_args.join(" ")))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);

            tracing::debug!(
                target: "git",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "git", "Error: {}", stderr);
            }

            return Err(RelpackError::GitCommandError {
                operation: Self::operation_name(&full_args),
                stderr: if stderr.is_empty() {
                    stdout.to_string()
                } else {
                    stderr.to_string()
                },
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.is_empty() {
            tracing::debug!(target: "git", "{}", stdout.trim());
        }
        if !stderr.is_empty() {
            tracing::debug!(target: "git", "{}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::debug!(
                target: "git",
                "Git {} took {:.2}s",
                Self::operation_name(&full_args),
                elapsed.as_secs_f64()
            );
        }

        Ok(GitCommandOutput { stdout, stderr })
    }

    /// Execute the command and return only stdout as a trimmed string.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and check for success without inspecting output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    /// The git subcommand name, skipping a leading `-C <dir>` pair.
    fn operation_name(full_args: &[String]) -> String {
        let args_start = if full_args.first().is_some_and(|a| a == "-C") && full_args.len() > 2 {
            2
        } else {
            0
        };
        full_args
            .get(args_start)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Output from a Git command.
pub struct GitCommandOutput {
    /// Standard output from the Git command.
    pub stdout: String,
    /// Standard error output from the Git command.
    pub stderr: String,
}

// Convenience builders for the operations the pipeline performs

impl GitCommand {
    /// Create a version probe command.
    pub fn version() -> Self {
        Self::new().arg("--version")
    }

    /// Create a machine-readable status command.
    pub fn status_porcelain() -> Self {
        Self::new().args(["status", "--porcelain"])
    }

    /// Create a config command setting a repository-local key.
    pub fn config(key: &str, value: &str) -> Self {
        Self::new().args(["config", key, value])
    }

    /// Create an add command.
    pub fn add(pathspec: &str) -> Self {
        Self::new().args(["add", pathspec])
    }

    /// Create a commit command.
    pub fn commit(message: &str) -> Self {
        Self::new().args(["commit", "-m", message])
    }

    /// Create a command to get the current commit hash.
    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }

    /// Create a push command.
    pub fn push() -> Self {
        Self::new().arg("push")
    }
}
