//! Error handling for relpack
//!
//! This module provides the error types and user-friendly error reporting for
//! the bundling pipeline. The error system is designed around two core
//! principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`RelpackError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Release lookup**: [`RelpackError::ReleaseNotFound`], [`RelpackError::ApiError`]
//! - **Asset retrieval**: [`RelpackError::AssetNotFound`], [`RelpackError::TransportError`],
//!   [`RelpackError::MalformedResponse`], [`RelpackError::PartialFetchFailure`],
//!   [`RelpackError::TotalFetchFailure`], [`RelpackError::DatasetUnavailable`]
//! - **Versioning**: [`RelpackError::Unversionable`]
//! - **Configuration**: [`RelpackError::ManifestNotFound`], [`RelpackError::ManifestParseError`],
//!   [`RelpackError::ManifestValidationError`], [`RelpackError::MissingToken`]
//! - **Publishing**: [`RelpackError::MetadataUnchanged`], [`RelpackError::GitCommandError`],
//!   [`RelpackError::GitNotFound`]
//! - **Archives and files**: [`RelpackError::ArchiveError`], [`RelpackError::FileSystemError`]
//!
//! The deliberate skip path ("no updates since last check") is *not* an error;
//! the pipeline reports it as a normal terminal state with exit code 0.
//!
//! # Error Conversion and Context
//!
//! Common library errors convert automatically:
//! - [`std::io::Error`] → [`RelpackError::IoError`]
//! - [`toml::de::Error`] → [`RelpackError::TomlError`]
//! - [`semver::Error`] → [`RelpackError::SemverError`]
//! - [`zip::result::ZipError`] → [`RelpackError::ZipError`]
//!
//! Use [`user_friendly_error`] to convert any error into a displayable format
//! with contextual suggestions.
//!
//! # Examples
//!
//! ```rust,no_run
//! use relpack::core::{RelpackError, user_friendly_error};
//!
//! fn resolve() -> Result<(), RelpackError> {
//!     Err(RelpackError::ReleaseNotFound { repo: "owner/proj".to_string() })
//! }
//!
//! if let Err(e) = resolve() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display(); // Shows colored error with suggestions
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for relpack operations
///
/// Each variant represents a specific failure mode of the bundling pipeline
/// and carries enough context (repo slugs, HTTP statuses, asset names) to
/// diagnose the failure from a CI log without retrying.
#[derive(Error, Debug)]
pub enum RelpackError {
    /// No release exists for the repository
    ///
    /// Reported when the latest-release lookup returns 404 and, for source
    /// repositories, the prerelease fallback also finds nothing.
    #[error("No releases were found for repo: {repo}")]
    ReleaseNotFound {
        /// The `owner/name` slug that has no releases
        repo: String,
    },

    /// The forge API answered with a non-404 failure status
    #[error("GitHub API request failed with status {status}: {message}")]
    ApiError {
        /// HTTP status code returned by the API
        status: u16,
        /// Message or body excerpt accompanying the failure
        message: String,
    },

    /// A network-level failure occurred before any HTTP status was received
    #[error("Network error during {operation}")]
    TransportError {
        /// The fetch operation that failed (e.g., "download asset Foo.zip")
        operation: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// The response body was not in the expected binary form
    #[error("Invalid data for asset {name}")]
    MalformedResponse {
        /// Name of the asset whose body could not be interpreted
        name: String,
    },

    /// No asset on the release matched the platform/variant selector
    #[error("No matching asset for platform '{platform}' in repo: {repo}")]
    AssetNotFound {
        /// The `owner/name` slug whose release was searched
        repo: String,
        /// The platform key that failed to match
        platform: String,
    },

    /// A tag string yields no extractable numeric version
    #[error("Cannot derive a version from tag '{tag}'")]
    Unversionable {
        /// The tag string that could not be normalized
        tag: String,
    },

    /// One or more, but not all, required downloads failed
    ///
    /// Partial bundles are never published; this aborts the run after all
    /// concurrent fetches have settled.
    #[error("{failed} of {total} required archives could not be retrieved")]
    PartialFetchFailure {
        /// Number of failed downloads
        failed: usize,
        /// Total number of required downloads
        total: usize,
    },

    /// Every required download failed
    #[error("No valid assets were found in repo: {repo}")]
    TotalFetchFailure {
        /// The loader repository whose assets were requested
        repo: String,
    },

    /// A supplementary dataset URL did not return an archive
    #[error("Could not retrieve dataset from URL: {url}")]
    DatasetUnavailable {
        /// The direct-download URL that failed
        url: String,
        /// HTTP status when the server answered, absent on transport failure
        status: Option<u16>,
    },

    /// The run reached the commit step without modifying the metadata file
    ///
    /// Signals a logic inconsistency upstream; the run halts before any git
    /// or release mutation.
    #[error("Metadata unchanged after build; refusing to commit")]
    MetadataUnchanged,

    /// CI mode requires a credential token before any network call
    #[error("GITHUB_PERSONAL_ACCESS_TOKEN is not set")]
    MissingToken,

    /// Manifest file not found
    #[error("Manifest file not found: {path}")]
    ManifestNotFound {
        /// The path that was checked
        path: String,
    },

    /// Manifest parsing error
    #[error("Invalid manifest file syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Manifest validation error
    #[error("Manifest validation failed: {reason}")]
    ManifestValidationError {
        /// Reason why manifest validation failed
        reason: String,
    },

    /// Git executable not found in PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// Git operation failed during execution
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "commit", "push")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Zip archive could not be read or written
    #[error("Archive error: {context}")]
    ArchiveError {
        /// What was being done to the archive when it failed
        context: String,
    },

    /// File system error
    #[error("File system error: {operation}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the file system error occurred
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Semver parsing error
    #[error("Semver parsing error: {0}")]
    SemverError(#[from] semver::Error),

    /// Zip format error
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for RelpackError {
    fn clone(&self) -> Self {
        match self {
            Self::ReleaseNotFound {
                repo,
            } => Self::ReleaseNotFound {
                repo: repo.clone(),
            },
            Self::ApiError {
                status,
                message,
            } => Self::ApiError {
                status: *status,
                message: message.clone(),
            },
            Self::TransportError {
                operation,
                reason,
            } => Self::TransportError {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::MalformedResponse {
                name,
            } => Self::MalformedResponse {
                name: name.clone(),
            },
            Self::AssetNotFound {
                repo,
                platform,
            } => Self::AssetNotFound {
                repo: repo.clone(),
                platform: platform.clone(),
            },
            Self::Unversionable {
                tag,
            } => Self::Unversionable {
                tag: tag.clone(),
            },
            Self::PartialFetchFailure {
                failed,
                total,
            } => Self::PartialFetchFailure {
                failed: *failed,
                total: *total,
            },
            Self::TotalFetchFailure {
                repo,
            } => Self::TotalFetchFailure {
                repo: repo.clone(),
            },
            Self::DatasetUnavailable {
                url,
                status,
            } => Self::DatasetUnavailable {
                url: url.clone(),
                status: *status,
            },
            Self::MetadataUnchanged => Self::MetadataUnchanged,
            Self::MissingToken => Self::MissingToken,
            Self::ManifestNotFound {
                path,
            } => Self::ManifestNotFound {
                path: path.clone(),
            },
            Self::ManifestParseError {
                file,
                reason,
            } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ManifestValidationError {
                reason,
            } => Self::ManifestValidationError {
                reason: reason.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::ArchiveError {
                context,
            } => Self::ArchiveError {
                context: context.clone(),
            },
            Self::FileSystemError {
                operation,
                path,
            } => Self::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::SemverError(e) => Self::Other {
                message: format!("Semver parsing error: {e}"),
            },
            Self::ZipError(e) => Self::Other {
                message: format!("Zip error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`RelpackError`] and adds optional suggestions for
/// resolution and additional details. This is the primary way relpack presents
/// errors to CLI users.
///
/// # Display Format
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use relpack::core::{RelpackError, ErrorContext};
///
/// let context = ErrorContext::new(RelpackError::MissingToken)
///     .with_suggestion("Export GITHUB_PERSONAL_ACCESS_TOKEN before running in CI mode")
///     .with_details("Publishing a release requires an authenticated GitHub client");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying relpack error
    pub error: RelpackError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`RelpackError`]
    #[must_use]
    pub const fn new(error: RelpackError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    ///
    /// Suggestions should be actionable steps that users can take to resolve
    /// the error. They are displayed in green in the terminal.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    ///
    /// Details provide context about why the error occurred. They are
    /// displayed in yellow, less prominent than the error or suggestion.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// Error message in red and bold, details in yellow, suggestion in green.
    /// This is the primary way relpack presents errors in the CLI.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// This function is the main entry point for converting arbitrary errors into
/// user-friendly messages for CLI display. It recognizes [`RelpackError`]
/// variants, [`reqwest::Error`], [`std::io::Error`] and [`toml::de::Error`]
/// and provides appropriate context; anything else is rendered with its full
/// cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(relpack_error) = error.downcast_ref::<RelpackError>() {
        return create_error_context(relpack_error.clone());
    }

    if let Some(reqwest_error) = error.downcast_ref::<reqwest::Error>() {
        let operation = reqwest_error
            .url()
            .map_or_else(|| "HTTP request".to_string(), |u| format!("request to {u}"));
        return ErrorContext::new(RelpackError::TransportError {
            operation,
            reason: reqwest_error.to_string(),
        })
        .with_suggestion("Check your internet connection and that github.com is reachable")
        .with_details("The request failed before a response was received; nothing was retried");
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(RelpackError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion(
                    "Check file ownership, or run with elevated permissions if appropriate",
                )
                .with_details(
                    "relpack needs write access to the working directory for dist/ and metadata",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(RelpackError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details(
                    "This error occurs when a required file or directory cannot be found",
                );
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(RelpackError::ManifestParseError {
            file: "relpack.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion(
            "Check the TOML syntax in your relpack.toml file. Verify quotes, brackets, and table headers",
        )
        .with_details(
            "TOML parsing errors are usually caused by syntax issues like missing quotes or mismatched brackets",
        );
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();

    let chain: Vec<String> = error
        .chain()
        .skip(1) // Skip the root cause which is already in to_string()
        .map(std::string::ToString::to_string)
        .collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(RelpackError::Other {
        message,
    })
}

/// Create appropriate [`ErrorContext`] with suggestions for specific errors
///
/// Maps each [`RelpackError`] variant to tailored suggestions and details.
/// Used by [`user_friendly_error`] so that every CLI failure comes with a
/// next step rather than a bare message.
fn create_error_context(error: RelpackError) -> ErrorContext {
    match &error {
        RelpackError::ReleaseNotFound { repo } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Verify that https://github.com/{repo} exists and has at least one release (prereleases count)"
            ))
            .with_details("relpack resolves the latest release, falling back to the most recently created prerelease"),

        RelpackError::ApiError { status, .. } => ErrorContext::new(error.clone())
            .with_suggestion(match status {
                401 | 403 => "Check that GITHUB_PERSONAL_ACCESS_TOKEN is valid and has not expired. Unauthenticated requests are heavily rate-limited",
                _ => "Check https://www.githubstatus.com/ and retry the workflow once the API recovers",
            })
            .with_details("The GitHub API answered with a failure status; relpack does not retry"),

        RelpackError::TransportError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check your internet connection and that github.com is reachable from the runner")
            .with_details("The request failed at the network level before any response arrived"),

        RelpackError::AssetNotFound { repo, platform } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "List the assets on the latest release of {repo} and check the '{platform}' platform key against their names"
            ))
            .with_details("Asset matching is a case-insensitive substring test against the asset name"),

        RelpackError::Unversionable { tag } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Tags must contain a dotted numeric sequence; '{tag}' has none. Check the upstream repository's tagging scheme"
            ))
            .with_details("Normalization strips a leading prefix, then parses strictly, then coerces the first numeric run"),

        RelpackError::PartialFetchFailure { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Re-run the workflow; a partial bundle is never published, so nothing was tagged or released")
            .with_details("Each failed download is logged above with its asset name and HTTP status"),

        RelpackError::TotalFetchFailure { repo } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check the asset names on the latest release of {repo}; none matched the configured platforms"
            ))
            .with_details("Every requested download failed, which usually means the release layout changed"),

        RelpackError::DatasetUnavailable { url, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check that {url} is still published, or mark the dataset optional to skip it on failure"
            ))
            .with_details("Required datasets abort the run; optional ones are logged and omitted"),

        RelpackError::MetadataUnchanged => ErrorContext::new(error.clone())
            .with_suggestion("This usually means the skip decision and the build disagree; inspect .metadata.json against the resolved versions")
            .with_details("The commit step verifies via git status that the metadata file actually changed before mutating the repository"),

        RelpackError::MissingToken => ErrorContext::new(error.clone())
            .with_suggestion("Export GITHUB_PERSONAL_ACCESS_TOKEN in the workflow environment (a fine-grained token with contents:write works)")
            .with_details("CI mode commits metadata and publishes a release, which requires an authenticated client"),

        RelpackError::ManifestNotFound { path } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Create a relpack.toml at {path} with [bundle] and [loader] sections, or pass --manifest"
            ))
            .with_details("The manifest names the bundle, the loader repository, and the target platforms"),

        RelpackError::ManifestParseError { file, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check the TOML syntax in {file}. Common issues: missing quotes, unmatched brackets, invalid characters"
            ))
            .with_details("Use a TOML validator or compare against the documented manifest format"),

        RelpackError::GitNotFound => ErrorContext::new(error.clone())
            .with_suggestion("Install git from https://git-scm.com/ or your package manager (e.g., 'apt install git')")
            .with_details("CI mode commits and pushes metadata, which requires git in PATH"),

        RelpackError::GitCommandError { operation, .. } => ErrorContext::new(error.clone())
            .with_suggestion(match operation.as_str() {
                op if op.contains("push") => "Check that the workflow token has permission to push to the repository",
                op if op.contains("commit") => "Check the git identity configuration; relpack sets user.name and user.email before committing",
                _ => "Check your git configuration and repository state. Try running the git command manually for more details",
            })
            .with_details("Git output is captured above; the working copy is left as the failed command left it"),

        _ => ErrorContext::new(error.clone()),
    }
}
