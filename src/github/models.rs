//! Wire types for the GitHub releases API.
//!
//! Only the fields the pipeline actually consumes are deserialized; unknown
//! fields in API responses are ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

use crate::core::RelpackError;

/// A release as returned by the `releases` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Numeric release id used for asset uploads.
    pub id: u64,
    /// The git tag the release points at.
    pub tag_name: String,
    /// Human-readable release title, often absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Markdown body of the release notes.
    #[serde(default)]
    pub body: Option<String>,
    /// Browser URL of the release page.
    pub html_url: String,
    /// Creation timestamp, used to pick the freshest prerelease.
    pub created_at: DateTime<Utc>,
    /// Whether the release is marked as a prerelease.
    #[serde(default)]
    pub prerelease: bool,
    /// Downloadable assets attached to the release.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A binary asset attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    /// Numeric asset id used for the octet-stream download endpoint.
    pub id: u64,
    /// File name as uploaded.
    pub name: String,
    /// MIME type recorded at upload time.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Direct download URL.
    pub browser_download_url: String,
}

/// An `owner/name` repository reference.
///
/// Parses from either the bare slug form (`BepInEx/BepInEx`) or a full
/// `https://github.com/owner/name` URL. Comparison helpers ignore ASCII case
/// because GitHub slugs are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct RepoRef {
    /// Account or organization name.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Parses a repository reference from a slug or a github.com URL.
    ///
    /// # Errors
    ///
    /// Returns [`RelpackError::ManifestValidationError`] when the input has no
    /// recognizable `owner/name` shape.
    pub fn parse(input: &str) -> Result<Self, RelpackError> {
        let trimmed = input.trim().trim_end_matches('/');

        let path = match trimmed.split_once("github.com/") {
            Some((_, rest)) => rest,
            None => trimmed,
        };

        let mut segments = path.split('/');
        let owner = segments.next().unwrap_or_default();
        let name = segments.next().unwrap_or_default();

        if owner.is_empty() || name.is_empty() {
            return Err(RelpackError::ManifestValidationError {
                reason: format!("'{input}' is not an owner/name repository reference"),
            });
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// The `owner/name` slug form.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Case-insensitive equality, matching how GitHub treats slugs.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.name.eq_ignore_ascii_case(&other.name)
    }

    /// Extracts the repository and tag from a release page URL.
    ///
    /// Release URLs have the shape
    /// `https://github.com/<owner>/<name>/releases/tag/<tag>`. Returns `None`
    /// for anything else, so callers can skip unrecognized recorded entries.
    #[must_use]
    pub fn from_release_url(url: &str) -> Option<(Self, String)> {
        let (_, path) = url.split_once("github.com/")?;
        let mut segments = path.split('/');

        let owner = segments.next()?;
        let name = segments.next()?;
        if segments.next()? != "releases" || segments.next()? != "tag" {
            return None;
        }
        let tag = segments.next()?;
        if owner.is_empty() || name.is_empty() || tag.is_empty() {
            return None;
        }

        Some((
            Self {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            tag.to_string(),
        ))
    }
}

impl TryFrom<String> for RepoRef {
    type Error = RelpackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::str::FromStr for RepoRef {
    type Err = RelpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
