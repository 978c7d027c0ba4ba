//! Version handling for release tags and compound bundle versions.
//!
//! Upstream release tags rarely arrive as clean semantic versions. This module
//! normalizes tags like `v5.4.23`, `release-1.2`, or `Loader_3.1.0.4` into
//! [`semver::Version`] values, compares candidates against the previously
//! recorded version, and derives the compound version that couples an upstream
//! release to the local payload revision.
//!
//! Normalization is idempotent: feeding a normalized version's string form back
//! through [`normalize`] yields the same version. The pipeline relies on this
//! when it reconstructs recorded versions from metadata written by earlier runs.

use std::fmt;

use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};

use crate::core::RelpackError;

/// Identifier prepended to the payload portion of a compound version.
///
/// A compound version renders as `<upstream>-payload.<payload>`, which is
/// itself a valid semantic version whose prerelease segment carries the
/// payload revision.
pub const PAYLOAD_TAG: &str = "payload";

/// Whether prerelease upstream versions are eligible for bundling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrereleaseMode {
    /// Prerelease tags are treated like any other release.
    #[default]
    Include,
    /// Prerelease tags never trigger a new bundle.
    Exclude,
}

/// The version recorded by a previous run, or the initial sentinel.
///
/// Metadata from a repository that has never published a bundle records the
/// literal string `"0"`. That sentinel (and any recorded value that no longer
/// parses) compares older than every real version, so the first run always
/// proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// No prior bundle exists.
    Initial,
    /// A concrete version recorded by an earlier run.
    Version(Version),
}

impl Recorded {
    /// Parses a recorded version string, falling back to [`Recorded::Initial`]
    /// for the `"0"` sentinel or any value that cannot be normalized.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "0" {
            return Self::Initial;
        }
        match normalize(trimmed) {
            Ok(version) => Self::Version(version),
            Err(_) => Self::Initial,
        }
    }
}

impl fmt::Display for Recorded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "none"),
            Self::Version(v) => write!(f, "{v}"),
        }
    }
}

/// Normalizes a release tag into a semantic version.
///
/// Parsing happens in three steps:
///
/// 1. Leading non-digit characters are stripped, which removes prefixes like
///    `v`, `release-`, or `Loader_`.
/// 2. The remainder is parsed strictly as a semantic version.
/// 3. If strict parsing fails, a loose `major[.minor[.patch]]` shape is
///    extracted and missing components default to zero. Trailing residue such
///    as a fourth numeric component is discarded.
///
/// # Examples
///
/// ```
/// use relpack::version::normalize;
///
/// assert_eq!(normalize("v5.4.23").unwrap().to_string(), "5.4.23");
/// assert_eq!(normalize("release-1.2").unwrap().to_string(), "1.2.0");
/// assert_eq!(normalize("3.1.0.4").unwrap().to_string(), "3.1.0");
/// assert!(normalize("latest").is_err());
/// ```
///
/// # Errors
///
/// Returns [`RelpackError::Unversionable`] when no version shape can be
/// extracted from the tag.
pub fn normalize(tag: &str) -> Result<Version, RelpackError> {
    let trimmed = tag.trim();
    let start = trimmed
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| RelpackError::Unversionable {
            tag: tag.to_string(),
        })?;
    let candidate = &trimmed[start..];

    if let Ok(version) = Version::parse(candidate) {
        return Ok(version);
    }

    coerce(candidate).ok_or_else(|| RelpackError::Unversionable {
        tag: tag.to_string(),
    })
}

/// Extracts a loose `major[.minor[.patch]]` prefix from a string that failed
/// strict parsing. Components that overflow `u64` make the tag unusable.
fn coerce(candidate: &str) -> Option<Version> {
    let shape = Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?").ok()?;
    let captures = shape.captures(candidate)?;

    let component = |idx: usize| -> Option<u64> {
        match captures.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    Some(Version::new(component(1)?, component(2)?, component(3)?))
}

/// Returns `true` when `candidate` should replace the recorded version.
///
/// Comparison follows semantic version precedence, so build metadata is
/// ignored. With [`PrereleaseMode::Exclude`], a prerelease candidate is never
/// considered newer regardless of the recorded value.
pub fn is_newer(candidate: &Version, recorded: &Recorded, mode: PrereleaseMode) -> bool {
    if mode == PrereleaseMode::Exclude && !candidate.pre.is_empty() {
        return false;
    }
    match recorded {
        Recorded::Initial => true,
        Recorded::Version(previous) => candidate.cmp_precedence(previous).is_gt(),
    }
}

/// Derives the compound version for an upstream release and a payload version.
///
/// The result renders as `<upstream>-payload.<payload>` and parses back as a
/// valid semantic version. Build metadata on either input is stripped first so
/// the compound stays deterministic.
///
/// Because the payload revision lives in the prerelease segment, two compounds
/// sharing an upstream core order by payload version, while a higher upstream
/// core always wins regardless of payload.
///
/// # Errors
///
/// Returns [`RelpackError::SemverError`] if the rendered compound does not
/// parse, which only happens for inputs with exotic prerelease segments.
pub fn compound(upstream: &Version, payload: &Version) -> Result<Version, RelpackError> {
    let mut core = upstream.clone();
    core.build = BuildMetadata::EMPTY;
    let mut revision = payload.clone();
    revision.build = BuildMetadata::EMPTY;

    let rendered = format!("{core}-{PAYLOAD_TAG}.{revision}");
    Ok(Version::parse(&rendered)?)
}

/// Returns a copy of `version` with the patch component incremented and any
/// prerelease or build metadata cleared.
pub fn bump_patch(version: &Version) -> Version {
    let mut bumped = version.clone();
    bumped.patch += 1;
    bumped.pre = Prerelease::EMPTY;
    bumped.build = BuildMetadata::EMPTY;
    bumped
}
