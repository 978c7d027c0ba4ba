//! Manifest file parsing and validation for relpack projects.
//!
//! This module handles `relpack.toml`, the declarative description of a
//! bundle: what it is called, which upstream loader it tracks, which extra
//! source repositories and datasets it folds in, and how archive conflicts
//! resolve.
//!
//! # Manifest Format
//!
//! ```toml
//! [bundle]
//! name = "MyPack"
//! repo = "me/MyPack"
//! version = "1.1.0"
//!
//! [loader]
//! repo = "BepInEx/BepInEx"
//! platforms = ["win_x64", "unix"]
//! prefer_variant = "unitymono"   # optional
//! conflict_policy = "overwrite"  # optional: overwrite | skip
//! prereleases = "include"        # optional: include | exclude
//!
//! [[sources]]
//! repo = "owner/extras"
//! asset = "extras-bundle"        # optional name pattern
//!
//! [[datasets]]
//! url = "https://example.com/data.zip"
//! prefix = "data"
//! include = ["plugins"]          # optional top-level allowlist
//! optional = false               # optional
//! ```
//!
//! Repository references are validated during deserialization, so a manifest
//! that parses always carries well-formed `owner/name` slugs. Everything else
//! is checked by [`Manifest::validate`] at load time.
//!
//! When a source drift bumps the payload version in CI, the manifest is
//! rewritten through `toml_edit` so comments and formatting survive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::Deserialize;
use toml_edit::DocumentMut;

use crate::archive::ConflictPolicy;
use crate::core::RelpackError;
use crate::github::RepoRef;
use crate::utils::fs::atomic_write_string;
use crate::version::{self, PrereleaseMode};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "relpack.toml";

/// The parsed `relpack.toml` manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Identity of the bundle being produced.
    pub bundle: BundleSection,
    /// The upstream loader this bundle repackages.
    pub loader: LoaderSection,
    /// Additional release-hosted archives to merge in.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Direct-download archives embedded under a prefix.
    #[serde(default)]
    pub datasets: Vec<DatasetSpec>,

    /// Where the manifest was loaded from, used to resolve relative paths
    /// and to write version bumps back.
    #[serde(skip)]
    path: Option<PathBuf>,
}

/// The `[bundle]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSection {
    /// Bundle name; also the stem of the produced `dist/<name>.zip`.
    pub name: String,
    /// Repository the bundle is published to.
    pub repo: RepoRef,
    /// Payload version maintained by hand (or by drift auto-bumps).
    pub version: String,
}

/// The `[loader]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderSection {
    /// Upstream repository whose releases drive the pipeline.
    pub repo: RepoRef,
    /// Platform keys matched against asset names, one archive each.
    pub platforms: Vec<String>,
    /// Variant preferred when several assets match a platform.
    #[serde(default)]
    pub prefer_variant: Option<String>,
    /// How merge conflicts between archives resolve.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Whether upstream prereleases may trigger a bundle.
    #[serde(default)]
    pub prereleases: PrereleaseMode,
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    /// Repository whose latest release carries the archive.
    pub repo: RepoRef,
    /// Name pattern of the archive asset; defaults to `<repo name>.zip`.
    #[serde(default)]
    pub asset: Option<String>,
}

/// One `[[datasets]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSpec {
    /// Direct download URL of a zip archive.
    pub url: String,
    /// Directory prefix the archive is embedded under.
    pub prefix: String,
    /// Top-level entries to keep; empty keeps everything.
    #[serde(default)]
    pub include: Vec<String>,
    /// Whether a failed download is tolerated.
    #[serde(default)]
    pub optional: bool,
}

impl Manifest {
    /// Loads and validates a manifest from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RelpackError::ManifestNotFound`] when the file is absent,
    /// [`RelpackError::ManifestParseError`] for TOML syntax problems, and
    /// [`RelpackError::ManifestValidationError`] for semantic ones.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RelpackError::ManifestNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;

        let mut manifest: Self = toml::from_str(&content)
            .map_err(|e| RelpackError::ManifestParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
            .with_context(|| {
                format!(
                    "Invalid TOML syntax in manifest file: {}\n\n\
                    Common TOML syntax errors:\n\
                    - Missing quotes around strings\n\
                    - Unmatched brackets [ ] or braces {{ }}\n\
                    - Invalid characters in keys or values",
                    path.display()
                )
            })?;

        manifest.path = Some(path.to_path_buf());
        manifest.validate()?;

        Ok(manifest)
    }

    /// Parses manifest content without touching the file system.
    ///
    /// The resulting manifest has no backing path, so version bumps cannot be
    /// written back.
    pub fn from_str_validated(content: &str) -> Result<Self> {
        let manifest: Self =
            toml::from_str(content).map_err(|e| RelpackError::ManifestParseError {
                file: MANIFEST_FILE.to_string(),
                reason: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Semantic validation beyond what deserialization enforces.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| -> Result<()> {
            Err(RelpackError::ManifestValidationError { reason }.into())
        };

        if self.bundle.name.trim().is_empty() {
            return fail("bundle.name must not be empty".to_string());
        }
        if version::normalize(&self.bundle.version).is_err() {
            return fail(format!(
                "bundle.version '{}' is not a usable version",
                self.bundle.version
            ));
        }

        if self.loader.platforms.is_empty() {
            return fail("loader.platforms must list at least one platform key".to_string());
        }
        if self.loader.platforms.iter().any(|p| p.trim().is_empty()) {
            return fail("loader.platforms entries must not be empty".to_string());
        }

        for dataset in &self.datasets {
            if !dataset.url.starts_with("http://") && !dataset.url.starts_with("https://") {
                return fail(format!(
                    "dataset url '{}' must be an http(s) URL",
                    dataset.url
                ));
            }
            if dataset.prefix.is_empty()
                || dataset.prefix.starts_with('/')
                || dataset.prefix.ends_with('/')
            {
                return fail(format!(
                    "dataset prefix '{}' must be a non-empty path without leading or trailing '/'",
                    dataset.prefix
                ));
            }
        }

        Ok(())
    }

    /// The payload version declared in `[bundle]`.
    pub fn payload_version(&self) -> Result<Version> {
        Ok(version::normalize(&self.bundle.version)?)
    }

    /// Directory containing the manifest file.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// Path the manifest was loaded from.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rewrites `bundle.version` in place, preserving formatting and comments.
    ///
    /// # Errors
    ///
    /// Fails when the manifest was not loaded from a file or the file can no
    /// longer be parsed.
    pub fn write_payload_version(&self, new_version: &Version) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .context("Manifest has no backing file to write the version bump to")?;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;
        let mut doc: DocumentMut = content
            .parse()
            .with_context(|| format!("Failed to parse manifest file: {}", path.display()))?;

        doc["bundle"]["version"] = toml_edit::value(new_version.to_string());

        atomic_write_string(path, &doc.to_string())
            .with_context(|| format!("Failed to write manifest file: {}", path.display()))
    }
}
