//! The committed metadata record that makes runs idempotent.
//!
//! Every successful publish writes `.metadata.json` into the repository with
//! the upstream dependency version, the payload version, and the release page
//! URLs of every bundled source. The next run reconstructs the previously
//! published compound version from this record and skips when nothing newer
//! is available.
//!
//! A repository that has never published carries no metadata file; loading
//! then yields the initial record whose dependency field is the literal
//! string `"0"`, which compares older than every real version. A record that
//! fails to parse degrades to the same initial state so a corrupted file
//! causes a harmless rebuild instead of an abort.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::fs::atomic_write_string;
use crate::version::{self, Recorded};

/// File name of the metadata record, committed at the repository root.
pub const METADATA_FILE: &str = ".metadata.json";

/// Versions and provenance recorded by the last successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Normalized upstream loader version, or `"0"` before the first publish.
    #[serde(default = "initial_dependency")]
    pub dependency: String,
    /// Payload version bundled by the last publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Release page URLs of the loader and every bundled source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

fn initial_dependency() -> String {
    "0".to_string()
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            dependency: initial_dependency(),
            payload: None,
            sources: None,
        }
    }
}

impl Metadata {
    /// Loads the record from `path`, degrading to the initial record when the
    /// file is absent or unreadable.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("no metadata at {}, starting from the initial record", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    "metadata at {} is not valid JSON ({e}); treating as first run",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Atomically writes the record to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = serde_json::to_string(self).context("Failed to serialize metadata")?;
        atomic_write_string(path, &rendered)
            .with_context(|| format!("Failed to write metadata to {}", path.display()))
    }

    /// Reconstructs the compound version published by the recording run.
    ///
    /// Returns [`Recorded::Initial`] for the `"0"` sentinel or when the fields
    /// no longer combine into a version. A record with a dependency but no
    /// payload falls back to the dependency version alone.
    #[must_use]
    pub fn recorded_compound(&self) -> Recorded {
        let dependency = match Recorded::parse(&self.dependency) {
            Recorded::Initial => return Recorded::Initial,
            Recorded::Version(v) => v,
        };

        match self.recorded_payload() {
            Some(payload) => match version::compound(&dependency, &payload) {
                Ok(compound) => Recorded::Version(compound),
                Err(_) => Recorded::Initial,
            },
            None => Recorded::Version(dependency),
        }
    }

    /// The recorded payload version, if one parses.
    #[must_use]
    pub fn recorded_payload(&self) -> Option<semver::Version> {
        let raw = self.payload.as_deref()?;
        version::normalize(raw).ok()
    }
}
