//! In-memory zip merging for bundle assembly.
//!
//! A bundle is assembled by layering several zip archives and a local payload
//! tree into one [`MergedArchive`], then serializing the result once. Entries
//! live in a sorted map keyed by archive path, which makes merge order
//! explicit and the serialized output byte-for-byte reproducible: same inputs
//! in the same order, same zip.
//!
//! Directory entries are dropped during merging; only file entries survive
//! into the output.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::RelpackError;

/// How to resolve an entry path that already exists in the merged archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Later archives replace earlier entries at the same path.
    #[default]
    Overwrite,
    /// The first archive to claim a path keeps it.
    Skip,
}

/// Accumulates file entries from several archives and directory trees.
#[derive(Debug, Default)]
pub struct MergedArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MergedArchive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of file entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes of the entry at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Entry paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merges every file entry of a zip archive into the accumulator.
    ///
    /// Returns the number of entries written. With [`ConflictPolicy::Skip`],
    /// entries whose path already exists are not counted.
    pub fn merge_zip(&mut self, bytes: &[u8], policy: ConflictPolicy) -> Result<usize> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| RelpackError::ArchiveError {
                context: format!("failed to open archive: {e}"),
            })?;

        let mut written = 0;
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| RelpackError::ArchiveError {
                    context: format!("failed to read archive entry {index}: {e}"),
                })?;
            if file.is_dir() {
                continue;
            }

            let path = file.name().to_string();
            if policy == ConflictPolicy::Skip && self.entries.contains_key(&path) {
                continue;
            }

            let mut contents = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut contents)
                .map_err(|e| RelpackError::ArchiveError {
                    context: format!("failed to decompress {path}: {e}"),
                })?;
            self.entries.insert(path, contents);
            written += 1;
        }

        debug!("merged {written} entries from archive");
        Ok(written)
    }

    /// Merges a zip archive under `prefix`, keeping only entries whose
    /// top-level segment appears in `include`.
    ///
    /// An empty `include` list keeps everything. Matching is exact, so a
    /// root-level file must be listed by its own name to survive. Entries
    /// always overwrite, regardless of the bundle-wide conflict policy.
    pub fn merge_zip_filtered(
        &mut self,
        bytes: &[u8],
        prefix: &str,
        include: &[String],
    ) -> Result<usize> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| RelpackError::ArchiveError {
                context: format!("failed to open archive: {e}"),
            })?;

        let mut written = 0;
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| RelpackError::ArchiveError {
                    context: format!("failed to read archive entry {index}: {e}"),
                })?;
            if file.is_dir() {
                continue;
            }

            let path = file.name().to_string();
            let top_level = path.split('/').next().unwrap_or(&path);
            if !include.is_empty() && !include.iter().any(|allowed| allowed == top_level) {
                continue;
            }

            let mut contents = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut contents)
                .map_err(|e| RelpackError::ArchiveError {
                    context: format!("failed to decompress {path}: {e}"),
                })?;
            self.entries.insert(format!("{prefix}/{path}"), contents);
            written += 1;
        }

        debug!("merged {written} entries under prefix {prefix}");
        Ok(written)
    }

    /// Embeds a directory tree, overwriting any colliding entries.
    ///
    /// Files are inserted in sorted relative-path order with forward-slash
    /// separators. A missing directory contributes zero files and is not an
    /// error, so repositories without local payload still bundle cleanly.
    pub fn embed_tree(&mut self, root: &Path) -> Result<usize> {
        if !root.is_dir() {
            debug!("payload directory {} does not exist", root.display());
            return Ok(0);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry
                .with_context(|| format!("Failed to walk payload directory {}", root.display()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        let mut keyed: Vec<(String, std::path::PathBuf)> = files
            .into_iter()
            .filter_map(|path| relative_slash(root, &path).map(|rel| (rel, path)))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let count = keyed.len();
        for (rel, path) in keyed {
            let contents = std::fs::read(&path).map_err(|_| RelpackError::FileSystemError {
                operation: "read payload file".to_string(),
                path: path.display().to_string(),
            })?;
            self.entries.insert(rel, contents);
        }

        debug!("embedded {count} files from {}", root.display());
        Ok(count)
    }

    /// Serializes the merged entries into a deflate-compressed zip.
    ///
    /// Entries are written in sorted path order with a fixed modification
    /// timestamp, so identical contents always produce identical bytes.
    pub fn into_zip_bytes(self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644)
            .last_modified_time(zip::DateTime::default());

        for (path, contents) in &self.entries {
            writer
                .start_file(path.as_str(), options)
                .map_err(|e| RelpackError::ArchiveError {
                    context: format!("failed to start entry {path}: {e}"),
                })?;
            writer
                .write_all(contents)
                .map_err(|e| RelpackError::ArchiveError {
                    context: format!("failed to write entry {path}: {e}"),
                })?;
        }

        let cursor = writer.finish().map_err(|e| RelpackError::ArchiveError {
            context: format!("failed to finalize archive: {e}"),
        })?;
        Ok(cursor.into_inner())
    }
}

/// Relative path of `path` under `root`, joined with forward slashes.
fn relative_slash(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
