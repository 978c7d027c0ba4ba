//! File system helpers with atomic write guarantees.
//!
//! The pipeline writes bundle archives and metadata that CI later commits, so
//! partially written files are never acceptable. Everything here funnels
//! through [`atomic_write`], which stages content in a temp sibling and
//! renames it into place.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ensures a directory exists, creating parents as needed.
///
/// # Errors
///
/// Fails when the path exists but is not a directory, or when creation fails.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "Failed to create directory: {}\n\nCheck directory permissions and path validity",
                path.display()
            )
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!(
            "Path exists but is not a directory: {}",
            path.display()
        ));
    }
    Ok(())
}

/// Atomically writes bytes to a file.
///
/// Content goes to a `.tmp` sibling first, is synced to disk, and is then
/// renamed over the target. Readers observe either the old content or the new
/// content, never a partial write. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path).with_context(|| {
            format!(
                "Failed to create temp file: {}\n\nCheck file permissions and that directory exists",
                temp_path.display()
            )
        })?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all()
            .with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// String convenience wrapper around [`atomic_write`].
pub fn atomic_write_string(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Lists every file under `dir` in sorted path order.
///
/// A missing directory yields an empty list rather than an error, matching
/// how optional content directories behave throughout the pipeline.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry =
            entry.with_context(|| format!("Failed to walk directory {}", dir.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
