//! Configuration file persistence
//!
//! Writes go through a temp file in the target's directory followed by a
//! rename, so readers never observe a half-written file. Unchanged content
//! is never rewritten.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use similar::TextDiff;
use tempfile::NamedTempFile;

use crate::error::{RelayError, RelayResult};

/// Outcome of [`write_if_changed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Unchanged,
    /// The file was replaced; carries a unified diff of the change
    Written { diff: String },
}

/// Read a configuration file.
pub fn read_config(path: &Path) -> RelayResult<String> {
    fs::read_to_string(path).map_err(|source| RelayError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replace `path` with `content` unless it already holds it.
pub fn write_if_changed(path: &Path, content: &str) -> RelayResult<WriteOutcome> {
    let current = match fs::read_to_string(path) {
        Ok(current) => current,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(RelayError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if current == content {
        return Ok(WriteOutcome::Unchanged);
    }

    atomic_write(path, content.as_bytes()).map_err(|source| RelayError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(WriteOutcome::Written {
        diff: unified_diff(&path.display().to_string(), &current, content),
    })
}

/// `path` relative to `root` when it lies inside it, comparing resolved
/// paths so `.` segments and symlinked parents do not hide the relation.
pub fn relative_within(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = fs::canonicalize(root).ok()?;
    let path = fs::canonicalize(path).ok()?;
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    // Keep the original permissions.
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn unified_diff(path: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string()
}
