//! Deterministic directory archiver

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::{Compression, GzBuilder};
use ignore::WalkBuilder;
use tracing::debug;

use crate::error::{RelayError, RelayResult};

use super::hash::ContentHash;
use super::ignore_rules::{IgnoreRules, DEFAULT_IGNORE_FILE};
use super::Archive;

/// Mode recorded for every archived file
const ENTRY_MODE: u32 = 0o644;

/// Packages a directory into a gzip-compressed tar.
///
/// Entry headers are normalised and entries are visited in sorted pre-order,
/// so the output depends only on relative paths and file contents.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    ignore_file: String,
    excluded: Vec<PathBuf>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_FILE)
    }
}

impl ArchiveBuilder {
    /// Create a builder that reads ignore rules from `ignore_file` in the root.
    pub fn new(ignore_file: impl Into<String>) -> Self {
        Self {
            ignore_file: ignore_file.into(),
            excluded: Vec::new(),
        }
    }

    /// Leave `rel_path` (relative to the archived root) out of every build,
    /// whatever the ignore rules say.
    pub fn excluding(mut self, rel_path: impl Into<PathBuf>) -> Self {
        self.excluded.push(rel_path.into());
        self
    }

    /// Build an archive of `root`.
    ///
    /// Any traversal or read error aborts the whole build.
    pub fn build(&self, root: &Path) -> RelayResult<Archive> {
        let rules = IgnoreRules::load(root, &self.ignore_file)?;
        let files = collect_files(root, rules, &self.excluded)?;

        let encoder = GzBuilder::new().write(Vec::new(), Compression::default());
        let mut tar = tar::Builder::new(encoder);

        for (abs, rel) in &files {
            let data = fs::read(abs).map_err(|source| RelayError::ArchiveEntry {
                path: abs.clone(),
                source,
            })?;

            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(ENTRY_MODE);
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);

            tar.append_data(&mut header, rel, data.as_slice())
                .map_err(|source| RelayError::ArchiveEntry {
                    path: abs.clone(),
                    source,
                })?;
        }

        let bytes = tar.into_inner()?.finish()?;
        let archive = Archive::new(ContentHash::from_bytes(&bytes), bytes, root, files.len());
        debug!(
            files = archive.file_count(),
            bytes = archive.len(),
            sha256 = %archive.hash(),
            "archived {}",
            root.display()
        );
        Ok(archive)
    }
}

/// Walk `root` in sorted pre-order, returning `(absolute, relative)` paths of
/// every regular file that survives the ignore rules.
fn collect_files(
    root: &Path,
    rules: IgnoreRules,
    excluded: &[PathBuf],
) -> RelayResult<Vec<(PathBuf, PathBuf)>> {
    let rules = Arc::new(rules);
    let excluded = excluded.to_vec();
    let filter_root = root.to_path_buf();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            match entry.path().strip_prefix(&filter_root) {
                Ok(rel) => !excluded.iter().any(|e| e == rel) && !rules.is_ignored(rel, is_dir),
                Err(_) => false,
            }
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| RelayError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;

        // Symlinks and directories are not archived themselves.
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| RelayError::Walk {
                path: entry.path().to_path_buf(),
                message: e.to_string(),
            })?
            .to_path_buf();
        files.push((entry.path().to_path_buf(), rel));
    }

    Ok(files)
}
