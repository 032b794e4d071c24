//! Content-addressed archives of a directory
//!
//! - `ArchiveBuilder` walks and packages a directory
//! - `IgnoreRules` decides which paths are left out
//! - `ContentHash` identifies the serialized bytes

mod builder;
mod hash;
mod ignore_rules;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

pub use builder::ArchiveBuilder;
pub use hash::ContentHash;
pub use ignore_rules::{IgnoreError, IgnoreRules, BUILTIN_PATTERNS, DEFAULT_IGNORE_FILE};

/// File extension of the serialized archive
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// An immutable archive of a directory.
///
/// Superseded by later builds, never modified.
#[derive(Debug)]
pub struct Archive {
    hash: ContentHash,
    bytes: Vec<u8>,
    source_dir: PathBuf,
    file_count: usize,
    built_at: DateTime<Utc>,
}

impl Archive {
    pub(crate) fn new(hash: ContentHash, bytes: Vec<u8>, source_dir: &Path, file_count: usize) -> Self {
        Self {
            hash,
            bytes,
            source_dir: source_dir.to_path_buf(),
            file_count,
            built_at: Utc::now(),
        }
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Number of files packaged
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// When the build finished (not part of the hashed bytes)
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// File name advertised to HTTP clients
    pub fn file_name(&self) -> String {
        format!("repo-{}.{}", self.hash, ARCHIVE_EXTENSION)
    }
}
