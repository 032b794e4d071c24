//! Ignore rules for archive builds
//!
//! Rules come from the archived directory's ignore file (gitignore syntax)
//! followed by built-in version-control patterns. Later rules win, so a
//! negation in the file can re-include something an earlier line excluded.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default name of the per-directory ignore file
pub const DEFAULT_IGNORE_FILE: &str = ".archiveignore";

/// Patterns that always apply, appended after the ignore file's rules
pub const BUILTIN_PATTERNS: &[&str] = &[".git", ".hg", ".svn", ".bzr", ".jj"];

/// Maximum ignore file size (64KB)
const MAX_FILE_SIZE: u64 = 65536;

/// Maximum number of patterns allowed
const MAX_PATTERNS: usize = 1000;

/// Ordered ignore rules for one archived directory.
#[derive(Debug)]
pub struct IgnoreRules {
    matcher: Gitignore,
    file_patterns: usize,
}

impl IgnoreRules {
    /// Load the ignore file in `root` (if any) and append the built-ins.
    pub fn load(root: &Path, file_name: &str) -> Result<Self, IgnoreError> {
        let ignore_path = root.join(file_name);

        let content = match fs::metadata(&ignore_path) {
            Ok(metadata) => {
                if metadata.len() > MAX_FILE_SIZE {
                    return Err(IgnoreError::FileTooLarge {
                        path: ignore_path,
                        size: metadata.len(),
                        limit: MAX_FILE_SIZE,
                    });
                }
                fs::read_to_string(&ignore_path).map_err(|source| IgnoreError::Io {
                    path: ignore_path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(IgnoreError::Io {
                    path: ignore_path,
                    source,
                })
            }
        };

        Self::from_content(root, &ignore_path, &content)
    }

    /// Parse rules from ignore file content.
    pub fn from_content(root: &Path, source_path: &Path, content: &str) -> Result<Self, IgnoreError> {
        let mut builder = GitignoreBuilder::new(root);
        let mut file_patterns = 0;

        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            file_patterns += 1;
            if file_patterns > MAX_PATTERNS {
                return Err(IgnoreError::TooManyPatterns {
                    path: source_path.to_path_buf(),
                    count: file_patterns,
                    limit: MAX_PATTERNS,
                });
            }

            builder
                .add_line(Some(source_path.to_path_buf()), line)
                .map_err(|e| IgnoreError::InvalidPattern {
                    path: source_path.to_path_buf(),
                    line: line_num + 1,
                    pattern: line.to_string(),
                    message: e.to_string(),
                })?;
        }

        for pattern in BUILTIN_PATTERNS {
            builder
                .add_line(None, pattern)
                .map_err(|e| IgnoreError::BuildFailed(e.to_string()))?;
        }

        let matcher = builder
            .build()
            .map_err(|e| IgnoreError::BuildFailed(e.to_string()))?;

        Ok(Self {
            matcher,
            file_patterns,
        })
    }

    /// Whether `rel_path` (relative to the root) is excluded.
    ///
    /// A path inside an excluded directory is excluded as well.
    pub fn is_ignored(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(rel_path, is_dir)
            .is_ignore()
    }

    /// Number of patterns read from the ignore file (built-ins excluded).
    pub fn file_pattern_count(&self) -> usize {
        self.file_patterns
    }
}

/// Errors that can occur when loading ignore rules.
#[derive(Debug, Error)]
pub enum IgnoreError {
    #[error("ignore file exceeds {}KB limit ({size} bytes): {path}", .limit / 1024)]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("ignore file has {count} patterns, exceeds {limit} limit: {path}")]
    TooManyPatterns {
        path: PathBuf,
        count: usize,
        limit: usize,
    },

    #[error("invalid pattern at {path}:{line}: '{pattern}' - {message}")]
    InvalidPattern {
        path: PathBuf,
        line: usize,
        pattern: String,
        message: String,
    },

    #[error("failed to build ignore matcher: {0}")]
    BuildFailed(String),

    #[error("failed to read ignore file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
