//! Error types for archive-relay
//!
//! Component-local errors (`ParseError`, `IgnoreError`) bubble up unchanged
//! through `RelayError`; `main` adds context with `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

use crate::archive::IgnoreError;
use crate::document::ParseError;

/// Result type alias for archive-relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Main error type for archive-relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// A required startup parameter was not supplied
    #[error("missing required parameter '{name}' (pass --{name})")]
    MissingParameter { name: &'static str },

    /// A settings value could not be interpreted
    #[error("invalid settings in {origin}: {message}")]
    InvalidSettings { origin: String, message: String },

    /// The configuration document holds no declaration for the key
    #[error("no {function}({key_attribute} = \"{key}\") declaration found in {file}")]
    DeclarationNotFound {
        function: String,
        key_attribute: String,
        key: String,
        file: PathBuf,
    },

    /// Malformed configuration document
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Ignore file could not be loaded
    #[error(transparent)]
    Ignore(#[from] IgnoreError),

    /// Reading the configuration document failed
    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisting the patched configuration document failed
    #[error("failed to write configuration file {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Walking the watched or archived directory failed
    #[error("error walking {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// Reading a file into the archive failed
    #[error("failed to archive {path}: {source}")]
    ArchiveEntry {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The native watcher could not be created or could not watch a path
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },

    /// An asynchronous watcher error classified as fatal
    #[error("file watcher error: {0}")]
    WatchStream(notify::Error),

    /// The HTTP listener could not be bound
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline unit panicked or was aborted
    #[error("pipeline task failed: {0}")]
    Task(String),
}

impl RelayError {
    /// Configuration errors are detected before the pipeline starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter { .. }
                | Self::InvalidSettings { .. }
                | Self::DeclarationNotFound { .. }
        )
    }
}
