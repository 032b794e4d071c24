//! archive-relay - serve a live directory as a content-addressed archive
//!
//! A directory is watched, debounced, packed into a deterministic tar.gz and
//! served over HTTP. Each new archive's SHA-256 and URL are written into the
//! matching `archive_override` / `http_archive` declaration of a Bazel
//! `MODULE.bazel` or `WORKSPACE` file, so the dependent build always fetches
//! the current contents.

pub mod archive;
pub mod config;
pub mod debounce;
pub mod document;
pub mod error;
pub mod fs;
pub mod logging;
pub mod patcher;
pub mod publisher;
pub mod server;
pub mod watcher;

// Re-exports for convenience
pub use archive::{Archive, ArchiveBuilder, ContentHash};
pub use config::{RelayConfig, Settings};
pub use document::Document;
pub use error::{RelayError, RelayResult};
pub use patcher::{DeclarationPatcher, DeclarationShape};
pub use publisher::{PatchOutcome, Publisher};
