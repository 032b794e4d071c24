//! The live archive cell

use std::sync::{Arc, PoisonError, RwLock};

use crate::archive::Archive;

/// Holds the archive currently being served.
///
/// Readers get either nothing (no build has finished yet) or the latest
/// complete archive; a swap is a single pointer exchange.
#[derive(Debug, Default)]
pub struct CurrentArchive {
    inner: RwLock<Option<Arc<Archive>>>,
}

impl CurrentArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Archive>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make `archive` current, returning the one it replaces.
    pub fn publish(&self, archive: Arc<Archive>) -> Option<Arc<Archive>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(archive)
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }
}
