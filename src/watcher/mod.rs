//! Directory watching
//!
//! [`DirectoryWatcher`] registers every file and directory below a root with
//! the native watcher and relays each change notification to a
//! [`Debouncer`]. The watch set is reconciled as notifications arrive:
//! created directories are walked and added, removed paths are dropped.

mod watch_set;

use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::error::{RelayError, RelayResult};

pub use watch_set::{discover, WatchSet};

/// What to do with errors reported by the native watcher after startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchErrorPolicy {
    /// Log a warning and keep watching
    #[default]
    LogAndContinue,
    /// End the run with the error
    FailFast,
}

impl WatchErrorPolicy {
    /// Classify an asynchronous watcher error.
    pub fn handle(&self, error: notify::Error) -> RelayResult<()> {
        match self {
            WatchErrorPolicy::LogAndContinue => {
                warn!("file watcher error: {}", error);
                Ok(())
            }
            WatchErrorPolicy::FailFast => Err(RelayError::WatchStream(error)),
        }
    }
}

/// Watches a directory tree and turns mutations into debouncer triggers.
pub struct DirectoryWatcher {
    watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    watch_set: WatchSet,
    policy: WatchErrorPolicy,
    quiet_paths: Vec<PathBuf>,
}

impl DirectoryWatcher {
    /// Walk `root` and register everything below it.
    ///
    /// Any failure here is fatal: the caller cannot trust a partial watch.
    pub fn watch(root: &Path, policy: WatchErrorPolicy) -> RelayResult<Self> {
        let (tx, events) = mpsc::unbounded_channel();
        let watcher = RecommendedWatcher::new(
            move |result| {
                // The receiver only goes away during shutdown.
                let _ = tx.send(result);
            },
            Config::default(),
        )
        .map_err(|source| RelayError::Watch {
            path: root.to_path_buf(),
            source,
        })?;

        let mut this = Self {
            watcher,
            events,
            watch_set: WatchSet::new(root),
            policy,
            quiet_paths: Vec::new(),
        };

        for path in discover(root)? {
            this.register(path)?;
        }
        debug!(paths = this.watch_set.len(), "watching {}", root.display());
        Ok(this)
    }

    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    /// Changes touching only `path` no longer trigger the debouncer. The
    /// path stays in the watch set.
    pub fn ignoring(mut self, path: impl Into<PathBuf>) -> Self {
        self.quiet_paths.push(path.into());
        self
    }

    /// Relay notifications to `debouncer` until `cancel` fires or an error
    /// is classified as fatal.
    pub async fn relay(&mut self, debouncer: &Debouncer, cancel: &CancellationToken) -> RelayResult<()> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                next = self.events.recv() => next,
            };

            match next {
                Some(Ok(event)) => {
                    if self.handle_event(&event) {
                        debouncer.trigger();
                    }
                }
                Some(Err(error)) => self.policy.handle(error)?,
                None => return Ok(()),
            }
        }
    }

    /// Reconcile the watch set with `event`; returns whether it is a mutation
    /// inside the watched tree.
    pub(crate) fn handle_event(&mut self, event: &Event) -> bool {
        if !is_mutation(&event.kind) {
            return false;
        }
        let root = self.watch_set.root().to_path_buf();
        if !event.paths.iter().any(|p| p.starts_with(&root)) {
            return false;
        }
        let relevant = event
            .paths
            .iter()
            .any(|p| p.starts_with(&root) && !self.quiet_paths.contains(p));

        for path in &event.paths {
            match event.kind {
                EventKind::Remove(_) => self.forget(path),
                EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_)) => {
                    if path.symlink_metadata().is_ok() {
                        self.adopt(path);
                    } else {
                        self.forget(path);
                    }
                }
                _ => {}
            }
        }
        if !relevant {
            return false;
        }
        debug!(kind = ?event.kind, paths = ?event.paths, "change");
        true
    }

    fn register(&mut self, path: PathBuf) -> RelayResult<()> {
        if self.watch_set.contains(&path) && path != self.watch_set.root() {
            return Ok(());
        }
        self.watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|source| RelayError::Watch {
                path: path.clone(),
                source,
            })?;
        self.watch_set.insert(path);
        Ok(())
    }

    /// Best-effort registration of a newly created path and its contents.
    fn adopt(&mut self, path: &Path) {
        let found = match discover(path) {
            Ok(found) => found,
            Err(e) => {
                debug!("skipping new path: {}", e);
                return;
            }
        };
        for p in found {
            if self.watch_set.contains(&p) {
                continue;
            }
            let shown = p.display().to_string();
            match self.register(p) {
                Ok(()) => debug!("watching {}", shown),
                Err(e) => debug!("could not watch new path: {}", e),
            }
        }
    }

    fn forget(&mut self, path: &Path) {
        for p in self.watch_set.remove_tree(path) {
            // Deleted paths are usually unwatched by the OS already.
            if let Err(e) = self.watcher.unwatch(&p) {
                debug!("unwatch {}: {}", p.display(), e);
            }
        }
    }
}

/// Opens and reads do not change archive content.
fn is_mutation(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}
