//! Watch → debounce → build → patch pipeline
//!
//! [`Publisher`] owns the run configuration and the current archive. Its
//! [`Publisher::run`] supervises three units sharing one cancellation token:
//! the watcher relay, the debounced rebuild loop and the archive server.
//! The first unit to fail cancels the others and its error ends the run.

mod current;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::archive::{Archive, ArchiveBuilder, ContentHash, ARCHIVE_EXTENSION};
use crate::config::RelayConfig;
use crate::debounce::Debouncer;
use crate::document::Document;
use crate::error::{RelayError, RelayResult};
use crate::fs::{read_config, relative_within, write_if_changed, WriteOutcome};
use crate::patcher::{archive_attributes, DeclarationPatcher};
use crate::server::{self, ServerState};
use crate::watcher::DirectoryWatcher;

pub use current::CurrentArchive;

/// URL of the archive with `hash` under `url_base`.
pub fn published_url(url_base: &str, hash: &ContentHash) -> String {
    format!(
        "{}/by-sha256/{}.{}",
        url_base.trim_end_matches('/'),
        hash,
        ARCHIVE_EXTENSION
    )
}

/// Result of one patch-and-persist step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The configuration file now points at the archive
    Written,
    /// The configuration file already pointed at the archive
    Unchanged,
    /// No matching declaration; nothing was written
    NotFound,
}

pub struct Publisher {
    config: RelayConfig,
    current: Arc<CurrentArchive>,
    builder: ArchiveBuilder,
    patcher: DeclarationPatcher,
    /// Configuration file path relative to the input, when it lives there
    config_in_input: Option<PathBuf>,
}

impl Publisher {
    pub fn new(config: RelayConfig) -> Self {
        // A configuration file inside the input must stay out of the archive:
        // its content depends on the archive's hash.
        let config_in_input = relative_within(&config.input, &config.config_file);
        let mut builder = ArchiveBuilder::new(config.ignore_file.clone());
        if let Some(rel) = &config_in_input {
            debug!("{} is inside the input; not archiving it", rel.display());
            builder = builder.excluding(rel.clone());
        }

        Self {
            builder,
            patcher: config.patcher(),
            current: Arc::new(CurrentArchive::new()),
            config_in_input,
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn current(&self) -> Arc<CurrentArchive> {
        Arc::clone(&self.current)
    }

    /// Check the configuration file before anything starts: it must parse
    /// and hold the declaration to patch.
    pub fn validate(&self) -> RelayResult<()> {
        let doc = self.load_document()?;
        if !self.patcher.matches(&doc) {
            let shape = self.patcher.shape();
            return Err(RelayError::DeclarationNotFound {
                function: shape.function.to_string(),
                key_attribute: shape.key_attribute.to_string(),
                key: self.patcher.key().to_string(),
                file: self.config.config_file.clone(),
            });
        }
        Ok(())
    }

    /// Build a fresh archive, publish it and point the configuration file at
    /// it. A failed build keeps the previous archive in service.
    pub async fn rebuild(&self) -> RelayResult<()> {
        let builder = self.builder.clone();
        let root = self.config.input.clone();
        let built = tokio::task::spawn_blocking(move || builder.build(&root))
            .await
            .map_err(|e| RelayError::Task(e.to_string()))?;

        let archive = match built {
            Ok(archive) => Arc::new(archive),
            Err(e) => {
                error!("archive build failed, still serving the previous archive: {}", e);
                return Ok(());
            }
        };

        let previous = self.current.publish(Arc::clone(&archive));
        if previous.is_some_and(|p| p.hash() == archive.hash()) {
            debug!(sha256 = %archive.hash().short(), "archive unchanged");
        } else {
            info!(
                files = archive.file_count(),
                bytes = archive.len(),
                "published archive {}",
                archive.hash()
            );
        }

        self.patch_and_persist(&archive)?;
        Ok(())
    }

    /// Point the configuration file at `archive`, writing only on change.
    pub fn patch_and_persist(&self, archive: &Archive) -> RelayResult<PatchOutcome> {
        let path = &self.config.config_file;
        let mut doc = self.load_document()?;
        let url = self.config.archive_url(archive.hash());

        if !self
            .patcher
            .update(&mut doc, &archive_attributes(archive.hash(), &url))?
        {
            let shape = self.patcher.shape();
            warn!(
                "no {}({} = \"{}\") declaration in {}; not updated",
                shape.function,
                shape.key_attribute,
                self.patcher.key(),
                path.display()
            );
            return Ok(PatchOutcome::NotFound);
        }

        match write_if_changed(path, &doc.format())? {
            WriteOutcome::Unchanged => {
                debug!("{} already points at {}", path.display(), archive.hash().short());
                Ok(PatchOutcome::Unchanged)
            }
            WriteOutcome::Written { diff } => {
                info!("updated {} to {}", path.display(), url);
                debug!("\n{}", diff);
                Ok(PatchOutcome::Written)
            }
        }
    }

    fn load_document(&self) -> RelayResult<Document> {
        let path: &Path = &self.config.config_file;
        let text = read_config(path)?;
        Ok(Document::parse(path.display().to_string(), text.as_bytes())?)
    }

    /// Run the pipeline until `cancel` fires or a unit fails.
    pub async fn run(self, cancel: CancellationToken) -> RelayResult<()> {
        self.validate()?;
        let mut watcher = DirectoryWatcher::watch(&self.config.input, self.config.watch_error_policy)?;
        if let Some(rel) = &self.config_in_input {
            watcher = watcher.ignoring(self.config.input.join(rel));
        }
        let listener = server::bind(&self.config.http_addr).await?;

        let state = ServerState::new(self.current(), &self.config.url_base);
        let debouncer = Arc::new(Debouncer::new(self.config.quiet_window));
        let publisher = Arc::new(self);

        // Build once at startup rather than waiting for the first change.
        debouncer.trigger();

        let mut units = JoinSet::new();
        {
            let debouncer = Arc::clone(&debouncer);
            let cancel = cancel.clone();
            units.spawn(async move { watcher.relay(&debouncer, &cancel).await });
        }
        {
            let debouncer = Arc::clone(&debouncer);
            let publisher = Arc::clone(&publisher);
            let cancel = cancel.clone();
            units.spawn(async move { debouncer.listen(&cancel, || publisher.rebuild()).await });
        }
        units.spawn(server::serve(listener, state, cancel.clone()));

        info!(
            "relaying {} into {}",
            publisher.config.input.display(),
            publisher.config.config_file.display()
        );

        supervise(units, &cancel).await
    }
}

/// Wait for every unit; the first failure cancels the rest and is returned.
async fn supervise(mut units: JoinSet<RelayResult<()>>, cancel: &CancellationToken) -> RelayResult<()> {
    let mut outcome = Ok(());
    while let Some(joined) = units.join_next().await {
        let result = joined
            .map_err(|e| RelayError::Task(e.to_string()))
            .and_then(|r| r);
        if let Err(e) = result {
            if outcome.is_ok() {
                cancel.cancel();
                outcome = Err(e);
            } else {
                debug!("after shutdown: {}", e);
            }
        }
    }
    outcome
}
