//! Configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::archive::{ContentHash, DEFAULT_IGNORE_FILE};
use crate::debounce::DEFAULT_QUIET_WINDOW;
use crate::error::{RelayError, RelayResult};
use crate::patcher::{DeclarationPatcher, DeclarationShape};
use crate::publisher::published_url;
use crate::watcher::WatchErrorPolicy;

/// Default listen address of the archive server
pub const DEFAULT_HTTP_ADDR: &str = "localhost:8673";

/// Which kind of declaration the configuration file carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DeclarationKind {
    /// `go_deps.archive_override(path = ...)` in MODULE.bazel
    #[default]
    ArchiveOverride,
    /// `http_archive(name = ...)` in WORKSPACE
    HttpArchive,
}

impl DeclarationKind {
    pub fn shape(self) -> DeclarationShape {
        match self {
            DeclarationKind::ArchiveOverride => DeclarationShape::archive_override(),
            DeclarationKind::HttpArchive => DeclarationShape::http_archive(),
        }
    }
}

/// One layer of settings: a TOML file, the environment or the command line.
///
/// Unset fields fall through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input: Option<PathBuf>,
    pub http_addr: Option<String>,
    pub config_file: Option<PathBuf>,
    pub key: Option<String>,
    pub kind: Option<DeclarationKind>,
    pub quiet_ms: Option<u64>,
    pub ignore_file: Option<String>,
    pub url_base: Option<String>,
    pub fail_on_watch_error: Option<bool>,
}

impl Settings {
    /// Layer `over` on top of `self`; values set in `over` win.
    pub fn overlay(self, over: Settings) -> Settings {
        Settings {
            input: over.input.or(self.input),
            http_addr: over.http_addr.or(self.http_addr),
            config_file: over.config_file.or(self.config_file),
            key: over.key.or(self.key),
            kind: over.kind.or(self.kind),
            quiet_ms: over.quiet_ms.or(self.quiet_ms),
            ignore_file: over.ignore_file.or(self.ignore_file),
            url_base: over.url_base.or(self.url_base),
            fail_on_watch_error: over.fail_on_watch_error.or(self.fail_on_watch_error),
        }
    }

    /// Check required values and fill in defaults.
    ///
    /// Reports the first missing parameter.
    pub fn validate(self) -> RelayResult<RelayConfig> {
        let input = non_empty_path(self.input).ok_or(RelayError::MissingParameter { name: "input" })?;
        let config_file = non_empty_path(self.config_file)
            .ok_or(RelayError::MissingParameter { name: "config-file" })?;
        let key = self
            .key
            .filter(|k| !k.is_empty())
            .ok_or(RelayError::MissingParameter { name: "key" })?;

        let http_addr = self
            .http_addr
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let url_base = self
            .url_base
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("http://{}", http_addr));

        Ok(RelayConfig {
            input,
            config_file,
            key,
            kind: self.kind.unwrap_or_default(),
            quiet_window: self
                .quiet_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_QUIET_WINDOW),
            ignore_file: self
                .ignore_file
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_IGNORE_FILE.to_string()),
            url_base: url_base.trim_end_matches('/').to_string(),
            http_addr,
            watch_error_policy: if self.fail_on_watch_error.unwrap_or(false) {
                WatchErrorPolicy::FailFast
            } else {
                WatchErrorPolicy::LogAndContinue
            },
        })
    }
}

fn non_empty_path(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Directory to watch and archive
    pub input: PathBuf,
    /// Address the archive server listens on
    pub http_addr: String,
    /// MODULE.bazel or WORKSPACE file to patch
    pub config_file: PathBuf,
    /// Import path or rule name identifying the declaration
    pub key: String,
    pub kind: DeclarationKind,
    pub quiet_window: Duration,
    pub ignore_file: String,
    /// Prefix of published URLs, without a trailing slash
    pub url_base: String,
    pub watch_error_policy: WatchErrorPolicy,
}

impl RelayConfig {
    /// URL at which the archive with `hash` is served.
    pub fn archive_url(&self, hash: &ContentHash) -> String {
        published_url(&self.url_base, hash)
    }

    pub fn patcher(&self) -> DeclarationPatcher {
        DeclarationPatcher::new(self.kind.shape(), self.key.clone())
    }
}
