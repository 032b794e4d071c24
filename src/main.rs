//! archive-relay CLI
//!
//! Usage: archive-relay --input <DIR> --config-file <FILE> --key <KEY> [OPTIONS]
//!
//! Watches `--input`, serves it as a tar.gz on `--http-addr` and keeps the
//! declaration for `--key` in `--config-file` pointing at the latest build.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use archive_relay::config::{self, DeclarationKind, Settings};
use archive_relay::{logging, Publisher};

/// archive-relay - serve a live directory to a Bazel build
#[derive(Parser, Debug)]
#[command(name = "archive-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch and archive
    #[arg(long)]
    input: Option<PathBuf>,

    /// Address to serve archives on [default: localhost:8673]
    #[arg(long)]
    http_addr: Option<String>,

    /// MODULE.bazel or WORKSPACE file to keep up to date
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Import path (archive_override) or rule name (http_archive) to patch
    #[arg(long)]
    key: Option<String>,

    /// Kind of declaration to patch [default: archive-override]
    #[arg(long, value_enum)]
    kind: Option<DeclarationKind>,

    /// Quiet window before a rebuild, in milliseconds [default: 500]
    #[arg(long)]
    quiet_ms: Option<u64>,

    /// Ignore file name inside the input directory [default: .archiveignore]
    #[arg(long)]
    ignore_file: Option<String>,

    /// Base of the URL written into the declaration [default: http://<http-addr>]
    #[arg(long)]
    url_base: Option<String>,

    /// Stop on file watcher errors instead of logging them
    #[arg(long, overrides_with = "no_fail_on_watch_error")]
    fail_on_watch_error: bool,

    /// Log file watcher errors and keep going, overriding the settings file
    #[arg(long, overrides_with = "fail_on_watch_error")]
    no_fail_on_watch_error: bool,

    /// TOML settings file with defaults for any of the options above
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn flag_settings(&self) -> Settings {
        Settings {
            input: self.input.clone(),
            http_addr: self.http_addr.clone(),
            config_file: self.config_file.clone(),
            key: self.key.clone(),
            kind: self.kind,
            quiet_ms: self.quiet_ms,
            ignore_file: self.ignore_file.clone(),
            url_base: self.url_base.clone(),
            fail_on_watch_error: match (self.fail_on_watch_error, self.no_fail_on_watch_error) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialise logging")?;

    let (config, warnings) = config::resolve(cli.flag_settings(), cli.settings.as_deref())
        .context("invalid configuration")?;
    for w in &warnings {
        match (&w.line, &w.suggestion) {
            (Some(line), Some(s)) => warn!(
                "{}:{}: unknown key '{}' (did you mean '{}'?)",
                w.file.display(),
                line,
                w.key,
                s
            ),
            (Some(line), None) => warn!("{}:{}: unknown key '{}'", w.file.display(), line, w.key),
            (None, _) => warn!("{}: unknown key '{}'", w.file.display(), w.key),
        }
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            info!("interrupted, shutting down");
            cancel.cancel();
        })
        .context("failed to install Ctrl+C handler")?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let config_file = config.config_file.clone();
    runtime
        .block_on(Publisher::new(config).run(cancel))
        .with_context(|| format!("relay into {} stopped", config_file.display()))?;

    info!("stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(args: &[&str]) -> Settings {
        let argv = std::iter::once("archive-relay").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap().flag_settings()
    }

    #[test]
    fn watch_error_flags_are_tri_state() {
        assert_eq!(flags(&[]).fail_on_watch_error, None);
        assert_eq!(flags(&["--fail-on-watch-error"]).fail_on_watch_error, Some(true));
        assert_eq!(flags(&["--no-fail-on-watch-error"]).fail_on_watch_error, Some(false));
        // The last one given wins.
        assert_eq!(
            flags(&["--fail-on-watch-error", "--no-fail-on-watch-error"]).fail_on_watch_error,
            Some(false)
        );
    }

    #[test]
    fn no_fail_flag_overrides_settings_file() {
        let file = Settings {
            fail_on_watch_error: Some(true),
            ..Settings::default()
        };
        let merged = file.overlay(flags(&["--no-fail-on-watch-error"]));
        assert_eq!(merged.fail_on_watch_error, Some(false));
    }
}
