//! Log output setup
//!
//! Logs go to stderr. `RUST_LOG` wins when set; otherwise `-v` flags raise
//! the level from `info`.

use is_terminal::IsTerminal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "archive_relay=info,warn",
        1 => "archive_relay=debug,info",
        _ => "trace",
    }
}

/// Install the global subscriber.
pub fn init(verbosity: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbosity)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(verbosity > 1)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
