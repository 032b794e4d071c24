//! Run configuration
//!
//! Precedence, highest first:
//! 1. CLI flags
//! 2. Environment variables (`ARCHIVE_RELAY_*`)
//! 3. Settings file (`--settings <toml>`)
//! 4. Built-in defaults

mod loader;
#[cfg(test)]
mod tests;
mod types;

pub use loader::{
    env_overrides, load_with_warnings, resolve, ConfigWarning, ENV_IGNORE_FILE, ENV_QUIET_MS,
    ENV_URL_BASE,
};
pub use types::{DeclarationKind, RelayConfig, Settings, DEFAULT_HTTP_ADDR};
