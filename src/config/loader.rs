//! Settings loading
//!
//! Layers, lowest priority first: built-in defaults, the TOML settings
//! file, `ARCHIVE_RELAY_*` environment variables, command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RelayError, RelayResult};

use super::types::{RelayConfig, Settings};

/// Environment variable overriding the quiet window (milliseconds)
pub const ENV_QUIET_MS: &str = "ARCHIVE_RELAY_QUIET_MS";
/// Environment variable overriding the published URL base
pub const ENV_URL_BASE: &str = "ARCHIVE_RELAY_URL_BASE";
/// Environment variable overriding the ignore file name
pub const ENV_IGNORE_FILE: &str = "ARCHIVE_RELAY_IGNORE_FILE";

const KNOWN_KEYS: &[&str] = &[
    "input",
    "http_addr",
    "config_file",
    "key",
    "kind",
    "quiet_ms",
    "ignore_file",
    "url_base",
    "fail_on_watch_error",
];

/// Non-fatal settings warning, e.g. an unknown key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

/// Load a settings file and collect warnings for keys it does not know.
pub fn load_with_warnings(path: &Path) -> RelayResult<(Settings, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path).map_err(|source| RelayError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let settings: Settings = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| RelayError::InvalidSettings {
        origin: path.display().to_string(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                line: find_line_number(&content, &key),
                suggestion: suggest_key(&key),
                file: path.to_path_buf(),
                key,
            }
        })
        .collect();

    Ok((settings, warnings))
}

/// Settings taken from `ARCHIVE_RELAY_*` variables, read through `lookup`.
pub fn env_overrides(lookup: impl Fn(&str) -> Option<String>) -> RelayResult<Settings> {
    let quiet_ms = match lookup(ENV_QUIET_MS) {
        Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| RelayError::InvalidSettings {
            origin: ENV_QUIET_MS.to_string(),
            message: format!("expected milliseconds, got '{}'", raw),
        })?),
        None => None,
    };

    Ok(Settings {
        quiet_ms,
        url_base: lookup(ENV_URL_BASE),
        ignore_file: lookup(ENV_IGNORE_FILE),
        ..Settings::default()
    })
}

/// Resolve the run configuration from every layer.
pub fn resolve(
    flags: Settings,
    settings_file: Option<&Path>,
) -> RelayResult<(RelayConfig, Vec<ConfigWarning>)> {
    let (file, warnings) = match settings_file {
        Some(path) => load_with_warnings(path)?,
        None => (Settings::default(), Vec::new()),
    };
    let env = env_overrides(|name| std::env::var(name).ok())?;

    let config = file.overlay(env).overlay(flags).validate()?;
    Ok((config, warnings))
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in KNOWN_KEYS {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = usize::from(ac != bc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_bytes.len()]
}
