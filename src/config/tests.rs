//! Tests for the config module

use super::loader::*;
use super::types::*;
use crate::archive::{ContentHash, DEFAULT_IGNORE_FILE};
use crate::error::RelayError;
use crate::watcher::WatchErrorPolicy;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn required() -> Settings {
    Settings {
        input: Some(PathBuf::from("/src/lib")),
        config_file: Some(PathBuf::from("/ws/MODULE.bazel")),
        key: Some("github.com/example/lib".to_string()),
        ..Settings::default()
    }
}

#[test]
fn test_validate_fills_defaults() {
    let config = required().validate().unwrap();

    assert_eq!(config.http_addr, DEFAULT_HTTP_ADDR);
    assert_eq!(config.url_base, "http://localhost:8673");
    assert_eq!(config.kind, DeclarationKind::ArchiveOverride);
    assert_eq!(config.quiet_window, Duration::from_millis(500));
    assert_eq!(config.ignore_file, DEFAULT_IGNORE_FILE);
    assert_eq!(config.watch_error_policy, WatchErrorPolicy::LogAndContinue);
}

#[test]
fn test_validate_reports_first_missing_parameter() {
    let err = Settings::default().validate().unwrap_err();
    assert!(matches!(err, RelayError::MissingParameter { name: "input" }));

    let err = Settings {
        config_file: None,
        ..required()
    }
    .validate()
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "missing required parameter 'config-file' (pass --config-file)"
    );

    let err = Settings {
        key: Some(String::new()),
        ..required()
    }
    .validate()
    .unwrap_err();
    assert!(matches!(err, RelayError::MissingParameter { name: "key" }));
}

#[test]
fn test_url_base_follows_http_addr_and_drops_trailing_slash() {
    let config = Settings {
        http_addr: Some("0.0.0.0:9000".to_string()),
        ..required()
    }
    .validate()
    .unwrap();
    assert_eq!(config.url_base, "http://0.0.0.0:9000");

    let config = Settings {
        url_base: Some("https://relay.example.com/".to_string()),
        ..required()
    }
    .validate()
    .unwrap();
    assert_eq!(config.url_base, "https://relay.example.com");
}

#[test]
fn test_archive_url() {
    let config = required().validate().unwrap();
    let hash = ContentHash::from_bytes(b"x");

    assert_eq!(
        config.archive_url(&hash),
        format!("http://localhost:8673/by-sha256/{}.tar.gz", hash.hex())
    );
}

#[test]
fn test_overlay_prefers_upper_layer() {
    let lower = Settings {
        quiet_ms: Some(100),
        url_base: Some("http://lower".to_string()),
        ..Settings::default()
    };
    let upper = Settings {
        quiet_ms: Some(250),
        ..Settings::default()
    };

    let merged = lower.overlay(upper);

    assert_eq!(merged.quiet_ms, Some(250));
    assert_eq!(merged.url_base.as_deref(), Some("http://lower"));
}

#[test]
fn test_http_archive_kind() {
    let config = Settings {
        kind: Some(DeclarationKind::HttpArchive),
        fail_on_watch_error: Some(true),
        ..required()
    }
    .validate()
    .unwrap();

    assert_eq!(config.patcher().shape().function, "http_archive");
    assert_eq!(config.patcher().shape().key_attribute, "name");
    assert_eq!(config.watch_error_policy, WatchErrorPolicy::FailFast);
}

#[test]
fn test_load_settings_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(
        &path,
        r#"
input = "/src/lib"
config_file = "/ws/WORKSPACE"
key = "com_example_lib"
kind = "http-archive"
quiet_ms = 1200
"#,
    )
    .unwrap();

    let (settings, warnings) = load_with_warnings(&path).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(settings.kind, Some(DeclarationKind::HttpArchive));
    assert_eq!(settings.quiet_ms, Some(1200));
    assert_eq!(settings.config_file, Some(PathBuf::from("/ws/WORKSPACE")));
}

#[test]
fn test_unknown_keys_warn_with_suggestion() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(&path, "key = \"x\"\nquiet_mss = 10\nflavour = \"mint\"\n").unwrap();

    let (settings, warnings) = load_with_warnings(&path).unwrap();

    assert_eq!(settings.key.as_deref(), Some("x"));
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].key, "quiet_mss");
    assert_eq!(warnings[0].line, Some(2));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("quiet_ms"));
    assert_eq!(warnings[1].key, "flavour");
    assert_eq!(warnings[1].suggestion, None);
}

#[test]
fn test_invalid_settings_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(&path, "quiet_ms = \"soon\"\n").unwrap();

    let err = load_with_warnings(&path).unwrap_err();
    assert!(matches!(err, RelayError::InvalidSettings { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        (ENV_QUIET_MS, " 750 "),
        (ENV_URL_BASE, "http://relay:1"),
        (ENV_IGNORE_FILE, ".relayignore"),
    ]
    .into_iter()
    .collect();

    let settings = env_overrides(|name| env.get(name).map(|v| v.to_string())).unwrap();

    assert_eq!(settings.quiet_ms, Some(750));
    assert_eq!(settings.url_base.as_deref(), Some("http://relay:1"));
    assert_eq!(settings.ignore_file.as_deref(), Some(".relayignore"));
    assert_eq!(settings.key, None);
}

#[test]
fn test_env_quiet_ms_must_be_a_number() {
    let err = env_overrides(|name| (name == ENV_QUIET_MS).then(|| "soon".to_string())).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid settings in ARCHIVE_RELAY_QUIET_MS: expected milliseconds, got 'soon'"
    );
}

#[test]
fn test_flags_override_settings_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    fs::write(
        &path,
        "input = \"/from/file\"\nconfig_file = \"/ws/MODULE.bazel\"\nkey = \"k\"\n",
    )
    .unwrap();
    let flags = Settings {
        input: Some(PathBuf::from("/from/flag")),
        ..Settings::default()
    };

    let (config, _) = resolve(flags, Some(&path)).unwrap();

    assert_eq!(config.input, PathBuf::from("/from/flag"));
    assert_eq!(config.key, "k");
}
