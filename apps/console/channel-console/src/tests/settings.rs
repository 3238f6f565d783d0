// Settings read process-wide environment variables; every test here is serial.

use crate::error::ConsoleError;
use crate::settings::{BASE_URL_ENV, CONFIG_DIR_ENV, config_dir, load_config, log_dir};

use channel_core::{CHANNEL_SERVER_BASE_URL, ChannelConfig};

use std::env;
use std::fs;
use std::path::PathBuf;

use serial_test::serial;

fn clear_env() {
    // SAFETY: tests touching these variables are #[serial]
    unsafe {
        env::remove_var(CONFIG_DIR_ENV);
        env::remove_var(BASE_URL_ENV);
    }
}

fn set_env(name: &str, value: &str) {
    // SAFETY: tests touching these variables are #[serial]
    unsafe {
        env::set_var(name, value);
    }
}

/// **VALUE**: Verifies the environment override for the config directory.
///
/// **WHY THIS MATTERS**: Running several consoles side by side (or in CI)
/// requires pointing each at its own directory.
///
/// **BUG THIS CATCHES**: Would catch the platform directory winning over the
/// explicit override.
#[test]
#[serial]
fn given_config_dir_env_when_resolving_then_env_wins() {
    // GIVEN: CHANNEL_CONFIG_DIR set
    clear_env();
    set_env(CONFIG_DIR_ENV, "/tmp/channel-console-test");

    // WHEN: Resolving
    let dir = config_dir().unwrap();

    // THEN: The override is used as-is
    assert_eq!(dir, PathBuf::from("/tmp/channel-console-test"));
    assert_eq!(log_dir(&dir), PathBuf::from("/tmp/channel-console-test/logs"));
    clear_env();
}

/// **VALUE**: Verifies a blank override is ignored.
#[test]
#[serial]
fn given_blank_config_dir_env_when_resolving_then_platform_dir_used() {
    // GIVEN: CHANNEL_CONFIG_DIR set to whitespace
    clear_env();
    set_env(CONFIG_DIR_ENV, "   ");

    // WHEN: Resolving
    let resolved = config_dir();

    // THEN: Either the platform dir, or a Config error on platforms without one
    match resolved {
        Ok(dir) => assert!(dir.ends_with("channel-console")),
        Err(err) => assert!(matches!(err, ConsoleError::Config { .. })),
    }
    clear_env();
}

/// **VALUE**: Verifies a fresh install runs on defaults.
#[test]
#[serial]
fn given_empty_config_dir_when_loading_then_defaults() {
    // GIVEN: No channel.json, no overrides
    clear_env();
    let dir = tempfile::tempdir().unwrap();

    // WHEN: Loading
    let config = load_config(dir.path()).unwrap();

    // THEN: Defaults
    assert_eq!(config, ChannelConfig::default());
    assert_eq!(config.base_url, CHANNEL_SERVER_BASE_URL);
}

/// **VALUE**: Verifies CHANNEL_BASE_URL overrides the file.
///
/// **BUG THIS CATCHES**: Would catch the override being applied before the file
/// is read, so the file silently wins.
#[test]
#[serial]
fn given_base_url_env_when_loading_then_overrides_file() {
    // GIVEN: A saved config and an override
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    ChannelConfig::with_base_url("http://10.0.0.1:5000")
        .save(dir.path())
        .unwrap();
    set_env(BASE_URL_ENV, "http://10.0.0.2:6000");

    // WHEN: Loading
    let config = load_config(dir.path()).unwrap();

    // THEN: The override wins
    assert_eq!(config.base_url, "http://10.0.0.2:6000");
    clear_env();
}

/// **VALUE**: Verifies an invalid override is rejected, not passed to the manager.
#[test]
#[serial]
fn given_invalid_base_url_env_when_loading_then_config_error() {
    // GIVEN: A non-HTTP override
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    set_env(BASE_URL_ENV, "ftp://10.0.0.2");

    // WHEN: Loading
    let result = load_config(dir.path());

    // THEN: Config error
    assert!(matches!(result, Err(ConsoleError::Config { .. })));
    clear_env();
}

/// **VALUE**: Verifies a corrupt file stops startup with a Config error.
#[test]
#[serial]
fn given_corrupt_file_when_loading_then_config_error() {
    // GIVEN: Garbage in channel.json
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("channel.json"), "][").unwrap();

    // WHEN: Loading
    let result = load_config(dir.path());

    // THEN: Config error naming the file
    let err = result.unwrap_err();
    assert!(matches!(err, ConsoleError::Config { .. }));
    assert!(err.to_string().contains("channel.json"));
}
