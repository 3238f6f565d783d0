use channel_core::ChannelConfig;
use channel_core::error::CoreError;
use channel_core::error::config::ConfigError;

use common::ErrorLocation;

use std::error::Error;
use std::fs;
use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;
use std::path::PathBuf;

/// **VALUE**: Verifies that `ConfigError::ReadError` names the file and keeps its source.
///
/// **WHY THIS MATTERS**: "permission denied" without a path is useless when the
/// config lives in a per-user directory.
///
/// **BUG THIS CATCHES**: Would catch the `#[source]` attribute or the path being
/// dropped from the variant.
#[test]
#[track_caller]
fn given_read_error_when_formatted_then_includes_path_and_source() {
    // GIVEN: A ReadError wrapping an IO error
    let err = ConfigError::ReadError {
        location: ErrorLocation::from(Location::caller()),
        path: PathBuf::from("/tmp/channel.json"),
        source: IoError::new(ErrorKind::PermissionDenied, "permission denied"),
    };

    // WHEN: Formatting and walking the chain
    let error_string = err.to_string();
    let source = err.source().map(ToString::to_string);

    // THEN: Path, cause, and location are all there
    assert!(error_string.contains("Config Read Error"));
    assert!(error_string.contains("/tmp/channel.json"));
    assert!(error_string.contains("config.rs"));
    assert_eq!(source.as_deref(), Some("permission denied"));
}

/// **VALUE**: Verifies an invalid config is rejected before the manager is built.
///
/// **BUG THIS CATCHES**: Would catch `ChannelManager::new` skipping validation
/// and failing later with a less useful URL error.
#[test]
fn given_invalid_config_when_building_manager_then_config_error() {
    // GIVEN: A config with a non-HTTP base URL
    let config = ChannelConfig::with_base_url("ftp://example.com");

    // WHEN: Building the manager
    let result = channel_core::ChannelManager::new(config);

    // THEN: A config error comes back
    assert!(matches!(
        result,
        Err(CoreError::Config(ConfigError::ValidationError { .. }))
    ));
}

/// **VALUE**: Verifies a corrupt file is reported with its path.
#[test]
fn given_corrupt_file_when_loading_then_parse_error_names_file() {
    // GIVEN: A config directory holding garbage
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("channel.json"), "{ not json").unwrap();

    // WHEN: Loading
    let err = ChannelConfig::load(dir.path()).unwrap_err();

    // THEN: ParseError naming the file
    assert!(matches!(err, ConfigError::ParseError { .. }));
    assert!(err.to_string().contains("channel.json"));
}
