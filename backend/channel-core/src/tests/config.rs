use crate::config::{ChannelConfig, ReconnectPolicy};
use crate::error::config::ConfigError;

use std::time::Duration;

use tempfile::TempDir;

/// **VALUE**: Verifies defaults match the documented connection constants.
///
/// **WHY THIS MATTERS**: These values bound how long a user waits before falling back
/// to HTTP; silently changing them changes perceived startup latency.
///
/// **BUG THIS CATCHES**: Would catch a default function drifting from its constant.
#[test]
fn given_default_config_when_inspected_then_matches_connection_constants() {
    // GIVEN / WHEN
    let config = ChannelConfig::default();

    // THEN
    assert_eq!(config.probe_timeout(), Duration::from_secs(5));
    assert_eq!(config.handshake_timeout(), Duration::from_secs(30));
    assert_eq!(config.reconnect.max_attempts, 5);
    assert_eq!(config.reconnect.base_delay(), Duration::from_secs(3));
    assert_eq!(config.reconnect.max_delay(), Duration::from_secs(30));
    assert_eq!(config.reconnect.randomization_factor, 0.5);
    assert_eq!(config.heartbeat.interval(), Duration::from_secs(25));
    assert_eq!(config.heartbeat.timeout(), Duration::from_secs(60));
    assert_eq!(config.status_path, "/api/websocket-status");
    assert!(config.validate().is_ok());
}

#[test]
fn given_missing_file_when_loaded_then_returns_defaults() {
    // GIVEN: An empty directory
    let dir = TempDir::new().unwrap();

    // WHEN
    let config = ChannelConfig::load(dir.path()).unwrap();

    // THEN
    assert_eq!(config, ChannelConfig::default());
}

/// **VALUE**: Verifies save/load preserves every field, including nested policies.
///
/// **WHY THIS MATTERS**: Operators tune reconnect behaviour through this file.
///
/// **BUG THIS CATCHES**: Would catch a field missing `#[serde(default)]` or a temp
/// file left behind by the atomic write.
#[test]
fn given_customized_config_when_saved_and_loaded_then_values_preserved() {
    // GIVEN: A config with non-default policies
    let dir = TempDir::new().unwrap();
    let mut config = ChannelConfig::with_base_url("https://api.example.com");
    config.reconnect.max_attempts = 2;
    config.reconnect.base_delay_ms = 100;
    config.heartbeat.interval_ms = 1_000;
    config.heartbeat.timeout_ms = 2_500;

    // WHEN
    config.save(dir.path()).unwrap();
    let loaded = ChannelConfig::load(dir.path()).unwrap();

    // THEN
    assert_eq!(loaded, config);
    assert!(!dir.path().join("channel.json.tmp").exists());
}

#[test]
fn given_partial_file_when_loaded_then_missing_fields_defaulted() {
    // GIVEN: A file that only sets the base URL and one policy field
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("channel.json"),
        r#"{"base_url": "http://10.0.0.5:8080", "reconnect": {"max_attempts": 9}}"#,
    )
    .unwrap();

    // WHEN
    let config = ChannelConfig::load(dir.path()).unwrap();

    // THEN
    assert_eq!(config.base_url, "http://10.0.0.5:8080");
    assert_eq!(config.reconnect.max_attempts, 9);
    assert_eq!(config.reconnect.base_delay_ms, 3_000);
    assert_eq!(config.duplex_path, "/socket.io");
}

#[test]
fn given_corrupt_file_when_loaded_then_parse_error() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("channel.json"), "{ not json").unwrap();

    // WHEN
    let result = ChannelConfig::load(dir.path());

    // THEN
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies validation rejects values the connection task cannot honour.
///
/// **WHY THIS MATTERS**: The manager validates once at construction; anything that
/// slips through surfaces later as a confusing runtime failure.
///
/// **BUG THIS CATCHES**: Would catch a dropped validation rule.
#[test]
fn given_invalid_values_when_validated_then_rejected() {
    let cases: Vec<(&str, ChannelConfig)> = vec![
        ("version", ChannelConfig {
            version: 0,
            ..ChannelConfig::default()
        }),
        ("base_url", ChannelConfig::with_base_url("ftp://example.com")),
        ("base_url host", ChannelConfig::with_base_url("http://")),
        ("duplex_url", ChannelConfig {
            duplex_url: Some("http://example.com/socket".to_string()),
            ..ChannelConfig::default()
        }),
        ("status_path", ChannelConfig {
            status_path: "api/status".to_string(),
            ..ChannelConfig::default()
        }),
        ("probe_timeout", ChannelConfig {
            probe_timeout_ms: 0,
            ..ChannelConfig::default()
        }),
        ("delays", ChannelConfig {
            reconnect: ReconnectPolicy {
                base_delay_ms: 60_000,
                ..ReconnectPolicy::default()
            },
            ..ChannelConfig::default()
        }),
        ("randomization", ChannelConfig {
            reconnect: ReconnectPolicy {
                randomization_factor: 1.5,
                ..ReconnectPolicy::default()
            },
            ..ChannelConfig::default()
        }),
    ];

    for (name, config) in cases {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{name} should be rejected"
        );
    }

    let mut heartbeat = ChannelConfig::default();
    heartbeat.heartbeat.timeout_ms = heartbeat.heartbeat.interval_ms;
    assert!(heartbeat.validate().is_err(), "heartbeat should be rejected");
}

/// **VALUE**: Verifies base URLs carrying a path are rejected.
///
/// **WHY THIS MATTERS**: Routes are joined as absolute paths, so
/// `http://host/app/` would silently probe `http://host/api/websocket-status`.
///
/// **BUG THIS CATCHES**: Would catch a mounted service being configured through
/// `base_url` and every request missing the mount prefix.
#[test]
fn given_base_url_with_path_when_validated_then_rejected() {
    // GIVEN: Origins with and without a path
    let mounted = ChannelConfig::with_base_url("http://host/app/");
    let bare = ChannelConfig::with_base_url("http://host:8080");
    let slash = ChannelConfig::with_base_url("https://host/");

    // WHEN / THEN: Only the path-free origins pass
    let err = mounted.validate().unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
    assert!(err.to_string().contains("/app/"));
    assert!(bare.validate().is_ok());
    assert!(slash.validate().is_ok());
}

/// **VALUE**: Verifies a mount prefix goes into the route paths instead.
#[test]
fn given_mount_prefix_in_route_paths_when_validated_then_accepted() {
    // GIVEN
    let mut config = ChannelConfig::with_base_url("http://host");
    config.status_path = "/app/api/websocket-status".to_string();
    config.interfaces_path = "/app/api/interfaces".to_string();
    config.dynamic_prefix = "/app/api/dynamic".to_string();

    // WHEN / THEN
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies the first reconnect delay is jittered around the base delay.
///
/// **WHY THIS MATTERS**: Unjittered or uncapped delays either stampede the server
/// after an outage or leave users waiting minutes for a reconnect.
///
/// **BUG THIS CATCHES**: Would catch `current_interval` not being seeded from the
/// base delay (the backoff crate defaults it to 500ms).
#[test]
fn given_default_policy_when_schedule_iterated_then_first_delay_jittered_around_base() {
    // GIVEN
    let mut schedule = ReconnectPolicy::default().schedule();

    // WHEN: Taking the first delay
    let first = schedule.next_delay();

    // THEN: Within base ± 50%
    assert!(first >= Duration::from_millis(1_500), "{first:?} below jitter floor");
    assert!(first <= Duration::from_millis(4_500), "{first:?} above jitter ceiling");
}

/// **VALUE**: Verifies no reconnect delay ever exceeds `max_delay`.
///
/// **WHY THIS MATTERS**: The cap is the longest a user waits between attempts.
/// Jitter added on top of a capped interval would stretch 30s to 45s.
///
/// **BUG THIS CATCHES**: Would catch the cap being applied before the jitter
/// instead of to the final delay.
#[test]
fn given_default_policy_when_many_delays_drawn_then_none_exceed_cap() {
    // GIVEN
    let policy = ReconnectPolicy::default();
    let mut schedule = policy.schedule();

    // WHEN / THEN: Thousands of draws, well past the point where the interval saturates
    let mut longest = Duration::ZERO;
    for _ in 0..2_000 {
        let delay = schedule.next_delay();
        assert!(delay <= policy.max_delay(), "{delay:?} exceeds {:?} cap", policy.max_delay());
        longest = longest.max(delay);
    }

    // AND: The cap is actually reached, so the schedule is not stuck low
    assert_eq!(longest, policy.max_delay());
}

/// **VALUE**: Verifies reset returns the schedule to the base delay.
#[test]
fn given_saturated_schedule_when_reset_then_back_near_base() {
    // GIVEN: A schedule driven to its cap
    let mut schedule = ReconnectPolicy::default().schedule();
    for _ in 0..20 {
        schedule.next_delay();
    }

    // WHEN
    schedule.reset();

    // THEN
    assert!(schedule.next_delay() <= Duration::from_millis(4_500));
}
