//! Tests for config functionality.

use crate::config::Config;
use crate::locks::WaitPolicy;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(config.process_id.is_none());
    assert_eq!(config.catalog_dir, ".distlock");
    assert_eq!(config.ping_interval_ms, 30_000);
    assert_eq!(config.lock_wait_ms, 5_000);
    assert_eq!(config.lock_retry_interval_ms, 500);
    assert_eq!(config.ping_stale_minutes, 15);
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    assert_eq!(config.ping_interval_ms, 30_000);
    assert_eq!(config.catalog_dir, ".distlock");
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
process_id: "config-server-1"
ping_interval_ms: 1000
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.process_id.as_deref(), Some("config-server-1"));
    assert_eq!(config.ping_interval(), Duration::from_secs(1));

    // Unspecified values should use defaults
    assert_eq!(config.lock_retry_interval_ms, 500);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
catalog_dir: /var/lib/distlock
future_option: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.catalog_dir, "/var/lib/distlock");
}

#[test]
fn test_invalid_yaml_is_rejected() {
    let result = Config::from_yaml("ping_interval_ms: [not, a, number]");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("failed to parse"));
}

#[test]
fn test_zero_intervals_fail_validation() {
    let err = Config::from_yaml("ping_interval_ms: 0").unwrap_err();
    assert!(err.to_string().contains("ping_interval_ms"));

    let err = Config::from_yaml("lock_retry_interval_ms: 0").unwrap_err();
    assert!(err.to_string().contains("lock_retry_interval_ms"));

    let err = Config::from_yaml("ping_stale_minutes: 0").unwrap_err();
    assert!(err.to_string().contains("ping_stale_minutes"));
}

#[test]
fn test_blank_process_id_fails_validation() {
    let err = Config::from_yaml("process_id: \"  \"").unwrap_err();
    assert!(err.to_string().contains("process_id"));
}

#[test]
fn test_wait_policy_mapping() {
    let mut config = Config::default();

    config.lock_wait_ms = 0;
    assert_eq!(config.wait_policy(), WaitPolicy::TryOnce);

    config.lock_wait_ms = 250;
    assert_eq!(
        config.wait_policy(),
        WaitPolicy::Timeout(Duration::from_millis(250))
    );

    config.lock_wait_ms = -1;
    assert_eq!(config.wait_policy(), WaitPolicy::Forever);
}

#[test]
fn test_resolved_process_id() {
    let mut config = Config::default();
    assert!(!config.resolved_process_id().is_empty());

    config.process_id = Some("shard-a".to_string());
    assert_eq!(config.resolved_process_id(), "shard-a");
}

#[test]
fn test_yaml_round_trip_preserves_values() {
    let config = Config {
        process_id: Some("node-7".to_string()),
        lock_wait_ms: -1,
        ..Config::default()
    };

    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();
    assert_eq!(parsed.process_id.as_deref(), Some("node-7"));
    assert_eq!(parsed.lock_wait_ms, -1);
}

#[test]
fn test_load_or_default_without_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_or_default(temp_dir.path().join("missing.yaml")).unwrap();
    assert_eq!(config.catalog_dir, ".distlock");
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("distlock.yaml");
    std::fs::write(&path, "lock_wait_ms: 0\n").unwrap();

    let config = Config::load_or_default(&path).unwrap();
    assert_eq!(config.wait_policy(), WaitPolicy::TryOnce);
}
