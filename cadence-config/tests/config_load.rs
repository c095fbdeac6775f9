use cadence_common::ActionKind;
use cadence_common::observability::LogFormat;
use cadence_config::CadenceConfigLoader;
use serial_test::serial;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
limits:
  connection_request:
    hourly_max: 6
    daily_max: 30
    cooldown_secs: 900
  comment:
    min_interval_secs: 300
scheduler:
  timezone: "${CADENCE_TEST_TIMEZONE}"
  work_hours_start: 8
  work_hours_end: 17
business_hours:
  enabled: true
ledger_caps:
  max_connections_per_day: 20
logging:
  level: debug
  format: json
"#;

#[test]
#[serial]
fn loads_file_with_expansion_and_overrides() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "cadence.yaml", FILE_YAML);

    let config = temp_env::with_var("CADENCE_TEST_TIMEZONE", Some("America/Chicago"), || {
        CadenceConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load config")
    });

    assert_eq!(config.scheduler.timezone, "America/Chicago");
    assert_eq!(config.scheduler.work_hours_start, 8);
    assert!(config.business_hours.enabled);
    assert_eq!(config.business_hours.start_hour, 9);
    assert_eq!(config.ledger_caps.max_connections_per_day, 20);
    assert_eq!(config.ledger_caps.max_messages_per_day, 80);
    assert_eq!(config.logging.format, LogFormat::Json);

    let limits = config.effective_limits();
    let connect = limits[&ActionKind::ConnectionRequest];
    assert_eq!((connect.hourly_max, connect.daily_max), (6, 30));
    assert_eq!(connect.cooldown_duration, Duration::from_secs(900));
    assert_eq!(connect.cooldown_after, 5);
    assert_eq!(limits[&ActionKind::Comment].min_interval, Duration::from_secs(300));
}

#[test]
#[serial]
fn environment_wins_over_the_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "cadence.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("CADENCE_TEST_TIMEZONE", Some("UTC")),
            ("CADENCE_LIMITS__CONNECTION_REQUEST__HOURLY_MAX", Some("2")),
            ("CADENCE_LEDGER_CAPS__MAX_MESSAGES_PER_DAY", Some("10")),
            ("CADENCE_LOGGING__STDERR", Some("true")),
        ],
        || CadenceConfigLoader::new().with_file(&p).load(),
    )
    .expect("load config");

    let connect = config.effective_limits()[&ActionKind::ConnectionRequest];
    assert_eq!(connect.hourly_max, 2);
    assert_eq!(connect.daily_max, 30);
    assert_eq!(config.ledger_caps.max_messages_per_day, 10);
    assert!(config.logging.stderr);
}

#[test]
#[serial]
fn missing_optional_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = CadenceConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");
    assert_eq!(config.scheduler.timezone, "UTC");
    assert!(!config.business_hours.enabled);
    assert!(config.limits.is_empty());
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = CadenceConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn invalid_limits_are_rejected_at_load() {
    let err = CadenceConfigLoader::new()
        .with_yaml_str("limits:\n  like:\n    hourly_max: 500\n")
        .load()
        .unwrap_err();
    assert!(err.to_string().contains("hourly_max"), "{err}");
}

#[test]
#[serial]
fn unknown_action_kind_is_rejected() {
    let result = CadenceConfigLoader::new()
        .with_yaml_str("limits:\n  teleport:\n    hourly_max: 1\n")
        .load();
    assert!(result.is_err());
}
