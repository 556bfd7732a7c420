use std::io::Write;
use std::time::Duration;

use sprint_vision::{DetectionZone, EngineConfig, EngineError, ZoneBounds};
use tempfile::NamedTempFile;

fn no_env(_: &str) -> Option<String> {
    None
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let file = write_config(
        r#"
        sensitivity = 55.0
        motion_threshold_percent = 8.0
        cooldown_ms = 400

        [zone]
        x = 10.0
        y = 30.0
        width = 50.0
        height = 25.0
        "#,
    );

    let cfg = EngineConfig::load_with(Some(file.path()), |key| match key {
        "SPRINT_COOLDOWN_MS" => Some("650".to_string()),
        _ => None,
    })
    .expect("load config");

    assert_eq!(cfg.sensitivity, 55.0);
    assert_eq!(cfg.motion_threshold_percent, 8.0);
    assert_eq!(cfg.cooldown, Duration::from_millis(650));
    assert_eq!(cfg.zone, DetectionZone::new(10.0, 30.0, 50.0, 25.0));
    assert_eq!(cfg.zone_bounds, ZoneBounds::default());
}

#[test]
fn zone_from_file_is_saturated_into_bounds() {
    let file = write_config(
        r#"
        [zone]
        x = 90.0
        y = 0.0
        width = 95.0
        height = 5.0

        [zone_bounds]
        min_width = 20.0
        max_width = 80.0
        min_height = 10.0
        max_height = 50.0
        "#,
    );

    let cfg = EngineConfig::load_with(Some(file.path()), no_env).expect("load config");

    assert_eq!(cfg.zone.width, 80.0);
    assert_eq!(cfg.zone.height, 10.0);
    assert_eq!(cfg.zone.x, 5.0);
    assert!(cfg.zone.x + cfg.zone.width <= 100.0);
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_config("sensitivty = 40.0\n");
    let err = EngineConfig::load_with(Some(file.path()), no_env).unwrap_err();
    assert!(matches!(err, EngineError::Config(msg) if msg.contains("invalid config file")));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");
    let err = EngineConfig::load_with(Some(&path), no_env).unwrap_err();
    assert!(matches!(err, EngineError::Config(msg) if msg.contains("failed to read")));
}
