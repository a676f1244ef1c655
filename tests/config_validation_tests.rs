//! Config Validation Tests
//!
//! Typo detection on `beltsync.toml`, range validation of belt and trigger
//! values, and pusher settings parsing, exercised through the public API.

use std::io::Write;

use beltsync::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use beltsync::config::{ConfigError, ConveyorConfig, PusherSettings};
use beltsync::position::BeltGeometry;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_belt_speed_warns_with_suggestion() {
    let toml_str = r"
[belt]
sped_cm_per_sec = 30.0
";
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("sped_cm_per_sec"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("belt.speed_cm_per_sec")
    );
}

#[test]
fn typo_in_trigger_section_warns() {
    let toml_str = r"
[trigger]
debounce_sm = 150
";
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("trigger.debounce_ms"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[belt]
speed_cm_per_sec = 32.1
start_buffer_cm = 200.0
end_buffer_cm = 200.0
pusher_distances_cm = [222.0, 313.0, 464.0, 380.0, 607.0, 710.0, 850.0, 972.0]

[trigger]
photo_eye_window_cm = 5.0
activation_offset_cm = 3.21
debounce_ms = 200
diversion_secs = 1.0
removal_grace_secs = 0.5

[runtime]
tick_interval_ms = 100
settings_path = "pushers.json"
settings_poll_secs = 2

[server]
addr = "127.0.0.1:9090"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let config = ConveyorConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.server.addr, "127.0.0.1:9090");
}

#[test]
fn unrelated_key_gets_no_suggestion() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("completely_unrelated_option", &known), None);
}

#[test]
fn unknown_keys_do_not_block_loading() {
    let config = ConveyorConfig::from_toml_str("[belt]\nsped_cm_per_sec = 30.0\n").unwrap();
    assert_eq!(config, ConveyorConfig::default());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn zero_speed_rejected() {
    let err = ConveyorConfig::from_toml_str("[belt]\nspeed_cm_per_sec = 0.0\n").unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("belt.speed_cm_per_sec")));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn every_bad_value_is_reported() {
    let mut config = ConveyorConfig::default();
    config.belt.pusher_distances_cm[4] = -1.0;
    config.trigger.activation_offset_cm = f64::NAN;
    config.runtime.tick_interval_ms = 0;

    let Err(ConfigError::Validation(errors)) = config.validate() else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 3, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("pusher_distances_cm[4]")));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = ConveyorConfig::from_toml_str("[belt\nspeed = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
}

#[test]
fn config_file_on_disk_round_trips_through_loader() {
    let mut config = ConveyorConfig::default();
    config.belt.speed_cm_per_sec = 40.0;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

    let loaded = ConveyorConfig::load_from_file(file.path()).unwrap();
    assert_eq!(loaded.belt.speed_cm_per_sec, 40.0);
}

// ============================================================================
// Pusher Settings
// ============================================================================

#[test]
fn settings_override_distances_and_labels() {
    let settings = PusherSettings::from_json_str(
        r#"{
            "Pusher 1": {"label": "FBA", "distance": "250"},
            "Pusher 8": {"label": "Overflow", "distance": 1000},
            "Pusher 9": {"label": "nope", "distance": 5}
        }"#,
    )
    .unwrap();
    assert_eq!(settings.overrides(), 2);

    let g = BeltGeometry::with_settings(&ConveyorConfig::default(), &settings);
    assert_eq!(g.pusher_distance(1), Some(250.0));
    assert_eq!(g.pusher_distance(2), Some(313.0));
    assert_eq!(g.pusher_label(8), Some("Overflow"));
    assert_eq!(g.max_pusher_distance_cm, 1000.0);
    assert_eq!(g.belt_length_cm, 1400.0);
}

#[test]
fn unusable_settings_distance_keeps_default() {
    let settings = PusherSettings::from_json_str(
        r#"{"Pusher 2": {"label": "Books", "distance": "soon"}, "Pusher 3": {"distance": -4}}"#,
    )
    .unwrap();
    let g = BeltGeometry::with_settings(&ConveyorConfig::default(), &settings);
    assert_eq!(g.pusher_distance(2), Some(313.0));
    assert_eq!(g.pusher_distance(3), Some(464.0));
    assert_eq!(g.pusher_label(2), Some("Books"));
}

#[test]
fn missing_settings_file_is_an_io_error() {
    let err = PusherSettings::load_from_file(std::path::Path::new("/nonexistent/pushers.json"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}
