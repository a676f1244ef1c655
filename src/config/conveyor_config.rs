//! Conveyor Configuration - belt physics and engine timings as TOML values
//!
//! Each struct implements `Default` with the values measured on the line,
//! so the engine runs unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a sorting line deployment.
///
/// Load with `ConveyorConfig::load()` which searches:
/// 1. `$BELTSYNC_CONFIG` env var
/// 2. `./beltsync.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConveyorConfig {
    /// Belt geometry and speed
    #[serde(default)]
    pub belt: BeltConfig,

    /// Event trigger thresholds and timings
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Tick loop and settings file handling
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl ConveyorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$BELTSYNC_CONFIG` environment variable
    /// 2. `./beltsync.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("BELTSYNC_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded conveyor config from BELTSYNC_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from BELTSYNC_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "BELTSYNC_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("beltsync.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded conveyor config from ./beltsync.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./beltsync.toml, using defaults");
                }
            }
        }

        info!("No beltsync.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for physical plausibility.
    ///
    /// Every violation is collected so the operator sees the full list at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let b = &self.belt;
        let t = &self.trigger;

        Self::check_positive(b.speed_cm_per_sec, "belt.speed_cm_per_sec", &mut errors);
        Self::check_non_negative(b.start_buffer_cm, "belt.start_buffer_cm", &mut errors);
        Self::check_non_negative(b.end_buffer_cm, "belt.end_buffer_cm", &mut errors);
        for (i, d) in b.pusher_distances_cm.iter().enumerate() {
            Self::check_positive(*d, &format!("belt.pusher_distances_cm[{i}]"), &mut errors);
        }

        Self::check_non_negative(t.photo_eye_window_cm, "trigger.photo_eye_window_cm", &mut errors);
        Self::check_non_negative(t.activation_offset_cm, "trigger.activation_offset_cm", &mut errors);
        Self::check_non_negative(t.diversion_secs, "trigger.diversion_secs", &mut errors);
        Self::check_non_negative(t.removal_grace_secs, "trigger.removal_grace_secs", &mut errors);

        if self.runtime.tick_interval_ms == 0 {
            errors.push("runtime.tick_interval_ms must be > 0".to_string());
        }
        if self.runtime.settings_poll_secs == 0 {
            errors.push("runtime.settings_poll_secs must be > 0".to_string());
        }
        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} must be a finite number > 0 (got {value})"));
        }
    }

    fn check_non_negative(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("{name} must be a finite number >= 0 (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),

    #[error("Settings JSON error ({}): {}", .0.display(), .1)]
    Json(PathBuf, serde_json::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Belt
// ============================================================================

/// Physical belt description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeltConfig {
    /// Belt speed (cm/s)
    #[serde(default = "default_speed")]
    pub speed_cm_per_sec: f64,

    /// Space before the photo-eye (cm)
    #[serde(default = "default_start_buffer")]
    pub start_buffer_cm: f64,

    /// Space after the furthest pusher (cm)
    #[serde(default = "default_end_buffer")]
    pub end_buffer_cm: f64,

    /// Distance of each pusher from the photo-eye (cm), pusher 1 first.
    #[serde(default = "default_pusher_distances")]
    pub pusher_distances_cm: [f64; defaults::PUSHER_COUNT],
}

fn default_speed() -> f64 {
    defaults::BELT_SPEED_CM_PER_SEC
}
fn default_start_buffer() -> f64 {
    defaults::START_BUFFER_CM
}
fn default_end_buffer() -> f64 {
    defaults::END_BUFFER_CM
}
fn default_pusher_distances() -> [f64; defaults::PUSHER_COUNT] {
    defaults::PUSHER_DISTANCES_CM
}

impl Default for BeltConfig {
    fn default() -> Self {
        Self {
            speed_cm_per_sec: default_speed(),
            start_buffer_cm: default_start_buffer(),
            end_buffer_cm: default_end_buffer(),
            pusher_distances_cm: default_pusher_distances(),
        }
    }
}

// ============================================================================
// Trigger
// ============================================================================

/// Thresholds and timings of the physical-event state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerConfig {
    /// Photo-eye zone half width (cm)
    #[serde(default = "default_photo_eye_window")]
    pub photo_eye_window_cm: f64,

    /// Pusher fires this far before its distance (cm)
    #[serde(default = "default_activation_offset")]
    pub activation_offset_cm: f64,

    /// Minimum spacing between repeated firings of one event (ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Time an item spends in `routing` before it is reported diverted (s)
    #[serde(default = "default_diversion_secs")]
    pub diversion_secs: f64,

    /// Time a `completed` item stays before removal (s)
    #[serde(default = "default_removal_grace_secs")]
    pub removal_grace_secs: f64,
}

fn default_photo_eye_window() -> f64 {
    defaults::PHOTO_EYE_WINDOW_CM
}
fn default_activation_offset() -> f64 {
    defaults::ACTIVATION_OFFSET_CM
}
fn default_debounce_ms() -> u64 {
    defaults::DEBOUNCE_MS
}
fn default_diversion_secs() -> f64 {
    defaults::DIVERSION_SECS
}
fn default_removal_grace_secs() -> f64 {
    defaults::REMOVAL_GRACE_SECS
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            photo_eye_window_cm: default_photo_eye_window(),
            activation_offset_cm: default_activation_offset(),
            debounce_ms: default_debounce_ms(),
            diversion_secs: default_diversion_secs(),
            removal_grace_secs: default_removal_grace_secs(),
        }
    }
}

// ============================================================================
// Runtime
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Tick interval of the simulation loop (ms)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Pusher settings JSON file (`"Pusher N" -> {label, distance}`)
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// Settings file mtime poll interval (s)
    #[serde(default = "default_settings_poll")]
    pub settings_poll_secs: u64,
}

fn default_tick_interval() -> u64 {
    defaults::TICK_INTERVAL_MS
}
fn default_settings_poll() -> u64 {
    defaults::SETTINGS_POLL_SECS
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            settings_path: None,
            settings_poll_secs: default_settings_poll(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = ConveyorConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: ConveyorConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.belt.speed_cm_per_sec, 32.1);
        assert_eq!(config.belt.pusher_distances_cm[7], 972.0);
        assert_eq!(config.trigger.activation_offset_cm, 3.21);
        assert_eq!(config.trigger.debounce_ms, 200);
        assert_eq!(config.runtime.tick_interval_ms, 100);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[belt]
speed_cm_per_sec = 40.0

[trigger]
photo_eye_window_cm = 8.0
"#;
        let config = ConveyorConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.belt.speed_cm_per_sec, 40.0);
        assert_eq!(config.trigger.photo_eye_window_cm, 8.0);
        // Untouched values keep their defaults
        assert_eq!(config.belt.start_buffer_cm, 200.0);
        assert_eq!(config.trigger.activation_offset_cm, 3.21);
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = ConveyorConfig::default();
        config.belt.speed_cm_per_sec = 0.0;
        config.belt.pusher_distances_cm[2] = f64::NAN;
        config.runtime.tick_interval_ms = 0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "got {errors:?}");
                assert!(errors.iter().any(|e| e.contains("speed_cm_per_sec")));
                assert!(errors.iter().any(|e| e.contains("pusher_distances_cm[2]")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_buffer_rejected() {
        let toml_str = r#"
[belt]
end_buffer_cm = -10.0
"#;
        assert!(matches!(
            ConveyorConfig::from_toml_str(toml_str),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = ConveyorConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        assert!(toml_str.contains("[belt]"));
        assert!(toml_str.contains("[trigger]"));
        let back: ConveyorConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, back);
    }

    #[test]
    fn test_load_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beltsync.toml");
        std::fs::write(&path, "[belt\nspeed = ").unwrap();
        let err = ConveyorConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("beltsync.toml"), "got: {err}");
    }
}
