//! Pusher settings - the operator-facing `"Pusher N" -> {label, distance}` map.
//!
//! The settings object is owned by an external form; the engine only reads
//! it. Anything unusable in it is skipped with a warning so a half-edited
//! file never takes the line geometry down.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use super::defaults::PUSHER_COUNT;
use super::ConfigError;

/// One pusher entry as written by the settings form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PusherSetting {
    /// Bucket classification (e.g. "FBA", "Reject Book")
    #[serde(default)]
    pub label: String,

    /// Raw distance value; the form may store numbers or numeric strings.
    #[serde(default)]
    pub distance: serde_json::Value,
}

/// Parsed settings: per-pusher distance overrides and labels.
///
/// `None` entries mean "keep the configured default".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PusherSettings {
    pub distances_cm: [Option<f64>; PUSHER_COUNT],
    pub labels: [Option<String>; PUSHER_COUNT],
}

impl PusherSettings {
    /// Build from the raw `"Pusher N"` map.
    pub fn from_map(raw: &BTreeMap<String, PusherSetting>) -> Self {
        let mut settings = Self::default();

        for (name, entry) in raw {
            let Some(index) = pusher_index_from_name(name) else {
                warn!(key = %name, "Ignoring unknown pusher settings key");
                continue;
            };

            match parse_distance(&entry.distance) {
                Some(d) => settings.distances_cm[index] = Some(d),
                None if entry.distance.is_null() => {}
                None => {
                    warn!(pusher = %name, value = %entry.distance, "Ignoring invalid pusher distance");
                }
            }

            let label = entry.label.trim();
            if !label.is_empty() {
                settings.labels[index] = Some(label.to_string());
            }
        }

        settings
    }

    /// Parse a settings JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, PusherSetting> = serde_json::from_str(json)?;
        Ok(Self::from_map(&raw))
    }

    /// Read a settings JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_json_str(&contents).map_err(|e| ConfigError::Json(path.to_path_buf(), e))
    }

    /// Overlay the distances onto a base distance table.
    pub fn apply_to(&self, base: &[f64; PUSHER_COUNT]) -> [f64; PUSHER_COUNT] {
        let mut out = *base;
        for (slot, over) in out.iter_mut().zip(self.distances_cm.iter()) {
            if let Some(d) = over {
                *slot = *d;
            }
        }
        out
    }

    /// Number of pushers with a distance override.
    pub fn overrides(&self) -> usize {
        self.distances_cm.iter().filter(|d| d.is_some()).count()
    }
}

/// `"Pusher 3"` -> `Some(2)`; anything outside `Pusher 1..=8` -> `None`.
pub fn pusher_index_from_name(name: &str) -> Option<usize> {
    let number: usize = name.trim().strip_prefix("Pusher")?.trim().parse().ok()?;
    (1..=PUSHER_COUNT).contains(&number).then(|| number - 1)
}

/// Accept finite positive numbers or numeric strings.
fn parse_distance(value: &serde_json::Value) -> Option<f64> {
    let d = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (d.is_finite() && d > 0.0).then_some(d)
}
