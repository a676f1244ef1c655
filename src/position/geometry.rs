//! Derived belt geometry.
//!
//! Built from [`ConveyorConfig`] with the operator's [`PusherSettings`]
//! overlaid. Rebuilt whenever settings change; everything downstream reads
//! distances and thresholds from here.

use serde::Serialize;

use super::mapping::cm_to_spatial;
use crate::config::defaults::{OVERFLOW_PUSHER, PUSHER_COUNT, SCANNER_POSITION_CM};
use crate::config::{ConveyorConfig, PusherSettings};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeltGeometry {
    pub speed_cm_per_sec: f64,
    pub start_buffer_cm: f64,
    pub end_buffer_cm: f64,

    /// Effective pusher distances (cm), pusher 1 first.
    pub pusher_distances_cm: [f64; PUSHER_COUNT],

    /// Bucket labels from settings.
    pub pusher_labels: [Option<String>; PUSHER_COUNT],

    pub photo_eye_window_cm: f64,
    pub activation_offset_cm: f64,

    /// Furthest pusher distance (cm).
    pub max_pusher_distance_cm: f64,

    /// start_buffer + max distance + end_buffer (cm).
    pub belt_length_cm: f64,

    /// Downstream end of the belt in belt cm; unassigned items overflow here.
    pub end_of_belt_cm: f64,
}

impl BeltGeometry {
    pub fn from_config(config: &ConveyorConfig) -> Self {
        Self::with_settings(config, &PusherSettings::default())
    }

    pub fn with_settings(config: &ConveyorConfig, settings: &PusherSettings) -> Self {
        let belt = &config.belt;
        let distances = settings.apply_to(&belt.pusher_distances_cm);
        let max_distance = distances.iter().copied().fold(0.0_f64, f64::max);

        Self {
            speed_cm_per_sec: belt.speed_cm_per_sec,
            start_buffer_cm: belt.start_buffer_cm,
            end_buffer_cm: belt.end_buffer_cm,
            pusher_distances_cm: distances,
            pusher_labels: settings.labels.clone(),
            photo_eye_window_cm: config.trigger.photo_eye_window_cm,
            activation_offset_cm: config.trigger.activation_offset_cm,
            max_pusher_distance_cm: max_distance,
            belt_length_cm: belt.start_buffer_cm + max_distance + belt.end_buffer_cm,
            end_of_belt_cm: max_distance + belt.end_buffer_cm,
        }
    }

    /// Distance of pusher `1..=8`; `None` for anything else.
    pub fn pusher_distance(&self, pusher: u8) -> Option<f64> {
        Self::index(pusher).map(|i| self.pusher_distances_cm[i])
    }

    pub fn pusher_label(&self, pusher: u8) -> Option<&str> {
        Self::index(pusher).and_then(|i| self.pusher_labels[i].as_deref())
    }

    /// Position at which the pusher fires for an item bound for `target_cm`.
    pub fn activation_threshold(&self, target_cm: f64) -> f64 {
        target_cm - self.activation_offset_cm
    }

    /// Activation threshold of each pusher at its configured distance.
    pub fn activation_thresholds(&self) -> [f64; PUSHER_COUNT] {
        self.pusher_distances_cm.map(|d| self.activation_threshold(d))
    }

    /// `-window <= cm <= window`.
    pub fn in_photo_eye_zone(&self, cm: f64) -> bool {
        (-self.photo_eye_window_cm..=self.photo_eye_window_cm).contains(&cm)
    }

    pub fn is_valid_pusher(pusher: u8) -> bool {
        Self::index(pusher).is_some()
    }

    pub fn overflow_pusher() -> u8 {
        OVERFLOW_PUSHER
    }

    /// Spatial coordinates of the fixtures drawn along the belt.
    pub fn fixtures(&self) -> Fixtures {
        Fixtures {
            scanner: cm_to_spatial(SCANNER_POSITION_CM, self),
            photo_eye: cm_to_spatial(0.0, self),
            pushers: self.pusher_distances_cm.map(|d| cm_to_spatial(d, self)),
            belt_start: cm_to_spatial(-self.start_buffer_cm, self),
            belt_end: cm_to_spatial(self.end_of_belt_cm, self),
        }
    }

    fn index(pusher: u8) -> Option<usize> {
        let i = usize::from(pusher).checked_sub(1)?;
        (i < PUSHER_COUNT).then_some(i)
    }
}

/// Spatial positions of the belt fixtures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixtures {
    pub scanner: f64,
    pub photo_eye: f64,
    pub pushers: [f64; PUSHER_COUNT],
    pub belt_start: f64,
    pub belt_end: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry() {
        let g = BeltGeometry::from_config(&ConveyorConfig::default());
        assert_eq!(g.max_pusher_distance_cm, 972.0);
        assert_eq!(g.belt_length_cm, 1372.0);
        assert_eq!(g.end_of_belt_cm, 1172.0);
        assert_eq!(g.pusher_distance(2), Some(313.0));
        assert_eq!(g.pusher_distance(0), None);
        assert_eq!(g.pusher_distance(9), None);
        assert!((g.activation_threshold(313.0) - 309.79).abs() < 1e-9);
    }

    #[test]
    fn settings_override_distances_and_length() {
        let mut settings = PusherSettings::default();
        settings.distances_cm[7] = Some(1100.0);
        settings.labels[0] = Some("FBA".into());
        let g = BeltGeometry::with_settings(&ConveyorConfig::default(), &settings);
        assert_eq!(g.max_pusher_distance_cm, 1100.0);
        assert_eq!(g.belt_length_cm, 1500.0);
        assert_eq!(g.pusher_label(1), Some("FBA"));
        assert_eq!(g.pusher_label(2), None);
    }

    #[test]
    fn photo_eye_zone_is_inclusive() {
        let g = BeltGeometry::from_config(&ConveyorConfig::default());
        assert!(g.in_photo_eye_zone(-5.0));
        assert!(g.in_photo_eye_zone(0.0));
        assert!(g.in_photo_eye_zone(5.0));
        assert!(!g.in_photo_eye_zone(5.01));
    }

    #[test]
    fn fixtures_are_ordered_along_belt() {
        let g = BeltGeometry::from_config(&ConveyorConfig::default());
        let f = g.fixtures();
        assert!(f.belt_start < f.scanner);
        assert!(f.scanner < f.photo_eye);
        assert!(f.photo_eye < f.pushers[0]);
        assert!(f.pushers[7] < f.belt_end);
        assert!((f.photo_eye - (200.0 - 686.0)).abs() < 1e-9);
    }
}
