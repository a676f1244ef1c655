//! Coarse position ids (101..=150) reported by the line controller.

use crate::config::defaults::{
    MIN_TRACKING_RANGE_CM, POSITION_ID_MAX, POSITION_ID_MIN, PUSHER_POSITION_IDS,
    TRACKING_RANGE_FACTOR,
};

const ID_SPAN: u32 = POSITION_ID_MAX - POSITION_ID_MIN;

/// Id used when a pusher number is outside the table.
const FALLBACK_PUSHER_ID: u32 = 140;

/// Map a position id linearly onto 0..=max_distance. Out-of-range ids -> `None`.
pub fn position_id_to_cm(id: u32, max_distance_cm: f64) -> Option<f64> {
    if !(POSITION_ID_MIN..=POSITION_ID_MAX).contains(&id) {
        return None;
    }
    let normalized = f64::from(id - POSITION_ID_MIN) / f64::from(ID_SPAN);
    Some(normalized * max_distance_cm)
}

/// Tracking range used for the distance -> id direction.
pub fn tracking_range_cm(max_distance_cm: f64) -> f64 {
    (max_distance_cm * TRACKING_RANGE_FACTOR).max(MIN_TRACKING_RANGE_CM)
}

/// Map a belt distance onto the id range, clamped to 101..=150.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cm_to_position_id(distance_cm: f64, max_distance_cm: f64) -> u32 {
    let normalized = (distance_cm / tracking_range_cm(max_distance_cm)).clamp(0.0, 1.0);
    if normalized.is_nan() {
        return POSITION_ID_MIN;
    }
    let offset = (normalized * f64::from(ID_SPAN)).floor() as u32;
    (POSITION_ID_MIN + offset).min(POSITION_ID_MAX)
}

/// Fixed id of each pusher's station.
pub fn pusher_position_id(pusher: u8) -> u32 {
    usize::from(pusher)
        .checked_sub(1)
        .and_then(|i| PUSHER_POSITION_IDS.get(i).copied())
        .unwrap_or(FALLBACK_PUSHER_ID)
}
