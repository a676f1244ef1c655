//! Belt coordinate conversions and position extrapolation.
//!
//! Two coordinate systems are in play:
//! - belt cm: distance downstream of the photo-eye (0 = photo-eye)
//! - spatial: renderer axis centred on the belt, in the same units
//!
//! Formula: spatial = cm + start_buffer - belt_length / 2

use super::BeltGeometry;

/// Convert belt cm to the renderer's spatial axis.
pub fn cm_to_spatial(cm: f64, geometry: &BeltGeometry) -> f64 {
    cm + geometry.start_buffer_cm - geometry.belt_length_cm / 2.0
}

/// Inverse of [`cm_to_spatial`].
pub fn spatial_to_cm(spatial: f64, geometry: &BeltGeometry) -> f64 {
    spatial - geometry.start_buffer_cm + geometry.belt_length_cm / 2.0
}

/// Estimate how far an item has travelled since `start_time`.
///
/// Formula: max(0, (now - start_time) × speed)
///
/// Clamped at zero so clock skew between backend and client never puts an
/// item upstream of the photo-eye.
pub fn extrapolate_position_cm(start_time: f64, now: f64, speed_cm_per_sec: f64) -> f64 {
    let elapsed = now - start_time;
    if !elapsed.is_finite() || elapsed <= 0.0 {
        return 0.0;
    }
    elapsed * speed_cm_per_sec
}

/// Seconds of belt travel needed to cover `distance_cm`.
pub fn travel_time_secs(distance_cm: f64, speed_cm_per_sec: f64) -> f64 {
    if speed_cm_per_sec <= 0.0 {
        return f64::INFINITY;
    }
    distance_cm / speed_cm_per_sec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConveyorConfig;

    fn geometry() -> BeltGeometry {
        BeltGeometry::from_config(&ConveyorConfig::default())
    }

    #[test]
    fn spatial_round_trips_through_cm() {
        let g = geometry();
        for cm in [-50.0, 0.0, 222.0, 972.0] {
            let back = spatial_to_cm(cm_to_spatial(cm, &g), &g);
            assert!((back - cm).abs() < 1e-9);
        }
    }

    #[test]
    fn belt_is_centred_on_spatial_origin() {
        let g = geometry();
        // belt spans -start_buffer ..= max + end_buffer in cm
        let upstream = cm_to_spatial(-g.start_buffer_cm, &g);
        let downstream = cm_to_spatial(g.end_of_belt_cm, &g);
        assert!((upstream + downstream).abs() < 1e-9);
        assert!((downstream - upstream - g.belt_length_cm).abs() < 1e-9);
    }

    #[test]
    fn extrapolation_is_linear_in_time() {
        assert!((extrapolate_position_cm(100.0, 110.0, 32.1) - 321.0).abs() < 1e-9);
        assert_eq!(extrapolate_position_cm(100.0, 99.0, 32.1), 0.0);
        assert_eq!(extrapolate_position_cm(100.0, 100.0, 32.1), 0.0);
    }

    #[test]
    fn extrapolation_is_monotonic() {
        let mut last = 0.0;
        for step in 0..200 {
            let now = 50.0 + f64::from(step) * 0.1;
            let pos = extrapolate_position_cm(50.0, now, 32.1);
            assert!(pos >= last);
            last = pos;
        }
    }

    #[test]
    fn travel_time_inverts_speed() {
        assert!((travel_time_secs(321.0, 32.1) - 10.0).abs() < 1e-9);
        assert!(travel_time_secs(1.0, 0.0).is_infinite());
    }
}
