//! Position Mapping Module
//!
//! Pure geometry: belt cm <-> spatial coordinates, time -> position
//! extrapolation, and the coarse position-id scale used by the line.
//!
//! - `cm_to_spatial()` / `spatial_to_cm()` - renderer axis conversion
//! - `extrapolate_position_cm()` - distance travelled since start time
//! - `BeltGeometry` - effective distances, thresholds and fixtures

mod geometry;
mod mapping;
pub mod position_id;

pub use geometry::{BeltGeometry, Fixtures};
pub use mapping::{cm_to_spatial, extrapolate_position_cm, spatial_to_cm, travel_time_secs};
pub use position_id::{cm_to_position_id, position_id_to_cm, pusher_position_id};
