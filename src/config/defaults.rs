//! System-wide default constants.
//!
//! Centralises the physical constants of the sorting line and the engine
//! timings. Grouped by subsystem for easy discovery.

// ============================================================================
// Belt Physics
// ============================================================================

/// Belt speed (cm/s) measured on the physical line.
pub const BELT_SPEED_CM_PER_SEC: f64 = 32.1;

/// Number of diversion pushers (and buckets) on the line.
pub const PUSHER_COUNT: usize = 8;

/// Factory pusher distances from the photo-eye (cm), indexed by pusher - 1.
///
/// Not sorted: pusher 4 sits before pusher 3 on the physical line.
pub const PUSHER_DISTANCES_CM: [f64; PUSHER_COUNT] =
    [222.0, 313.0, 464.0, 380.0, 607.0, 710.0, 850.0, 972.0];

/// Belt length ahead of the photo-eye reserved for the scanner (cm).
pub const START_BUFFER_CM: f64 = 200.0;

/// Belt length after the furthest pusher (cm).
pub const END_BUFFER_CM: f64 = 200.0;

/// Scanner location relative to the photo-eye (cm). Negative = upstream.
pub const SCANNER_POSITION_CM: f64 = -50.0;

/// Pusher used for items that reach the end of the belt unassigned.
pub const OVERFLOW_PUSHER: u8 = 8;

// ============================================================================
// Event Trigger
// ============================================================================

/// Half-width of the photo-eye detection zone (cm).
pub const PHOTO_EYE_WINDOW_CM: f64 = 5.0;

/// Distance before the pusher at which activation fires (cm).
///
/// One tenth of a second of belt travel at 32.1 cm/s.
pub const ACTIVATION_OFFSET_CM: f64 = 3.21;

/// Minimum interval between two firings of the same discrete event (ms).
pub const DEBOUNCE_MS: u64 = 200;

/// Diversion animation length: 600 ms push + 400 ms fall (seconds).
pub const DIVERSION_SECS: f64 = 1.0;

/// Grace period between diversion settling and item removal (seconds).
pub const REMOVAL_GRACE_SECS: f64 = 0.5;

// ============================================================================
// Position Ids
// ============================================================================

/// Lowest position id reported by the line.
pub const POSITION_ID_MIN: u32 = 101;

/// Highest position id reported by the line.
pub const POSITION_ID_MAX: u32 = 150;

/// Fixed pusher -> position id table, indexed by pusher - 1.
pub const PUSHER_POSITION_IDS: [u32; PUSHER_COUNT] = [109, 113, 119, 116, 125, 129, 135, 140];

/// Minimum tracking range used by the distance -> position id mapping (cm).
pub const MIN_TRACKING_RANGE_CM: f64 = 1200.0;

/// Tracking range as a multiple of the furthest pusher distance.
pub const TRACKING_RANGE_FACTOR: f64 = 1.25;

// ============================================================================
// Runtime
// ============================================================================

/// Tick interval of the simulation loop (ms).
pub const TICK_INTERVAL_MS: u64 = 100;

/// Interval between settings file mtime checks (seconds).
pub const SETTINGS_POLL_SECS: u64 = 2;

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Emit a tick summary log line every N ticks.
pub const TICK_SUMMARY_EVERY: u64 = 50;
