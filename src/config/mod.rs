//! Conveyor Configuration Module
//!
//! Belt physics, trigger thresholds and runtime settings loaded from TOML,
//! plus the operator's pusher settings (JSON) and a watcher that reports
//! settings changes while the engine runs.
//!
//! ## Loading Order
//!
//! 1. `BELTSYNC_CONFIG` environment variable (path to TOML file)
//! 2. `beltsync.toml` in the current working directory
//! 3. Built-in defaults (the values measured on the line)
//!
//! Geometry never blocks on configuration: until settings arrive the engine
//! runs on the defaults in [`defaults`].

mod conveyor_config;
mod settings;
pub mod defaults;
pub mod validation;
pub mod watcher;

pub use conveyor_config::*;
pub use settings::{pusher_index_from_name, PusherSetting, PusherSettings};
pub use watcher::SettingsEvent;
