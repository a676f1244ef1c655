//! Event Trigger Module
//!
//! The physical-event state machine run once per tick, the debounce policy
//! shared by every discrete event, and the time-evaluated animations
//! (pusher stroke, diversion, photo-eye beam).

pub mod animation;
pub mod debounce;
mod event_trigger;

pub use animation::{BeamFlash, DiversionProgress, Easing, PusherStroke};
pub use debounce::DebouncePolicy;
pub use event_trigger::{EventTrigger, TriggerStats};
