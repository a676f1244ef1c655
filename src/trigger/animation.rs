//! Stateless animation model.
//!
//! Every animation is a start time plus fixed phase durations. Progress is
//! evaluated from `now` on each tick; nothing is advanced incrementally, so
//! a late or skipped tick never drifts the animation.

use serde::Serialize;

// ============================================================================
// Easing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// 1 - (1-t)^3
    EaseOutCubic,
    /// t^3
    EaseInCubic,
    /// t^2
    EaseInQuad,
    /// 3t^2 - 2t^3
    SmoothStep,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOutCubic => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Self::EaseInCubic => t * t * t,
            Self::EaseInQuad => t * t,
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Eased progress of a phase starting at `start` lasting `duration` seconds.
fn phase(start: f64, duration: f64, now: f64, easing: Easing) -> f64 {
    if duration <= 0.0 {
        return if now >= start { 1.0 } else { 0.0 };
    }
    easing.apply((now - start) / duration)
}

// ============================================================================
// Pusher Stroke
// ============================================================================

const PUSHER_DELAY_SECS: f64 = 0.05;
const PUSHER_EXTEND_SECS: f64 = 0.4;
const PUSHER_HOLD_SECS: f64 = 0.05;
const PUSHER_RETRACT_SECS: f64 = 0.4;

/// One extend / hold / retract cycle of a pusher arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PusherStroke {
    started_at: f64,
}

impl PusherStroke {
    pub fn start(now: f64) -> Self {
        Self { started_at: now }
    }

    pub fn total_secs() -> f64 {
        PUSHER_DELAY_SECS + PUSHER_EXTEND_SECS + PUSHER_HOLD_SECS + PUSHER_RETRACT_SECS
    }

    /// Arm extension 0..=1 at `now`.
    pub fn extension(&self, now: f64) -> f64 {
        let extend_at = self.started_at + PUSHER_DELAY_SECS;
        let retract_at = extend_at + PUSHER_EXTEND_SECS + PUSHER_HOLD_SECS;

        if now < extend_at {
            0.0
        } else if now < retract_at {
            phase(extend_at, PUSHER_EXTEND_SECS, now, Easing::EaseOutCubic)
        } else {
            1.0 - phase(retract_at, PUSHER_RETRACT_SECS, now, Easing::EaseInCubic)
        }
    }

    pub fn is_finished(&self, now: f64) -> bool {
        now - self.started_at >= Self::total_secs()
    }
}

// ============================================================================
// Diversion Path
// ============================================================================

/// Share of the diversion spent pushing sideways; the rest is the fall.
const DIVERSION_PUSH_SHARE: f64 = 0.6;

/// Where a diverted item is along its push-then-fall path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiversionProgress {
    /// Sideways push 0..=1
    pub push: f64,
    /// Drop into the bucket 0..=1
    pub fall: f64,
    /// Overall 0..=1
    pub overall: f64,
}

/// Evaluate the diversion of an item that entered `routing` at `started_at`.
pub fn diversion_progress(started_at: f64, duration_secs: f64, now: f64) -> DiversionProgress {
    let push_secs = duration_secs * DIVERSION_PUSH_SHARE;
    let fall_secs = duration_secs - push_secs;
    let push = phase(started_at, push_secs, now, Easing::EaseOutCubic);
    let fall = if now < started_at + push_secs {
        0.0
    } else {
        phase(started_at + push_secs, fall_secs, now, Easing::EaseInQuad)
    };
    DiversionProgress {
        push,
        fall,
        overall: phase(started_at, duration_secs, now, Easing::Linear),
    }
}

// ============================================================================
// Beam Flash
// ============================================================================

const BEAM_HOLD_SECS: f64 = 0.3;
const BEAM_FADE_SECS: f64 = 0.2;

/// Photo-eye beam flash: full intensity for the hold, then a fade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamFlash {
    started_at: f64,
}

impl BeamFlash {
    pub fn start(now: f64) -> Self {
        Self { started_at: now }
    }

    pub fn intensity(&self, now: f64) -> f64 {
        let fade_at = self.started_at + BEAM_HOLD_SECS;
        if now < self.started_at {
            0.0
        } else if now < fade_at {
            1.0
        } else {
            1.0 - phase(fade_at, BEAM_FADE_SECS, now, Easing::SmoothStep)
        }
    }

    pub fn is_finished(&self, now: f64) -> bool {
        now - self.started_at >= BEAM_HOLD_SECS + BEAM_FADE_SECS
    }
}
