//! Collaborator callbacks for renderers and table views.

use tracing::{debug, info};

use super::engine::TickFrame;
use crate::config::defaults::TICK_SUMMARY_EVERY;
use crate::types::BeltEvent;

/// Receives every tick frame and each discrete event.
///
/// All methods default to no-ops so an observer only implements what it
/// draws. Pass `()` when nothing is listening.
pub trait BeltObserver: Send + 'static {
    fn on_tick(&mut self, _frame: &TickFrame) {}
    fn on_photo_eye_detect(&mut self, _barcode: &str) {}
    fn on_pusher_activate(&mut self, _pusher: u8, _barcode: &str) {}
    fn on_item_diverted(&mut self, _barcode: &str, _pusher: u8) {}
    fn on_item_removed(&mut self, _barcode: &str) {}
}

impl BeltObserver for () {}

/// Deliver a frame: its events in firing order, then the frame itself.
pub fn dispatch_frame(observer: &mut dyn BeltObserver, frame: &TickFrame) {
    for event in &frame.events {
        match event {
            BeltEvent::PhotoEyeDetected { barcode } => observer.on_photo_eye_detect(barcode),
            BeltEvent::PusherActivated { pusher, barcode } => {
                observer.on_pusher_activate(*pusher, barcode);
            }
            BeltEvent::ItemDiverted { barcode, pusher } => observer.on_item_diverted(barcode, *pusher),
            BeltEvent::ItemRemoved { barcode, .. } => observer.on_item_removed(barcode),
        }
    }
    observer.on_tick(frame);
}

// ============================================================================
// Tracing Observer
// ============================================================================

/// Logs every event at info and a periodic tick summary at debug.
pub struct TracingObserver {
    summary_every: u64,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self {
            summary_every: TICK_SUMMARY_EVERY,
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl BeltObserver for TracingObserver {
    fn on_tick(&mut self, frame: &TickFrame) {
        if self.summary_every > 0 && frame.tick % self.summary_every == 0 {
            debug!(
                tick = frame.tick,
                items = frame.items.len(),
                pending = frame.counts.pending,
                progress = frame.counts.progress,
                routing = frame.counts.routing,
                completed = frame.counts.completed,
                "Tick summary"
            );
        }
    }

    fn on_photo_eye_detect(&mut self, barcode: &str) {
        info!(barcode = %barcode, "Photo-eye detected item");
    }

    fn on_pusher_activate(&mut self, pusher: u8, barcode: &str) {
        info!(barcode = %barcode, pusher, "Pusher activated");
    }

    fn on_item_diverted(&mut self, barcode: &str, pusher: u8) {
        info!(barcode = %barcode, bucket = pusher, "Item diverted");
    }

    fn on_item_removed(&mut self, barcode: &str) {
        info!(barcode = %barcode, "Item removed");
    }
}
