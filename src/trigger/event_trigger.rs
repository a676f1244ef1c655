//! Per-tick physical event state machine.
//!
//! | State      | Condition                                   | Event              | Next       |
//! |------------|---------------------------------------------|--------------------|------------|
//! | pending    | start time known                            | -                  | progress   |
//! | progress   | inside photo-eye zone, not yet fired        | `PhotoEyeDetected` | progress   |
//! | progress   | position >= target - offset, not yet fired  | `PusherActivated`  | routing    |
//! | progress   | unassigned, position >= end of belt         | `PusherActivated`  | routing    |
//! | routing    | diversion time elapsed                      | `ItemDiverted`     | completed  |
//! | completed  | removal grace elapsed                       | `ItemRemoved`      | removed    |
//!
//! Both progress checks run every tick, photo-eye first.

use serde::Serialize;
use tracing::debug;

use super::animation::{diversion_progress, BeamFlash, DiversionProgress, PusherStroke};
use super::debounce::DebouncePolicy;
use crate::config::defaults::PUSHER_COUNT;
use crate::config::TriggerConfig;
use crate::position::{extrapolate_position_cm, position_id_to_cm, BeltGeometry};
use crate::store::ItemStore;
use crate::types::{BeltEvent, EventKind, Item, ItemStatus, RemovalReason};

/// Counters since start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriggerStats {
    pub photo_eye: u64,
    pub pusher_activations: [u64; PUSHER_COUNT],
    pub overflow: u64,
    pub diverted: u64,
    pub removed: u64,
    pub suppressed: u64,
}

pub struct EventTrigger {
    debounce: DebouncePolicy<(EventKind, String)>,
    strokes: [Option<PusherStroke>; PUSHER_COUNT],
    beam: Option<BeamFlash>,
    diversion_secs: f64,
    removal_grace_secs: f64,
    stats: TriggerStats,
}

impl EventTrigger {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            debounce: DebouncePolicy::new(config.debounce_ms),
            strokes: [None; PUSHER_COUNT],
            beam: None,
            diversion_secs: config.diversion_secs,
            removal_grace_secs: config.removal_grace_secs,
            stats: TriggerStats::default(),
        }
    }

    pub fn stats(&self) -> TriggerStats {
        self.stats
    }

    /// Run the state machine over every item once.
    pub fn tick(&mut self, store: &mut ItemStore, geometry: &BeltGeometry, now: f64) -> Vec<BeltEvent> {
        let mut events = Vec::new();

        for barcode in store.barcodes() {
            let retire = {
                // Removed earlier in this pass
                let Some(item) = store.get_mut(&barcode) else {
                    continue;
                };
                if item.status == ItemStatus::Pending {
                    Self::advance_pending(item, geometry);
                }
                if item.status == ItemStatus::Progress {
                    self.advance_progress(item, geometry, now, &mut events);
                }
                if item.status == ItemStatus::Routing {
                    self.advance_routing(item, now, &mut events);
                }
                item.status == ItemStatus::Completed && self.retire_due(item, now)
            };

            if retire && store.remove(&barcode).is_some() {
                self.stats.removed += 1;
                debug!(barcode = %barcode, "Item retired");
                events.push(BeltEvent::ItemRemoved {
                    barcode,
                    reason: RemovalReason::Retired,
                });
            }
        }

        self.expire_animations(now);
        self.debounce.prune(now);
        events
    }

    /// Debounce an event raised outside the tick (snapshot removals).
    pub fn admit(&mut self, event: &BeltEvent, now: f64) -> bool {
        let allowed = self
            .debounce
            .try_fire((event.kind(), event.barcode().to_string()), now);
        if allowed {
            if let BeltEvent::ItemRemoved { .. } = event {
                self.stats.removed += 1;
            }
        } else {
            self.stats.suppressed += 1;
        }
        allowed
    }

    /// Arm extension 0..=1 of every pusher.
    pub fn pusher_extensions(&self, now: f64) -> [f64; PUSHER_COUNT] {
        self.strokes
            .map(|s| s.map_or(0.0, |stroke| stroke.extension(now)))
    }

    /// A pusher is busy while its stroke is still running.
    pub fn busy_pushers(&self, now: f64) -> [bool; PUSHER_COUNT] {
        self.strokes
            .map(|s| s.is_some_and(|stroke| !stroke.is_finished(now)))
    }

    pub fn beam_intensity(&self, now: f64) -> f64 {
        self.beam.map_or(0.0, |b| b.intensity(now))
    }

    /// Diversion animation state of an item in `routing`.
    pub fn diversion_of(&self, item: &Item, now: f64) -> Option<DiversionProgress> {
        match item.status {
            ItemStatus::Routing => item
                .routing_started_at
                .map(|start| diversion_progress(start, self.diversion_secs, now)),
            _ => None,
        }
    }

    fn advance_pending(item: &mut Item, geometry: &BeltGeometry) {
        if item.start_time.is_some() {
            item.status = ItemStatus::Progress;
            return;
        }
        if let Some(cm) = item
            .position_id
            .and_then(|id| position_id_to_cm(id, geometry.max_pusher_distance_cm))
        {
            item.position_cm = cm;
        }
    }

    fn advance_progress(
        &mut self,
        item: &mut Item,
        geometry: &BeltGeometry,
        now: f64,
        events: &mut Vec<BeltEvent>,
    ) {
        if let Some(start) = item.start_time {
            let estimate = extrapolate_position_cm(start, now, geometry.speed_cm_per_sec);
            item.position_cm = item.position_cm.max(estimate);
        }
        let pos = item.position_cm;

        // Items first seen downstream of the eye never break the beam.
        if !item.photo_eye_fired
            && geometry.in_photo_eye_zone(pos)
            && self.fire(EventKind::PhotoEye, &item.barcode, now)
        {
            item.photo_eye_fired = true;
            self.beam = Some(BeamFlash::start(now));
            self.stats.photo_eye += 1;
            events.push(BeltEvent::PhotoEyeDetected {
                barcode: item.barcode.clone(),
            });
        }

        if item.pusher_fired {
            return;
        }

        match item.assigned_pusher.filter(|p| BeltGeometry::is_valid_pusher(*p)) {
            Some(pusher) => {
                let target_cm = item
                    .target_distance_cm
                    .or_else(|| geometry.pusher_distance(pusher))
                    .unwrap_or(geometry.max_pusher_distance_cm);
                if pos >= geometry.activation_threshold(target_cm) {
                    self.activate(item, pusher, false, now, events);
                }
            }
            None if pos >= geometry.end_of_belt_cm => {
                self.activate(item, BeltGeometry::overflow_pusher(), true, now, events);
            }
            None => {}
        }
    }

    fn activate(
        &mut self,
        item: &mut Item,
        pusher: u8,
        overflow: bool,
        now: f64,
        events: &mut Vec<BeltEvent>,
    ) {
        if !self.fire(EventKind::PusherActivate, &item.barcode, now) {
            return;
        }
        item.pusher_fired = true;
        item.status = ItemStatus::Routing;
        item.routing_started_at = Some(now);
        item.diverted_to = Some(pusher);
        item.overflow = overflow;

        let index = usize::from(pusher - 1);
        self.strokes[index] = Some(PusherStroke::start(now));
        self.stats.pusher_activations[index] += 1;
        if overflow {
            self.stats.overflow += 1;
            debug!(barcode = %item.barcode, position_cm = item.position_cm, "End of belt reached unassigned, using overflow pusher");
        }

        events.push(BeltEvent::PusherActivated {
            pusher,
            barcode: item.barcode.clone(),
        });
    }

    fn advance_routing(&mut self, item: &mut Item, now: f64, events: &mut Vec<BeltEvent>) {
        // A terminal status pushed by the backend starts its timer here.
        let started = *item.routing_started_at.get_or_insert(now);
        if now - started < self.diversion_secs {
            return;
        }
        if !self.fire(EventKind::Diverted, &item.barcode, now) {
            return;
        }

        let pusher = item
            .diverted_to
            .or(item.assigned_pusher)
            .unwrap_or_else(BeltGeometry::overflow_pusher);
        item.diverted_to = Some(pusher);
        item.status = ItemStatus::Completed;
        item.completed_at = Some(now);
        self.stats.diverted += 1;

        events.push(BeltEvent::ItemDiverted {
            barcode: item.barcode.clone(),
            pusher,
        });
    }

    fn retire_due(&mut self, item: &mut Item, now: f64) -> bool {
        let since = *item.completed_at.get_or_insert(now);
        now - since >= self.removal_grace_secs && self.fire(EventKind::Removed, &item.barcode, now)
    }

    fn fire(&mut self, kind: EventKind, barcode: &str, now: f64) -> bool {
        let allowed = self.debounce.try_fire((kind, barcode.to_string()), now);
        if !allowed {
            self.stats.suppressed += 1;
            debug!(barcode = %barcode, kind = ?kind, "Event debounced");
        }
        allowed
    }

    fn expire_animations(&mut self, now: f64) {
        for slot in &mut self.strokes {
            if slot.is_some_and(|s| s.is_finished(now)) {
                *slot = None;
            }
        }
        if self.beam.is_some_and(|b| b.is_finished(now)) {
            self.beam = None;
        }
    }
}
