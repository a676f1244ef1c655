//! BeltEngine - the four core components wired together.
//!
//! Network messages go through [`BeltEngine::handle_message`]; the tick
//! clock calls [`BeltEngine::tick`]. Both take an explicit `now` (seconds
//! since epoch) so the engine itself never reads a clock.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::defaults::PUSHER_COUNT;
use crate::config::{ConveyorConfig, PusherSettings};
use crate::position::{cm_to_position_id, cm_to_spatial, BeltGeometry};
use crate::reconcile::{ReconcileReport, ReconcileStats, ReconciliationEngine};
use crate::store::{ItemStore, StatusCounts};
use crate::trigger::{DiversionProgress, EventTrigger, TriggerStats};
use crate::types::{BeltEvent, InboundMessage, Item, RemovalReason};

// ============================================================================
// Tick Output
// ============================================================================

/// One item as published on a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    /// Renderer-axis position.
    pub spatial: f64,
    /// Position id the line would report at this position.
    pub position_id_estimate: u32,
    /// Set while the item is in `routing`.
    pub diversion: Option<DiversionProgress>,
    /// Label of the bucket the item is headed for.
    pub bucket_label: Option<String>,
}

/// Everything a renderer or table view needs after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickFrame {
    pub tick: u64,
    pub timestamp: f64,
    pub items: Vec<ItemView>,
    /// Discrete events since the previous frame, in firing order.
    pub events: Vec<BeltEvent>,
    pub pusher_extension: [f64; PUSHER_COUNT],
    pub pusher_busy: [bool; PUSHER_COUNT],
    pub beam_intensity: f64,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub ticks: u64,
    pub messages: u64,
    pub messages_rejected: u64,
    pub items_tracked: usize,
    pub reconcile: ReconcileStats,
    pub trigger: TriggerStats,
}

// ============================================================================
// Engine
// ============================================================================

pub struct BeltEngine {
    config: ConveyorConfig,
    settings: PusherSettings,
    geometry: BeltGeometry,
    store: ItemStore,
    reconciler: ReconciliationEngine,
    trigger: EventTrigger,
    /// Events raised by reconciliation, delivered with the next frame.
    pending_events: Vec<BeltEvent>,
    ticks: u64,
    messages: u64,
    messages_rejected: u64,
}

impl BeltEngine {
    pub fn new(config: ConveyorConfig) -> Self {
        Self::with_settings(config, PusherSettings::default())
    }

    pub fn with_settings(config: ConveyorConfig, settings: PusherSettings) -> Self {
        let geometry = BeltGeometry::with_settings(&config, &settings);
        let trigger = EventTrigger::new(&config.trigger);
        Self {
            config,
            settings,
            geometry,
            store: ItemStore::new(),
            reconciler: ReconciliationEngine::new(),
            trigger,
            pending_events: Vec::new(),
            ticks: 0,
            messages: 0,
            messages_rejected: 0,
        }
    }

    pub fn config(&self) -> &ConveyorConfig {
        &self.config
    }

    pub fn settings(&self) -> &PusherSettings {
        &self.settings
    }

    pub fn geometry(&self) -> &BeltGeometry {
        &self.geometry
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            ticks: self.ticks,
            messages: self.messages,
            messages_rejected: self.messages_rejected,
            items_tracked: self.store.len(),
            reconcile: self.reconciler.stats(),
            trigger: self.trigger.stats(),
        }
    }

    /// Parse and apply one JSON line. Unreadable lines are logged and skipped.
    pub fn handle_line(&mut self, line: &str, now: f64) -> Option<ReconcileReport> {
        match InboundMessage::parse(line) {
            Ok(msg) => Some(self.handle_message(msg, now)),
            Err(e) => {
                self.messages_rejected += 1;
                warn!(error = %e, "Skipping unreadable message");
                None
            }
        }
    }

    pub fn handle_message(&mut self, msg: InboundMessage, now: f64) -> ReconcileReport {
        self.messages += 1;
        debug!(kind = msg.kind(), "Applying message");
        match msg {
            InboundMessage::Snapshot { items } => self.apply_snapshot(&items, now),
            InboundMessage::Add { barcode, fields } | InboundMessage::Update { barcode, fields } => {
                self.apply_delta(barcode.as_deref(), &fields)
            }
            InboundMessage::Scan { barcode } => self.scan(&barcode),
            InboundMessage::Settings { settings } => {
                self.update_settings(PusherSettings::from_map(&settings));
                ReconcileReport::default()
            }
        }
    }

    pub fn apply_snapshot(&mut self, items: &Value, now: f64) -> ReconcileReport {
        let report = self.reconciler.apply_snapshot(&mut self.store, items);
        for barcode in &report.removed {
            let event = BeltEvent::ItemRemoved {
                barcode: barcode.clone(),
                reason: RemovalReason::AbsentFromSnapshot,
            };
            if self.trigger.admit(&event, now) {
                self.pending_events.push(event);
            }
        }
        if !report.is_noop() {
            debug!(
                created = report.created.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                retained = report.retained.len(),
                dropped = report.dropped.len(),
                "Snapshot reconciled"
            );
        }
        report
    }

    pub fn apply_delta(&mut self, barcode: Option<&str>, fields: &Value) -> ReconcileReport {
        self.reconciler.apply_delta(&mut self.store, barcode, fields)
    }

    /// Local echo of a scanner read.
    pub fn scan(&mut self, barcode: &str) -> ReconcileReport {
        self.reconciler.apply_scan(&mut self.store, barcode)
    }

    /// Swap pusher settings. In-flight items keep their progress.
    pub fn update_settings(&mut self, settings: PusherSettings) {
        self.geometry = BeltGeometry::with_settings(&self.config, &settings);
        self.settings = settings;
        info!(
            overrides = self.settings.overrides(),
            belt_length_cm = self.geometry.belt_length_cm,
            max_pusher_distance_cm = self.geometry.max_pusher_distance_cm,
            "Pusher settings applied"
        );
    }

    /// Advance every item to `now` and collect the frame.
    pub fn tick(&mut self, now: f64) -> TickFrame {
        self.ticks += 1;

        let mut events = std::mem::take(&mut self.pending_events);
        events.extend(self.trigger.tick(&mut self.store, &self.geometry, now));

        let items = self
            .store
            .all()
            .into_iter()
            .map(|item| self.view(item, now))
            .collect();

        TickFrame {
            tick: self.ticks,
            timestamp: now,
            items,
            events,
            pusher_extension: self.trigger.pusher_extensions(now),
            pusher_busy: self.trigger.busy_pushers(now),
            beam_intensity: self.trigger.beam_intensity(now),
            counts: self.store.status_counts(),
        }
    }

    fn view(&self, item: Item, now: f64) -> ItemView {
        let g = &self.geometry;
        let bucket = item
            .diverted_to
            .or(item.assigned_pusher)
            .and_then(|p| g.pusher_label(p))
            .map(str::to_string);
        ItemView {
            spatial: cm_to_spatial(item.position_cm, g),
            position_id_estimate: cm_to_position_id(item.position_cm, g.max_pusher_distance_cm),
            diversion: self.trigger.diversion_of(&item, now),
            bucket_label: bucket,
            item,
        }
    }
}
