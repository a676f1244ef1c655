//! Reconciliation Engine
//!
//! Turns backend payloads into [`ItemStore`] mutations.
//!
//! ## Snapshot
//! 0. A payload that is not an object or a list is dropped and changes
//!    nothing.
//! 1. Parse every record; malformed ones are dropped individually.
//! 2. Upsert each parsed record. Items already `routing`/`completed` locally
//!    keep their status and position (the network may lag the trigger).
//! 3. Remove local items the snapshot no longer lists, except
//!    `routing`/`completed` ones, which retire on their own grace timer.
//!
//! ## Delta
//! Upsert one barcode. Never removes anything.

pub mod record;

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::store::{ItemStore, UpsertOutcome};
use crate::types::{ItemFields, RecordError};

pub use record::{parse_fields, parse_snapshot, SnapshotRecords};

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    /// Absent from the snapshot but kept because they are mid-diversion.
    pub retained: Vec<String>,
    #[serde(skip)]
    pub dropped: Vec<RecordError>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.dropped.is_empty()
    }

    fn record(&mut self, barcode: String, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created.push(barcode),
            UpsertOutcome::Updated => self.updated.push(barcode),
        }
    }
}

/// Running totals across all passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub snapshots: u64,
    pub deltas: u64,
    pub records_dropped: u64,
    pub snapshot_removals: u64,
}

#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    stats: ReconcileStats,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Apply an authoritative snapshot.
    pub fn apply_snapshot(&mut self, store: &mut ItemStore, items: &Value) -> ReconcileReport {
        self.stats.snapshots += 1;
        let mut report = ReconcileReport::default();
        let SnapshotRecords {
            records,
            present,
            dropped,
        } = match parse_snapshot(items) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.log_dropped(std::slice::from_ref(&e));
                report.dropped.push(e);
                return report;
            }
        };

        let present: HashSet<String> = present.into_iter().collect();

        for (barcode, fields) in records {
            let outcome = upsert_guarded(store, &barcode, fields);
            report.record(barcode, outcome);
        }

        for barcode in store.barcodes() {
            if present.contains(&barcode) {
                continue;
            }
            let terminal = store.get(&barcode).is_some_and(|i| i.status.is_terminal());
            if terminal {
                report.retained.push(barcode);
            } else if store.remove(&barcode).is_some() {
                debug!(barcode = %barcode, "Removed item absent from snapshot");
                report.removed.push(barcode);
            }
        }

        self.log_dropped(&dropped);
        report.dropped = dropped;
        self.stats.snapshot_removals += report.removed.len() as u64;
        report
    }

    /// Apply a single-item `add`/`update`.
    pub fn apply_delta(
        &mut self,
        store: &mut ItemStore,
        barcode: Option<&str>,
        fields: &Value,
    ) -> ReconcileReport {
        self.stats.deltas += 1;
        let mut report = ReconcileReport::default();

        let parsed = match barcode.map(str::trim).filter(|b| !b.is_empty()) {
            None => Err(RecordError::MissingBarcode),
            Some(b) => parse_fields(b, fields).map(|f| (b.to_string(), f)),
        };

        match parsed {
            Ok((barcode, fields)) => {
                let outcome = upsert_guarded(store, &barcode, fields);
                report.record(barcode, outcome);
            }
            Err(e) => {
                self.log_dropped(std::slice::from_ref(&e));
                report.dropped.push(e);
            }
        }
        report
    }

    /// Local echo of a scanner read: a pending item at the photo-eye.
    pub fn apply_scan(&mut self, store: &mut ItemStore, barcode: &str) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let barcode = barcode.trim();
        if barcode.is_empty() {
            self.log_dropped(&[RecordError::MissingBarcode]);
            report.dropped.push(RecordError::MissingBarcode);
            return report;
        }
        let outcome = store.upsert(barcode, ItemFields::default());
        report.record(barcode.to_string(), outcome);
        report
    }

    fn log_dropped(&mut self, dropped: &[RecordError]) {
        for e in dropped {
            warn!(error = %e, "Dropping malformed record");
        }
        self.stats.records_dropped += dropped.len() as u64;
    }
}

/// Upsert, without letting the network move a locally terminal item.
fn upsert_guarded(store: &mut ItemStore, barcode: &str, fields: ItemFields) -> UpsertOutcome {
    let terminal = store.get(barcode).is_some_and(|i| i.status.is_terminal());
    let fields = if terminal {
        fields.without_motion()
    } else {
        fields
    };
    store.upsert(barcode, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemStatus;
    use serde_json::json;

    #[test]
    fn snapshot_adds_and_removes() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();

        let r1 = engine.apply_snapshot(
            &mut store,
            &json!({"A": {"status": "progress", "startTime": 1.0}, "B": {"status": "progress"}}),
        );
        assert_eq!(r1.created, vec!["A", "B"]);

        let r2 = engine.apply_snapshot(&mut store, &json!({"A": {"label": "FBA"}}));
        assert_eq!(r2.removed, vec!["B"]);
        assert_eq!(r2.updated, vec!["A"]);
        let a = store.get("A").unwrap();
        assert_eq!(a.start_time, Some(1.0));
        assert_eq!(a.label.as_deref(), Some("FBA"));
        assert!(!store.contains("B"));
    }

    #[test]
    fn snapshot_keeps_terminal_items() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();
        engine.apply_snapshot(&mut store, &json!({"A": {"status": "routing"}}));

        let report = engine.apply_snapshot(&mut store, &json!({}));
        assert_eq!(report.retained, vec!["A"]);
        assert!(store.contains("A"));
    }

    #[test]
    fn stale_snapshot_does_not_rewind() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();
        engine.apply_snapshot(&mut store, &json!({"A": {"status": "progress", "positionCm": 300}}));
        store.get_mut("A").unwrap().status = ItemStatus::Routing;
        store.get_mut("A").unwrap().position_cm = 320.0;

        engine.apply_snapshot(
            &mut store,
            &json!({"A": {"status": "progress", "positionCm": 10, "label": "MF"}}),
        );
        let a = store.get("A").unwrap();
        assert_eq!(a.status, ItemStatus::Routing);
        assert_eq!(a.position_cm, 320.0);
        assert_eq!(a.label.as_deref(), Some("MF"));
    }

    #[test]
    fn malformed_record_is_dropped_alone() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();
        engine.apply_snapshot(&mut store, &json!({"B": {"status": "progress"}}));

        let report = engine.apply_snapshot(
            &mut store,
            &json!({"A": {"status": "progress"}, "B": {"distance": "far"}}),
        );
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.created, vec!["A"]);
        // B was listed, so it is not treated as absent
        assert!(store.contains("B"));
        assert_eq!(engine.stats().records_dropped, 1);
    }

    #[test]
    fn non_collection_snapshot_leaves_belt_untouched() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();
        engine.apply_scan(&mut store, "A");
        engine.apply_scan(&mut store, "B");

        for items in [json!("garbage"), Value::Null, json!(7)] {
            let report = engine.apply_snapshot(&mut store, &items);
            assert!(report.removed.is_empty());
            assert_eq!(report.dropped.len(), 1);
        }
        assert_eq!(store.len(), 2);
        assert_eq!(engine.stats().snapshot_removals, 0);
        assert_eq!(engine.stats().records_dropped, 3);

        // an explicit empty map is still authoritative
        let report = engine.apply_snapshot(&mut store, &json!({}));
        assert_eq!(report.removed, vec!["A", "B"]);
    }

    #[test]
    fn delta_never_removes() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();
        engine.apply_scan(&mut store, "A");
        let report = engine.apply_delta(&mut store, Some("B"), &json!({"pusher": 3}));
        assert_eq!(report.created, vec!["B"]);
        assert!(store.contains("A"));
        assert_eq!(store.get("B").unwrap().assigned_pusher, Some(3));
    }

    #[test]
    fn delta_without_barcode_is_dropped() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();
        let report = engine.apply_delta(&mut store, None, &json!({"status": "progress"}));
        assert_eq!(report.dropped, vec![RecordError::MissingBarcode]);
        assert!(store.is_empty());
    }

    #[test]
    fn scan_creates_pending_item_at_origin() {
        let mut store = ItemStore::new();
        let mut engine = ReconciliationEngine::new();
        engine.apply_scan(&mut store, " 978 ");
        let item = store.get("978").unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.position_cm, 0.0);
    }
}
