//! Item Store
//!
//! Barcode-keyed collection of tracked items. Every write goes through
//! [`ItemStore::upsert`], which enforces the merge rules:
//!
//! - status never moves backwards (`pending < progress < routing < completed`)
//! - `start_time` is fixed once known
//! - an in-progress item's position only moves forward
//! - a fired pusher locks the item's assignment
//!
//! Reads return copies so callers can iterate while the store mutates.

use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{Item, ItemFields, ItemStatus};

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Default)]
pub struct ItemStore {
    items: BTreeMap<String, Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the item if missing, then merge `fields` into it.
    pub fn upsert(&mut self, barcode: &str, fields: ItemFields) -> UpsertOutcome {
        let outcome = if self.items.contains_key(barcode) {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        };
        let item = self
            .items
            .entry(barcode.to_string())
            .or_insert_with(|| Item::new(barcode));
        merge_fields(item, fields);
        outcome
    }

    pub fn remove(&mut self, barcode: &str) -> Option<Item> {
        self.items.remove(barcode)
    }

    pub fn get(&self, barcode: &str) -> Option<&Item> {
        self.items.get(barcode)
    }

    /// Mutable access for the trigger's state transitions.
    pub(crate) fn get_mut(&mut self, barcode: &str) -> Option<&mut Item> {
        self.items.get_mut(barcode)
    }

    pub fn contains(&self, barcode: &str) -> bool {
        self.items.contains_key(barcode)
    }

    /// Copy of every item, ordered by barcode.
    pub fn all(&self) -> Vec<Item> {
        self.items.values().cloned().collect()
    }

    pub fn barcodes(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item count per status.
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for item in self.items.values() {
            match item.status {
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Progress => counts.progress += 1,
                ItemStatus::Routing => counts.routing += 1,
                ItemStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub progress: usize,
    pub routing: usize,
    pub completed: usize,
}

fn merge_fields(item: &mut Item, fields: ItemFields) {
    match (item.start_time, fields.start_time) {
        (None, Some(t)) => item.start_time = Some(t),
        (Some(current), Some(t)) if (current - t).abs() > f64::EPSILON => {
            debug!(barcode = %item.barcode, current, incoming = t, "Ignoring start time change");
        }
        _ => {}
    }

    if let Some(incoming) = fields.status {
        let merged = item.status.merge(incoming);
        if merged != incoming {
            debug!(barcode = %item.barcode, current = %item.status, incoming = %incoming, "Refusing status downgrade");
        }
        item.status = merged;
    }

    if !item.pusher_fired {
        if let Some(pusher) = fields.assigned_pusher {
            item.assigned_pusher = pusher;
        }
        if let Some(target) = fields.target_distance_cm {
            item.target_distance_cm = Some(target);
        }
    }

    if let Some(pos) = fields.position_cm {
        match item.status {
            ItemStatus::Pending => item.position_cm = pos,
            ItemStatus::Progress => item.position_cm = item.position_cm.max(pos),
            ItemStatus::Routing | ItemStatus::Completed => {}
        }
    }

    if let Some(id) = fields.position_id {
        item.position_id = Some(id);
    }
    if let Some(label) = fields.label {
        item.label = Some(label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(s: ItemStatus) -> ItemFields {
        ItemFields {
            status: Some(s),
            ..Default::default()
        }
    }

    #[test]
    fn upsert_creates_then_updates() {
        let mut store = ItemStore::new();
        assert_eq!(store.upsert("A", ItemFields::default()), UpsertOutcome::Created);
        assert_eq!(store.upsert("A", status(ItemStatus::Progress)), UpsertOutcome::Updated);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("A").map(|i| i.status), Some(ItemStatus::Progress));
    }

    #[test]
    fn status_never_downgrades() {
        let mut store = ItemStore::new();
        store.upsert("A", status(ItemStatus::Routing));
        store.upsert("A", status(ItemStatus::Progress));
        store.upsert("A", status(ItemStatus::Pending));
        assert_eq!(store.get("A").unwrap().status, ItemStatus::Routing);
    }

    #[test]
    fn start_time_is_immutable() {
        let mut store = ItemStore::new();
        store.upsert("A", ItemFields { start_time: Some(10.0), ..Default::default() });
        store.upsert("A", ItemFields { start_time: Some(99.0), ..Default::default() });
        assert_eq!(store.get("A").unwrap().start_time, Some(10.0));
    }

    #[test]
    fn progress_position_only_moves_forward() {
        let mut store = ItemStore::new();
        store.upsert(
            "A",
            ItemFields {
                status: Some(ItemStatus::Progress),
                position_cm: Some(100.0),
                ..Default::default()
            },
        );
        store.upsert("A", ItemFields { position_cm: Some(50.0), ..Default::default() });
        assert_eq!(store.get("A").unwrap().position_cm, 100.0);
        store.upsert("A", ItemFields { position_cm: Some(150.0), ..Default::default() });
        assert_eq!(store.get("A").unwrap().position_cm, 150.0);
    }

    #[test]
    fn fired_pusher_locks_assignment() {
        let mut store = ItemStore::new();
        store.upsert("A", ItemFields { assigned_pusher: Some(Some(2)), ..Default::default() });
        store.get_mut("A").unwrap().pusher_fired = true;
        store.upsert("A", ItemFields { assigned_pusher: Some(Some(5)), ..Default::default() });
        assert_eq!(store.get("A").unwrap().assigned_pusher, Some(2));
    }

    #[test]
    fn explicit_unassign_clears_pusher() {
        let mut store = ItemStore::new();
        store.upsert("A", ItemFields { assigned_pusher: Some(Some(2)), ..Default::default() });
        store.upsert("A", ItemFields { assigned_pusher: Some(None), ..Default::default() });
        assert_eq!(store.get("A").unwrap().assigned_pusher, None);
    }

    #[test]
    fn all_returns_a_copy() {
        let mut store = ItemStore::new();
        store.upsert("A", ItemFields::default());
        store.upsert("B", ItemFields::default());
        let snapshot = store.all();
        store.remove("A");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.barcodes(), vec!["B".to_string()]);
    }

    #[test]
    fn counts_by_status() {
        let mut store = ItemStore::new();
        store.upsert("A", ItemFields::default());
        store.upsert("B", status(ItemStatus::Progress));
        store.upsert("C", status(ItemStatus::Completed));
        let c = store.status_counts();
        assert_eq!((c.pending, c.progress, c.routing, c.completed), (1, 1, 0, 1));
    }
}
