//! Discrete belt events exposed to rendering and table collaborators.

use serde::{Deserialize, Serialize};

/// Kind of discrete event, used as part of the debounce key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PhotoEye,
    PusherActivate,
    Diverted,
    Removed,
}

/// Why an item left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Diversion settled and the completed grace period elapsed.
    Retired,
    /// An authoritative snapshot no longer listed the item.
    AbsentFromSnapshot,
}

/// A physical event, fired at most once per item per transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BeltEvent {
    PhotoEyeDetected { barcode: String },
    PusherActivated { pusher: u8, barcode: String },
    ItemDiverted { barcode: String, pusher: u8 },
    ItemRemoved { barcode: String, reason: RemovalReason },
}

impl BeltEvent {
    pub fn barcode(&self) -> &str {
        match self {
            Self::PhotoEyeDetected { barcode }
            | Self::PusherActivated { barcode, .. }
            | Self::ItemDiverted { barcode, .. }
            | Self::ItemRemoved { barcode, .. } => barcode,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::PhotoEyeDetected { .. } => EventKind::PhotoEye,
            Self::PusherActivated { .. } => EventKind::PusherActivate,
            Self::ItemDiverted { .. } => EventKind::Diverted,
            Self::ItemRemoved { .. } => EventKind::Removed,
        }
    }
}

impl std::fmt::Display for BeltEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhotoEyeDetected { barcode } => write!(f, "photo-eye detected {barcode}"),
            Self::PusherActivated { pusher, barcode } => {
                write!(f, "pusher {pusher} activated for {barcode}")
            }
            Self::ItemDiverted { barcode, pusher } => {
                write!(f, "{barcode} diverted into bucket {pusher}")
            }
            Self::ItemRemoved { barcode, reason } => write!(f, "{barcode} removed ({reason:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = BeltEvent::PusherActivated { pusher: 2, barcode: "978".into() };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "pusher_activated");
        assert_eq!(json["pusher"], 2);
        assert_eq!(ev.kind(), EventKind::PusherActivate);
        assert_eq!(ev.barcode(), "978");
    }
}
