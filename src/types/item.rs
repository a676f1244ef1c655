//! Tracked item and its status lifecycle.

use serde::{Deserialize, Serialize};

// ============================================================================
// Item Status
// ============================================================================

/// Lifecycle of one item on the belt.
///
/// Declaration order is lifecycle order; `Ord` is used to refuse downgrades
/// arriving out of order from the network.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Scanned, start time not yet known
    #[default]
    Pending,
    /// Travelling; position is extrapolated from start time
    Progress,
    /// Pusher fired, diversion animation running
    Routing,
    /// Diverted into its bucket, waiting for removal
    Completed,
}

impl ItemStatus {
    /// `routing` and `completed` are owned locally once entered.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Routing | Self::Completed)
    }

    /// Merge an incoming status without ever moving backwards.
    pub fn merge(self, incoming: Self) -> Self {
        self.max(incoming)
    }

    /// Parse the status strings the backend emits.
    ///
    /// Accepts the lowercase names plus the backend's `"In Progress"` form.
    pub fn parse_wire(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "pending" | "new" | "scanned" => Some(Self::Pending),
            "progress" | "inprogress" => Some(Self::Progress),
            "routing" | "routed" => Some(Self::Routing),
            "completed" | "complete" | "done" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Progress => "progress",
            Self::Routing => "routing",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Item
// ============================================================================

/// One tracked physical object on the belt, keyed by barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub barcode: String,

    /// Server-clock time (s since epoch) the item passed the photo-eye.
    pub start_time: Option<f64>,

    pub status: ItemStatus,

    /// Diversion target 1..=8; `None` routes to the overflow pusher.
    pub assigned_pusher: Option<u8>,

    /// Distance to the assigned pusher as reported by the backend (cm).
    pub target_distance_cm: Option<f64>,

    /// Last known or extrapolated position (cm from the photo-eye).
    pub position_cm: f64,

    /// Coarse position id reported by the line (101..=150).
    pub position_id: Option<u32>,

    pub photo_eye_fired: bool,
    pub pusher_fired: bool,

    pub label: Option<String>,

    /// Pusher that actually diverted the item (assigned or overflow).
    pub diverted_to: Option<u8>,

    /// Set when the item reached end of belt without an assignment.
    pub overflow: bool,

    /// Local time `routing` was entered.
    pub routing_started_at: Option<f64>,

    /// Local time `completed` was entered.
    pub completed_at: Option<f64>,
}

impl Item {
    /// A fresh pending item at the photo-eye.
    pub fn new(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            start_time: None,
            status: ItemStatus::Pending,
            assigned_pusher: None,
            target_distance_cm: None,
            position_cm: 0.0,
            position_id: None,
            photo_eye_fired: false,
            pusher_fired: false,
            label: None,
            diverted_to: None,
            overflow: false,
            routing_started_at: None,
            completed_at: None,
        }
    }
}

// ============================================================================
// Partial Update
// ============================================================================

/// Fields carried by a snapshot record or delta. `None` = not supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFields {
    pub start_time: Option<f64>,
    pub status: Option<ItemStatus>,
    /// `Some(None)` explicitly clears the assignment (overflow routing).
    pub assigned_pusher: Option<Option<u8>>,
    pub target_distance_cm: Option<f64>,
    pub position_cm: Option<f64>,
    pub position_id: Option<u32>,
    pub label: Option<String>,
}

impl ItemFields {
    /// Drop the fields a locally terminal item must not take from the network.
    pub fn without_motion(mut self) -> Self {
        self.status = None;
        self.position_cm = None;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
