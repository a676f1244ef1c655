//! Shared line state read by the API.
//!
//! Written by the tick and ingest loops, wrapped in `Arc<RwLock<>>`.

use serde::Serialize;
use std::time::Instant;

use super::engine::{EngineStats, TickFrame};
use crate::position::BeltGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    Initializing,
    Running,
    Stopped,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "Initializing"),
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineState {
    pub status: SystemStatus,

    #[serde(skip)]
    pub uptime: Instant,

    /// Most recent tick output
    pub latest_frame: Option<TickFrame>,

    /// Geometry in effect for the latest frame
    pub geometry: BeltGeometry,

    pub stats: EngineStats,

    /// Messages read from the source
    pub messages_processed: u64,

    pub last_message_time: Option<chrono::DateTime<chrono::Utc>>,

    /// Name of the active message source
    pub source: Option<String>,
}

impl LineState {
    pub fn new(geometry: BeltGeometry) -> Self {
        Self {
            status: SystemStatus::Initializing,
            uptime: Instant::now(),
            latest_frame: None,
            geometry,
            stats: EngineStats::default(),
            messages_processed: 0,
            last_message_time: None,
            source: None,
        }
    }

    /// Store the output of one tick.
    pub fn publish(&mut self, frame: TickFrame, geometry: BeltGeometry, stats: EngineStats) {
        self.latest_frame = Some(frame);
        self.geometry = geometry;
        self.stats = stats;
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }
}
