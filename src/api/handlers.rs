//! HTTP handlers over the shared [`LineState`](crate::pipeline::LineState).
//!
//! Handlers only read; the tick and ingest loops are the sole writers.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::envelope::{ApiError, ApiResponse};
use crate::config::defaults::PUSHER_COUNT;
use crate::pipeline::{EngineStats, ItemView, SharedLineState, SystemStatus};
use crate::position::{BeltGeometry, Fixtures};
use crate::types::ItemStatus;

/// Router state: a handle on the published line state.
#[derive(Clone)]
pub struct ApiState {
    pub line_state: SharedLineState,
}

impl ApiState {
    pub fn new(line_state: SharedLineState) -> Self {
        Self { line_state }
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: SystemStatus,
    pub uptime_secs: u64,
    pub source: Option<String>,
    pub messages_processed: u64,
    pub last_message_time: Option<String>,
    pub ticks: u64,
    pub items_tracked: usize,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    /// Tick the listing was taken from (0 before the first tick).
    pub tick: u64,
    pub count: usize,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Serialize)]
pub struct PusherInfo {
    pub pusher: u8,
    pub distance_cm: f64,
    pub activation_cm: f64,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeometryResponse {
    pub geometry: BeltGeometry,
    pub fixtures: Fixtures,
    pub pushers: Vec<PusherInfo>,
}

#[derive(Debug, Serialize)]
pub struct LegacyHealth {
    pub status: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub status: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn legacy_health(State(state): State<ApiState>) -> Json<LegacyHealth> {
    let s = state.line_state.read().await;
    Json(LegacyHealth {
        status: s.status.to_string(),
        uptime_seconds: s.uptime_secs(),
    })
}

/// GET /api/v2/health
pub async fn health(State(state): State<ApiState>) -> Response {
    let s = state.line_state.read().await;
    ApiResponse::ok(HealthResponse {
        status: s.status,
        uptime_secs: s.uptime_secs(),
        source: s.source.clone(),
        messages_processed: s.messages_processed,
        last_message_time: s.last_message_time.map(|t| t.to_rfc3339()),
        ticks: s.stats.ticks,
        items_tracked: s.stats.items_tracked,
    })
}

/// GET /api/v2/frame
pub async fn latest_frame(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let s = state.line_state.read().await;
    let frame = s.latest_frame.as_ref().ok_or(ApiError::NoFrame)?;
    Ok(ApiResponse::at_tick(frame, frame.tick))
}

/// GET /api/v2/items?status=progress
pub async fn items(
    State(state): State<ApiState>,
    Query(query): Query<ItemsQuery>,
) -> Result<Response, ApiError> {
    let filter = query
        .status
        .map(|raw| ItemStatus::parse_wire(&raw).ok_or(ApiError::UnknownStatus(raw)))
        .transpose()?;

    let s = state.line_state.read().await;
    let (tick, items) = s.latest_frame.as_ref().map_or((0, Vec::new()), |frame| {
        let items = frame
            .items
            .iter()
            .filter(|v| filter.map_or(true, |f| v.item.status == f))
            .cloned()
            .collect();
        (frame.tick, items)
    });

    Ok(ApiResponse::at_tick(
        ItemsResponse {
            tick,
            count: items.len(),
            items,
        },
        tick,
    ))
}

/// GET /api/v2/items/:barcode
pub async fn item(
    State(state): State<ApiState>,
    Path(barcode): Path<String>,
) -> Result<Response, ApiError> {
    let s = state.line_state.read().await;
    s.latest_frame
        .as_ref()
        .and_then(|frame| {
            let view = frame.items.iter().find(|v| v.item.barcode == barcode)?;
            Some(ApiResponse::at_tick(view, frame.tick))
        })
        .ok_or(ApiError::ItemNotOnBelt(barcode))
}

/// GET /api/v2/geometry
pub async fn geometry(State(state): State<ApiState>) -> Response {
    let s = state.line_state.read().await;
    let g = &s.geometry;
    let thresholds = g.activation_thresholds();
    let pushers = (0..PUSHER_COUNT)
        .map(|i| PusherInfo {
            pusher: u8::try_from(i + 1).unwrap_or(u8::MAX),
            distance_cm: g.pusher_distances_cm[i],
            activation_cm: thresholds[i],
            label: g.pusher_labels[i].clone(),
        })
        .collect();
    ApiResponse::ok(GeometryResponse {
        geometry: g.clone(),
        fixtures: g.fixtures(),
        pushers,
    })
}

/// GET /api/v2/stats
pub async fn stats(State(state): State<ApiState>) -> Response {
    let s: EngineStats = state.line_state.read().await.stats;
    ApiResponse::ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConveyorConfig;
    use crate::pipeline::LineState;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn test_state() -> ApiState {
        let geometry = BeltGeometry::from_config(&ConveyorConfig::default());
        ApiState::new(Arc::new(RwLock::new(LineState::new(geometry))))
    }

    #[tokio::test]
    async fn legacy_health_reports_initializing() {
        let response = legacy_health(State(test_state())).await;
        assert_eq!(response.status, "Initializing");
    }

    #[tokio::test]
    async fn frame_unavailable_before_first_tick() {
        let err = latest_frame(State(test_state())).await.unwrap_err();
        assert_eq!(err, ApiError::NoFrame);
    }

    #[tokio::test]
    async fn unknown_status_filter_rejected() {
        let query = ItemsQuery {
            status: Some("lost".into()),
        };
        let err = items(State(test_state()), Query(query)).await.unwrap_err();
        assert_eq!(err, ApiError::UnknownStatus("lost".into()));
    }

    #[tokio::test]
    async fn lookup_before_first_tick_is_not_on_belt() {
        let err = item(State(test_state()), Path("A".into())).await.unwrap_err();
        assert_eq!(err, ApiError::ItemNotOnBelt("A".into()));
    }
}
