//! `/api/v2` response bodies.
//!
//! Every reply carries a `meta` block naming the service and, for data read
//! from a published frame, the tick it came from. Failures are an
//! [`ApiError`] rendered as `{ "error": { "code", "message" }, "meta" }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

pub const API_VERSION: &str = "2";

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
    pub service: &'static str,
    /// Frame the payload was read from; absent for static data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
}

impl ResponseMeta {
    fn at(tick: Option<u64>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: API_VERSION,
            service: env!("CARGO_PKG_NAME"),
            tick,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        Self::reply(data, None)
    }

    /// Data taken from the frame published at `tick`.
    pub fn at_tick(data: T, tick: u64) -> Response {
        Self::reply(data, Some(tick))
    }

    fn reply(data: T, tick: Option<u64>) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::at(tick),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// Why a request could not be answered from the line state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("no tick has run yet")]
    NoFrame,

    #[error("unknown status '{0}', expected pending, progress, routing or completed")]
    UnknownStatus(String),

    #[error("item '{0}' is not on the belt")]
    ItemNotOnBelt(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFrame => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnknownStatus(_) => StatusCode::BAD_REQUEST,
            Self::ItemNotOnBelt(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NoFrame => "NO_FRAME",
            Self::UnknownStatus(_) => "UNKNOWN_STATUS",
            Self::ItemNotOnBelt(_) => "ITEM_NOT_ON_BELT",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    meta: ResponseMeta,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
            meta: ResponseMeta::at(None),
        };
        (self.status(), Json(body)).into_response()
    }
}
