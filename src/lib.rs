//! BeltSync: client-side conveyor belt simulation
//!
//! Tracks items scanned onto a sorting conveyor, extrapolates their position
//! between sparse backend updates, reconciles snapshots and deltas from the
//! backend, and fires photo-eye, pusher and diversion events locally.
//!
//! ## Architecture
//!
//! - **Reconcile**: merges backend snapshots/deltas into the item store without regressing motion
//! - **Trigger**: per-tick extrapolation and the item lifecycle state machine
//! - **Position**: belt cm, spatial coordinates and backend position ids
//! - **Pipeline**: tick and ingest loops around a single [`BeltEngine`]

pub mod api;
pub mod config;
pub mod pipeline;
pub mod position;
pub mod reconcile;
pub mod store;
pub mod trigger;
pub mod types;

pub use config::{ConveyorConfig, PusherSettings};
pub use pipeline::{BeltEngine, BeltObserver, TickFrame};
pub use position::BeltGeometry;
pub use reconcile::{ReconcileReport, ReconciliationEngine};
pub use store::ItemStore;
pub use types::{BeltEvent, InboundMessage, Item, ItemStatus};
