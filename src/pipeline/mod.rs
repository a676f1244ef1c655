//! Processing Pipeline Module
//!
//! ```text
//! message source ──► IngestLoop ──► BeltEngine::handle_line
//!                                        │  (reconcile → store)
//! TickLoop (every tick_interval_ms) ──► BeltEngine::tick
//!                                        │  (extrapolate → trigger)
//!                                        ▼
//!                         TickFrame ──► observers, LineState (API)
//! ```

mod engine;
mod observer;
mod state;
pub mod source;
pub mod tick_loop;

pub use engine::{BeltEngine, EngineStats, ItemView, TickFrame};
pub use observer::{dispatch_frame, BeltObserver, TracingObserver};
pub use source::{MessageSource, ReplaySource, SourceEvent, StdinSource};
pub use state::{LineState, SystemStatus};
pub use tick_loop::{
    Clock, IngestLoop, IngestStats, SharedEngine, SharedLineState, SystemClock, TickLoop,
};
