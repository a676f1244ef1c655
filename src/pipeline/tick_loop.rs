//! Fixed-interval tick runner and the message ingest loop.
//!
//! Both loops share one `Arc<Mutex<BeltEngine>>`. A tick and a message are
//! never applied concurrently; their relative order is whatever the runtime
//! schedules, which the reconciliation skip-rule tolerates.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::engine::BeltEngine;
use super::observer::{dispatch_frame, BeltObserver};
use super::source::{MessageSource, SourceEvent};
use super::state::{LineState, SystemStatus};

pub type SharedEngine = Arc<Mutex<BeltEngine>>;
pub type SharedLineState = Arc<RwLock<LineState>>;
type ObserverList = Arc<Mutex<Vec<Box<dyn BeltObserver>>>>;

// ============================================================================
// Clock
// ============================================================================

/// Wall clock in seconds since the epoch.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> f64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::cast_precision_loss)]
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

// ============================================================================
// Tick Loop
// ============================================================================

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives [`BeltEngine::tick`] on a fixed interval.
///
/// `start` is a no-op while running; `stop` is idempotent; a stopped loop
/// can be started again.
pub struct TickLoop {
    engine: SharedEngine,
    observers: ObserverList,
    line_state: Option<SharedLineState>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    running: Option<Running>,
}

impl TickLoop {
    pub fn new(engine: SharedEngine, interval: Duration) -> Self {
        Self {
            engine,
            observers: Arc::new(Mutex::new(Vec::new())),
            line_state: None,
            clock: Arc::new(SystemClock),
            interval,
            running: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish every frame into the API state.
    pub fn with_line_state(mut self, state: SharedLineState) -> Self {
        self.line_state = Some(state);
        self
    }

    pub async fn add_observer(&self, observer: impl BeltObserver) {
        self.observers.lock().await.push(Box::new(observer));
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Spawn the tick task. Returns `false` if it was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_ticks(
            self.engine.clone(),
            self.observers.clone(),
            self.line_state.clone(),
            self.clock.clone(),
            self.interval,
            cancel.clone(),
        ));
        self.running = Some(Running { cancel, handle });
        info!(interval = ?self.interval, "Tick loop started");
        true
    }

    /// Cancel the tick task and wait for it to finish.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            warn!(error = %e, "Tick task ended abnormally");
        }
        if let Some(state) = &self.line_state {
            state.write().await.status = SystemStatus::Stopped;
        }
        info!("Tick loop stopped");
    }
}

async fn run_ticks(
    engine: SharedEngine,
    observers: ObserverList,
    line_state: Option<SharedLineState>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if let Some(state) = &line_state {
        state.write().await.status = SystemStatus::Running;
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = clock.now();
        let (frame, geometry, stats) = {
            let mut engine = engine.lock().await;
            let frame = engine.tick(now);
            (frame, engine.geometry().clone(), engine.stats())
        };

        {
            let mut observers = observers.lock().await;
            for observer in observers.iter_mut() {
                dispatch_frame(observer.as_mut(), &frame);
            }
        }

        if let Some(state) = &line_state {
            state.write().await.publish(frame, geometry, stats);
        }
    }
}

// ============================================================================
// Ingest Loop
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub messages_read: u64,
    pub messages_applied: u64,
}

/// Reads a [`MessageSource`] and applies each message to the engine.
pub struct IngestLoop {
    engine: SharedEngine,
    line_state: Option<SharedLineState>,
    clock: Arc<dyn Clock>,
    cancel_token: CancellationToken,
}

impl IngestLoop {
    pub fn new(engine: SharedEngine, cancel_token: CancellationToken) -> Self {
        Self {
            engine,
            line_state: None,
            clock: Arc::new(SystemClock),
            cancel_token,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_line_state(mut self, state: SharedLineState) -> Self {
        self.line_state = Some(state);
        self
    }

    /// Run until the source is exhausted, fails, or cancellation.
    pub async fn run<S: MessageSource>(self, source: &mut S) -> IngestStats {
        let mut stats = IngestStats::default();
        info!(source = source.source_name(), "Reading backend messages");

        if let Some(state) = &self.line_state {
            state.write().await.source = Some(source.source_name().to_string());
        }

        loop {
            let event = tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Ingest shutdown signal received");
                    break;
                }
                result = source.next_message() => match result {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!(error = %e, "Message source failed");
                        break;
                    }
                }
            };

            let SourceEvent::Message(line) = event else {
                info!(messages = stats.messages_read, "Message source reached end");
                break;
            };

            stats.messages_read += 1;
            let applied = {
                let mut engine = self.engine.lock().await;
                engine.handle_line(&line, self.clock.now()).is_some()
            };
            if applied {
                stats.messages_applied += 1;
            }

            if let Some(state) = &self.line_state {
                let mut s = state.write().await;
                s.messages_processed += 1;
                s.last_message_time = Some(chrono::Utc::now());
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConveyorConfig;
    use crate::pipeline::source::ReplaySource;
    use crate::position::BeltGeometry;

    fn shared() -> SharedEngine {
        Arc::new(Mutex::new(BeltEngine::new(ConveyorConfig::default())))
    }

    #[tokio::test]
    async fn start_is_idempotent_and_restartable() {
        let mut ticks = TickLoop::new(shared(), Duration::from_millis(10));
        assert!(ticks.start());
        assert!(!ticks.start());
        assert!(ticks.is_running());

        ticks.stop().await;
        ticks.stop().await;
        assert!(!ticks.is_running());

        assert!(ticks.start());
        ticks.stop().await;
    }

    #[tokio::test]
    async fn ticks_publish_frames() {
        let engine = shared();
        let state = Arc::new(RwLock::new(LineState::new(BeltGeometry::from_config(
            &ConveyorConfig::default(),
        ))));
        let mut ticks =
            TickLoop::new(engine.clone(), Duration::from_millis(5)).with_line_state(state.clone());
        ticks.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        ticks.stop().await;

        let s = state.read().await;
        assert!(s.latest_frame.is_some());
        assert!(s.stats.ticks > 0);
        assert_eq!(s.status, SystemStatus::Stopped);
    }

    #[tokio::test]
    async fn ingest_applies_replay() {
        let engine = shared();
        let mut source = ReplaySource::new(
            vec![
                r#"{"type":"scan","barcode":"A"}"#.into(),
                "garbage".into(),
                r#"{"type":"add","barcode":"B","fields":{"pusher":3}}"#.into(),
            ],
            0,
        );
        let stats = IngestLoop::new(engine.clone(), CancellationToken::new())
            .run(&mut source)
            .await;
        assert_eq!(stats.messages_read, 3);
        assert_eq!(stats.messages_applied, 2);
        assert_eq!(engine.lock().await.store().len(), 2);
    }

    #[tokio::test]
    async fn ingest_stops_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut source = ReplaySource::new(vec!["{}".into(); 3], 1000);
        let stats = IngestLoop::new(shared(), cancel).run(&mut source).await;
        assert!(stats.messages_read <= 1);
    }
}
