//! BeltSync - conveyor sorting line simulation
//!
//! Reads backend messages (JSON lines) from stdin or a recording, runs the
//! belt simulation at a fixed tick rate, and serves the live view over HTTP.
//!
//! ```text
//! belt-simulator | beltsync --stdin
//! beltsync --replay shift.jsonl --replay-delay-ms 50
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use beltsync::api::{create_app, ApiState};
use beltsync::config::watcher::run_settings_watcher;
use beltsync::config::{ConveyorConfig, PusherSettings, SettingsEvent};
use beltsync::pipeline::{
    BeltEngine, IngestLoop, LineState, ReplaySource, SharedEngine, StdinSource, TickLoop,
    TracingObserver,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "beltsync")]
#[command(about = "Conveyor belt simulation and backend reconciliation engine")]
#[command(version)]
struct CliArgs {
    /// Read backend messages from stdin (one JSON object per line)
    #[arg(long, conflicts_with = "replay")]
    stdin: bool,

    /// Replay a recorded JSON-lines file
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Delay between replayed messages
    #[arg(long, default_value = "100")]
    replay_delay_ms: u64,

    /// Shut down once the message source is exhausted
    #[arg(long)]
    exit_on_eof: bool,

    /// Override the HTTP bind address (default from config: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Conveyor config TOML (otherwise $BELTSYNC_CONFIG or ./beltsync.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pusher settings JSON, watched for changes
    #[arg(long, env = "BELTSYNC_SETTINGS")]
    settings: Option<PathBuf>,

    /// Run without the HTTP API
    #[arg(long)]
    no_api: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn load_settings(path: Option<&Path>) -> PusherSettings {
    let Some(path) = path else {
        return PusherSettings::default();
    };
    match PusherSettings::load_from_file(path) {
        Ok(settings) => {
            info!(path = %path.display(), overrides = settings.overrides(), "Loaded pusher settings");
            settings
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Pusher settings unavailable, using default geometry");
            PusherSettings::default()
        }
    }
}

/// Apply watcher reloads to the running engine.
async fn forward_settings(mut rx: mpsc::Receiver<SettingsEvent>, engine: SharedEngine) {
    while let Some(event) = rx.recv().await {
        match event {
            SettingsEvent::Reloaded(settings) => engine.lock().await.update_settings(settings),
            SettingsEvent::Error(e) => warn!(error = %e, "Ignoring unreadable settings"),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let mut config = match &args.config {
        Some(path) => ConveyorConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConveyorConfig::load(),
    };
    if args.settings.is_some() {
        config.runtime.settings_path.clone_from(&args.settings);
    }
    let server_addr = args.addr.clone().unwrap_or_else(|| config.server.addr.clone());

    let settings = load_settings(config.runtime.settings_path.as_deref());
    let engine = BeltEngine::with_settings(config.clone(), settings);
    info!(
        speed = engine.geometry().speed_cm_per_sec,
        belt_length_cm = engine.geometry().belt_length_cm,
        tick_ms = config.runtime.tick_interval_ms,
        "Belt geometry ready"
    );

    let line_state = Arc::new(RwLock::new(LineState::new(engine.geometry().clone())));
    let engine: SharedEngine = Arc::new(Mutex::new(engine));

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, shutting down");
        shutdown_token.cancel();
    });

    // Settings watcher
    let watcher = config.runtime.settings_path.clone().map(|path| {
        let (tx, rx) = mpsc::channel(8);
        let poll = Duration::from_secs(config.runtime.settings_poll_secs);
        tokio::spawn(forward_settings(rx, engine.clone()));
        tokio::spawn(run_settings_watcher(path, poll, tx))
    });

    // Tick loop
    let mut ticks = TickLoop::new(
        engine.clone(),
        Duration::from_millis(config.runtime.tick_interval_ms),
    )
    .with_line_state(line_state.clone());
    ticks.add_observer(TracingObserver::new()).await;
    ticks.start();

    // HTTP API
    let server = if args.no_api {
        None
    } else {
        let listener = tokio::net::TcpListener::bind(&server_addr)
            .await
            .with_context(|| format!("Failed to bind to {server_addr}"))?;
        info!(addr = %server_addr, "HTTP API listening");
        let app = create_app(ApiState::new(line_state.clone()));
        let token = cancel_token.clone();
        Some(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }))
    };

    // Ingest
    let ingest = IngestLoop::new(engine.clone(), cancel_token.clone())
        .with_line_state(line_state.clone());
    let ingest_stats = if let Some(path) = &args.replay {
        let mut source = ReplaySource::from_file(path, args.replay_delay_ms)?;
        ingest.run(&mut source).await
    } else {
        if !args.stdin {
            info!("No --replay given, reading backend messages from stdin");
        }
        ingest.run(&mut StdinSource::new()).await
    };
    info!(
        read = ingest_stats.messages_read,
        applied = ingest_stats.messages_applied,
        "Message source finished"
    );

    if args.exit_on_eof {
        cancel_token.cancel();
    } else {
        cancel_token.cancelled().await;
    }

    ticks.stop().await;
    if let Some(handle) = watcher {
        handle.abort();
    }
    if let Some(server) = server {
        server.await.ok();
    }

    let stats = engine.lock().await.stats();
    info!(
        ticks = stats.ticks,
        messages = stats.messages,
        rejected = stats.messages_rejected,
        snapshots = stats.reconcile.snapshots,
        diverted = stats.trigger.diverted,
        overflow = stats.trigger.overflow,
        "BeltSync shutdown complete"
    );
    Ok(())
}
